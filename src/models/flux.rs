//! Flux time series and event intervals.
//!
//! A [`FluxSeries`] is a fixed-cadence matrix of per-channel fluxes. Missing
//! measurements are `None`, never zero: a gap in telemetry must not read as
//! a quiet detector. Channel identity is the column index; energy metadata
//! lives in [`crate::models::channel::SensorChannels`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Bins in one full day at the given cadence.
pub fn bins_per_day(cadence_seconds: u64) -> usize {
    (24 * 60 * 60 / cadence_seconds) as usize
}

/// A regularly spaced multi-channel flux matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluxSeries {
    start: DateTime<Utc>,
    cadence_seconds: u64,
    channels: usize,
    rows: Vec<Vec<Option<f64>>>,
}

impl FluxSeries {
    /// Build a series from pre-binned rows.
    pub fn from_rows(
        start: DateTime<Utc>,
        cadence_seconds: u64,
        channels: usize,
        rows: Vec<Vec<Option<f64>>>,
    ) -> AnalysisResult<Self> {
        if cadence_seconds == 0 {
            return Err(AnalysisError::DegenerateInput(
                "flux series cadence must be positive".into(),
            ));
        }
        if channels == 0 {
            return Err(AnalysisError::DegenerateInput(
                "flux series needs at least one channel".into(),
            ));
        }
        for (bin, row) in rows.iter().enumerate() {
            if row.len() != channels {
                return Err(AnalysisError::DegenerateInput(format!(
                    "row {} has {} channels, expected {}",
                    bin,
                    row.len(),
                    channels
                )));
            }
        }
        Ok(Self {
            start,
            cadence_seconds,
            channels,
            rows,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn cadence_seconds(&self) -> u64 {
        self.cadence_seconds
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flux at (bin, channel); `None` for missing data or out of range.
    pub fn value(&self, bin: usize, channel: usize) -> Option<f64> {
        *self.rows.get(bin)?.get(channel)?
    }

    /// Timestamp of a bin's left edge.
    pub fn timestamp_of(&self, bin: usize) -> DateTime<Utc> {
        self.start + Duration::seconds(bin as i64 * self.cadence_seconds as i64)
    }

    /// Bin containing a timestamp, if inside the series.
    pub fn bin_of(&self, ts: DateTime<Utc>) -> Option<usize> {
        if ts < self.start {
            return None;
        }
        let bin = ((ts - self.start).num_seconds() as u64 / self.cadence_seconds) as usize;
        (bin < self.rows.len()).then_some(bin)
    }

    /// Per-cell difference of two aligned series.
    ///
    /// Used to derive STEP electron fluxes as integral minus magnet channel.
    /// A missing cell on either side stays missing.
    pub fn difference(&self, other: &FluxSeries) -> AnalysisResult<FluxSeries> {
        if self.start != other.start
            || self.cadence_seconds != other.cadence_seconds
            || self.channels != other.channels
            || self.rows.len() != other.rows.len()
        {
            return Err(AnalysisError::DegenerateInput(
                "difference requires identically shaped series".into(),
            ));
        }
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(a, b)| {
                a.iter()
                    .zip(b)
                    .map(|(x, y)| match (x, y) {
                        (Some(x), Some(y)) => Some(x - y),
                        _ => None,
                    })
                    .collect()
            })
            .collect();
        FluxSeries::from_rows(self.start, self.cadence_seconds, self.channels, rows)
    }

    /// Shift each channel earlier by its offset in bins.
    ///
    /// Aligns dispersed arrivals: after shifting, bin `b` of channel `c`
    /// holds the flux originally at `b + offsets[c]`. The vacated tail is
    /// missing data.
    pub fn shift_channels(&self, offsets: &[usize]) -> AnalysisResult<FluxSeries> {
        if offsets.len() != self.channels {
            return Err(AnalysisError::DegenerateInput(format!(
                "{} offsets for {} channels",
                offsets.len(),
                self.channels
            )));
        }
        let len = self.rows.len();
        let rows = (0..len)
            .map(|bin| {
                (0..self.channels)
                    .map(|ch| {
                        let src = bin + offsets[ch];
                        if src < len {
                            self.rows[src][ch]
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .collect();
        FluxSeries::from_rows(self.start, self.cadence_seconds, self.channels, rows)
    }

    /// Reduce a finer-cadence series by summing groups of `factor` bins.
    ///
    /// Groups that contain only missing cells stay missing. The result is
    /// capped at one day of bins from the series start; a short input day is
    /// padded with missing rows so downstream indexing stays regular.
    pub fn reduce(&self, factor: usize) -> AnalysisResult<FluxSeries> {
        if factor == 0 {
            return Err(AnalysisError::DegenerateInput(
                "reduction factor must be positive".into(),
            ));
        }
        let cadence = self.cadence_seconds * factor as u64;
        if 86400 % cadence != 0 {
            return Err(AnalysisError::DegenerateInput(format!(
                "reduced cadence {} s does not divide a day",
                cadence
            )));
        }
        let max_bins = bins_per_day(cadence);

        let mut rows = Vec::with_capacity(max_bins);
        for group in 0..max_bins {
            let lo = group * factor;
            if lo >= self.rows.len() {
                rows.push(vec![None; self.channels]);
                continue;
            }
            let hi = ((group + 1) * factor).min(self.rows.len());
            let row = (0..self.channels)
                .map(|ch| {
                    let mut sum = None;
                    for bin in lo..hi {
                        if let Some(v) = self.rows[bin][ch] {
                            sum = Some(sum.unwrap_or(0.0) + v);
                        }
                    }
                    sum
                })
                .collect();
            rows.push(row);
        }
        FluxSeries::from_rows(self.start, cadence, self.channels, rows)
    }
}

/// A detected event span, `start <= end`, both inclusive bin timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl EventInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AnalysisResult<Self> {
        if start > end {
            return Err(AnalysisError::DegenerateInput(format!(
                "event interval start {} after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Interval whose ordering the caller has already established.
    pub(crate) fn from_ordered(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Event intervals with per-channel participation flags.
///
/// Row `i` of `channel_flags` marks, for interval `i`, which channels were
/// high at least once during the span.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventTable {
    intervals: Vec<EventInterval>,
    channel_flags: Vec<Vec<bool>>,
}

impl EventTable {
    pub fn new(intervals: Vec<EventInterval>, channel_flags: Vec<Vec<bool>>) -> Self {
        debug_assert_eq!(intervals.len(), channel_flags.len());
        Self {
            intervals,
            channel_flags,
        }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[EventInterval] {
        &self.intervals
    }

    pub fn interval(&self, index: usize) -> Option<&EventInterval> {
        self.intervals.get(index)
    }

    /// Did `channel` participate in event `index`?
    pub fn channel_active(&self, index: usize, channel: usize) -> bool {
        self.channel_flags
            .get(index)
            .and_then(|row| row.get(channel))
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 5, 21, 0, 0, 0).unwrap()
    }

    fn series(rows: Vec<Vec<Option<f64>>>) -> FluxSeries {
        let channels = rows[0].len();
        FluxSeries::from_rows(t0(), 300, channels, rows).unwrap()
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result = FluxSeries::from_rows(
            t0(),
            300,
            2,
            vec![vec![Some(1.0), Some(2.0)], vec![Some(1.0)]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_bin_timestamps_round_trip() {
        let s = series(vec![vec![Some(1.0)], vec![Some(2.0)], vec![Some(3.0)]]);
        let ts = s.timestamp_of(2);
        assert_eq!(ts, t0() + Duration::seconds(600));
        assert_eq!(s.bin_of(ts), Some(2));
        assert_eq!(s.bin_of(ts + Duration::seconds(299)), Some(2));
        assert_eq!(s.bin_of(t0() - Duration::seconds(1)), None);
        assert_eq!(s.bin_of(t0() + Duration::seconds(900)), None);
    }

    #[test]
    fn test_difference_preserves_missing() {
        let a = series(vec![vec![Some(5.0), Some(3.0)], vec![None, Some(4.0)]]);
        let b = series(vec![vec![Some(2.0), None], vec![Some(1.0), Some(1.0)]]);

        let d = a.difference(&b).unwrap();
        assert_eq!(d.value(0, 0), Some(3.0));
        assert_eq!(d.value(0, 1), None);
        assert_eq!(d.value(1, 0), None);
        assert_eq!(d.value(1, 1), Some(3.0));
    }

    #[test]
    fn test_shift_channels() {
        let s = series(vec![
            vec![Some(0.0), Some(10.0)],
            vec![Some(1.0), Some(11.0)],
            vec![Some(2.0), Some(12.0)],
        ]);

        let shifted = s.shift_channels(&[0, 2]).unwrap();
        assert_eq!(shifted.value(0, 0), Some(0.0));
        assert_eq!(shifted.value(0, 1), Some(12.0));
        assert_eq!(shifted.value(1, 1), None);
        assert_eq!(shifted.value(2, 1), None);
    }

    #[test]
    fn test_reduce_sums_and_pads() {
        // 60 s cadence, half an hour of data, reduced by 5 to 300 s bins.
        let rows: Vec<Vec<Option<f64>>> = (0..30).map(|i| vec![Some(i as f64)]).collect();
        let s = FluxSeries::from_rows(t0(), 60, 1, rows).unwrap();

        let reduced = s.reduce(5).unwrap();
        assert_eq!(reduced.cadence_seconds(), 300);
        assert_eq!(reduced.len(), bins_per_day(300));
        // First group: 0+1+2+3+4.
        assert_eq!(reduced.value(0, 0), Some(10.0));
        // Beyond the input: padded as missing, not zero.
        assert_eq!(reduced.value(10, 0), None);
    }

    #[test]
    fn test_reduce_all_missing_group_stays_missing() {
        let mut rows: Vec<Vec<Option<f64>>> = (0..10).map(|_| vec![None]).collect();
        rows[5] = vec![Some(2.5)];
        let s = FluxSeries::from_rows(t0(), 60, 1, rows).unwrap();

        let reduced = s.reduce(5).unwrap();
        assert_eq!(reduced.value(0, 0), None);
        assert_eq!(reduced.value(1, 0), Some(2.5));
    }

    #[test]
    fn test_event_interval_ordering_enforced() {
        let start = t0();
        assert!(EventInterval::new(start, start).is_ok());
        assert!(EventInterval::new(start + Duration::seconds(1), start).is_err());
    }
}
