//! Event detection service.
//!
//! Turns a flux series plus its baseline into discrete event intervals. A
//! cell is "high" when its flux exceeds the trailing baseline by at least
//! `sigma` standard deviations; a bin with enough simultaneously high
//! channels is an event candidate; a short persistence check against a
//! frozen baseline rejects one-bin noise spikes; contiguous candidates are
//! merged into one interval.
//!
//! Missing data never counts as a rise, and a zero baseline mean never
//! produces a "high" cell (a sigma threshold over a zero background would
//! fire on any flux at all).

use log::debug;

use crate::config::RunConfig;
use crate::models::{EventInterval, EventTable, FluxSeries};
use crate::services::baseline::Baseline;

/// Sliding-window statistical event detector.
#[derive(Debug, Clone)]
pub struct EventDetector {
    /// Threshold multiplier on the baseline standard deviation.
    pub sigma: f64,
    /// Minimum number of simultaneously high channels for a candidate bin.
    pub min_bins: usize,
    /// Bins inspected by the persistence check, starting at the candidate.
    pub persistence_window: usize,
    /// How many inspected bins must stay high for the candidate to survive.
    pub persistence_required: usize,
}

impl EventDetector {
    /// Detector with the reference thresholds for the given sigma factor.
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            min_bins: 5,
            persistence_window: 2,
            persistence_required: 2,
        }
    }

    /// Detector parameterized from a run configuration.
    pub fn from_config(config: &RunConfig, sigma: f64) -> Self {
        Self {
            sigma,
            min_bins: config.min_bins,
            persistence_window: config.persistence_window,
            persistence_required: config.persistence_required,
        }
    }

    /// Is (bin, channel) high relative to its own baseline?
    ///
    /// Missing flux, an undefined baseline, or a zero baseline mean all
    /// force `false`.
    fn is_high(&self, series: &FluxSeries, baseline: &Baseline, bin: usize, ch: usize) -> bool {
        let (Some(flux), Some(mean), Some(std)) = (
            series.value(bin, ch),
            baseline.mean(bin, ch),
            baseline.std(bin, ch),
        ) else {
            return false;
        };
        if mean == 0.0 {
            return false;
        }
        flux - mean >= self.sigma * std
    }

    /// Number of high channels in a bin.
    fn high_count(&self, series: &FluxSeries, baseline: &Baseline, bin: usize) -> usize {
        (0..series.channels())
            .filter(|&ch| self.is_high(series, baseline, bin, ch))
            .count()
    }

    /// Candidate bin: enough channels rise simultaneously.
    fn is_candidate(&self, series: &FluxSeries, baseline: &Baseline, bin: usize) -> bool {
        self.high_count(series, baseline, bin) >= self.min_bins
    }

    /// Persistence check for a candidate bin.
    ///
    /// Re-tests the candidate and its look-ahead bins against the baseline
    /// frozen at the bin preceding the candidate; the background must not
    /// have caught up with a genuine rise. Missing flux counts as high here
    /// so a telemetry gap inside a real event does not break the check.
    fn is_persistent(&self, series: &FluxSeries, baseline: &Baseline, bin: usize) -> bool {
        if bin == 0 {
            return false;
        }
        let frozen = bin - 1;
        let last = (bin + self.persistence_window).min(series.len());
        let mut passing = 0;
        for test_bin in bin..last {
            let high_channels = (0..series.channels())
                .filter(|&ch| {
                    let Some(flux) = series.value(test_bin, ch) else {
                        return true;
                    };
                    let (Some(mean), Some(std)) =
                        (baseline.mean(frozen, ch), baseline.std(frozen, ch))
                    else {
                        return false;
                    };
                    if mean == 0.0 {
                        return false;
                    }
                    flux - mean >= self.sigma * std
                })
                .count();
            if high_channels >= self.min_bins {
                passing += 1;
            }
        }
        // A truncated look-ahead at the series end cannot reach the quorum.
        passing >= self.persistence_required && (last - bin) >= self.persistence_required
    }

    /// Detect events as bin index spans (inclusive on both ends).
    fn find_event_bins(&self, series: &FluxSeries, baseline: &Baseline) -> Vec<(usize, usize)> {
        let mut events = Vec::new();
        let mut open: Option<(usize, usize)> = None;

        for bin in 0..series.len() {
            if !self.is_candidate(series, baseline, bin) {
                if let Some(span) = open.take() {
                    events.push(span);
                }
                continue;
            }
            match open {
                Some((start, _)) => open = Some((start, bin)),
                None => {
                    if self.is_persistent(series, baseline, bin) {
                        open = Some((bin, bin));
                    }
                }
            }
        }
        // Still rising at the end of the series: close at the last bin.
        if let Some(span) = open {
            events.push(span);
        }

        debug!(
            "detected {} event(s) over {} bins at sigma {}",
            events.len(),
            series.len(),
            self.sigma
        );
        events
    }

    /// Detect any-channel events as disjoint, time-ordered intervals.
    pub fn find_events(&self, series: &FluxSeries, baseline: &Baseline) -> Vec<EventInterval> {
        self.find_event_bins(series, baseline)
            .into_iter()
            .map(|(start, end)| {
                EventInterval::from_ordered(series.timestamp_of(start), series.timestamp_of(end))
            })
            .collect()
    }

    /// Detect events and flag, per interval, which channels participated.
    pub fn find_event_table(&self, series: &FluxSeries, baseline: &Baseline) -> EventTable {
        let spans = self.find_event_bins(series, baseline);
        let mut intervals = Vec::with_capacity(spans.len());
        let mut flags = Vec::with_capacity(spans.len());

        for (start, end) in spans {
            let row: Vec<bool> = (0..series.channels())
                .map(|ch| (start..=end).any(|bin| self.is_high(series, baseline, bin, ch)))
                .collect();
            intervals.push(EventInterval::from_ordered(
                series.timestamp_of(start),
                series.timestamp_of(end),
            ));
            flags.push(row);
        }
        EventTable::new(intervals, flags)
    }
}
