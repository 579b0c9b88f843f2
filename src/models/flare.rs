//! Flare catalog records.
//!
//! One record per cataloged flare, immutable once loaded. Catalog timestamps
//! are referenced to the flare's originating frame at the Sun; before any
//! arrival-delay arithmetic they are converted to spacecraft-local "sun
//! time" by subtracting the light travel time over the spacecraft's
//! heliocentric distance.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::channel::{AU_M, SPEED_OF_LIGHT};

/// Flare identifier: the ordinal index within a loaded flare list.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FlareId(pub usize);

impl FlareId {
    pub fn new(value: usize) -> Self {
        FlareId(value)
    }

    pub fn value(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for FlareId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single cataloged flare.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlareRecord {
    pub id: FlareId,
    pub start: DateTime<Utc>,
    pub peak: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Heliographic (Carrington) longitude, degrees.
    pub lon: f64,
    /// Heliographic (Carrington) latitude, degrees.
    pub lat: f64,
    /// Spacecraft heliocentric distance at flare time, AU.
    pub distance_au: f64,
    /// Raw 4-10 keV counts over the 4 s accumulation.
    pub counts: f64,
    /// Background 4-10 keV counts over the same accumulation.
    pub background_counts: f64,
    /// X-ray attenuator inserted during the flare.
    pub attenuator_in: bool,
}

/// Flare timestamps shifted into the spacecraft-local arrival frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub start: DateTime<Utc>,
    pub peak: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FlareRecord {
    /// Construct a record, enforcing the temporal ordering invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: FlareId,
        start: DateTime<Utc>,
        peak: DateTime<Utc>,
        end: DateTime<Utc>,
        lon: f64,
        lat: f64,
        distance_au: f64,
        counts: f64,
        background_counts: f64,
        attenuator_in: bool,
    ) -> AnalysisResult<Self> {
        if start > peak || peak > end {
            return Err(AnalysisError::DegenerateInput(format!(
                "flare {} timestamps out of order: start={} peak={} end={}",
                id, start, peak, end
            )));
        }
        if !lon.is_finite() || !lat.is_finite() || !distance_au.is_finite() {
            return Err(AnalysisError::DegenerateInput(format!(
                "flare {} has non-finite coordinates",
                id
            )));
        }
        if distance_au <= 0.0 {
            return Err(AnalysisError::DegenerateInput(format!(
                "flare {} has non-positive spacecraft distance {} AU",
                id, distance_au
            )));
        }
        Ok(Self {
            id,
            start,
            peak,
            end,
            lon,
            lat,
            distance_au,
            counts,
            background_counts,
            attenuator_in,
        })
    }

    /// Light travel time from the Sun to the spacecraft, seconds.
    pub fn light_travel_seconds(&self) -> f64 {
        self.distance_au * AU_M / SPEED_OF_LIGHT
    }

    /// Flare timestamps corrected into the spacecraft arrival frame.
    ///
    /// Each timestamp is floored to the whole minute and the light travel
    /// time subtracted, matching the catalog's minute-level precision.
    pub fn sun_times(&self) -> SunTimes {
        let correction = Duration::seconds(self.light_travel_seconds().floor() as i64);
        SunTimes {
            start: floor_to_minute(self.start) - correction,
            peak: floor_to_minute(self.peak) - correction,
            end: floor_to_minute(self.end) - correction,
        }
    }

    /// Background-subtracted 4-10 keV counts.
    pub fn net_counts(&self) -> f64 {
        self.counts - self.background_counts
    }
}

fn floor_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts - Duration::seconds(ts.second() as i64)
        - Duration::nanoseconds(ts.nanosecond() as i64)
}

/// A loaded flare catalog, ordered by peak time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlareList {
    records: Vec<FlareRecord>,
}

impl FlareList {
    pub fn new(records: Vec<FlareRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: FlareId) -> Option<&FlareRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlareRecord> {
        self.records.iter()
    }

    /// Flares whose peak falls within `[start_date, end_date + 1 day)`.
    pub fn range(&self, start_date: NaiveDate, end_date: NaiveDate) -> Vec<&FlareRecord> {
        let start = Utc.from_utc_datetime(&start_date.and_hms_opt(0, 0, 0).unwrap());
        let end = Utc.from_utc_datetime(&end_date.and_hms_opt(0, 0, 0).unwrap())
            + Duration::days(1);
        self.records
            .iter()
            .filter(|r| start <= r.peak && r.peak < end)
            .collect()
    }
}
