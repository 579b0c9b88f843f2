//! Magnetic connectivity samples.
//!
//! The connectivity tool publishes candidate magnetic footpoints four times
//! per day (00/06/12/18 UT). A [`ConnectivitySet`] couples one of those
//! quantized timestamps with its sample points; a flare is always compared
//! against the set belonging to the quantized time nearest its peak.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Solar-wind category of a footpoint sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindCategory {
    SlowWind,
    FastWind,
    Measured,
}

impl WindCategory {
    /// All categories, in file-token order.
    pub const ALL: [WindCategory; 3] = [
        WindCategory::SlowWind,
        WindCategory::FastWind,
        WindCategory::Measured,
    ];

    /// Parse the SSW/FSW/M token used in connectivity files.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "SSW" => Some(WindCategory::SlowWind),
            "FSW" => Some(WindCategory::FastWind),
            "M" => Some(WindCategory::Measured),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WindCategory::SlowWind => "SSW",
            WindCategory::FastWind => "FSW",
            WindCategory::Measured => "M",
        }
    }

    /// Index into per-category accumulators.
    pub fn index(&self) -> usize {
        match self {
            WindCategory::SlowWind => 0,
            WindCategory::FastWind => 1,
            WindCategory::Measured => 2,
        }
    }
}

/// One candidate magnetic footpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityPoint {
    pub category: WindCategory,
    /// Probability/density weight, percent.
    pub density: f64,
    /// Carrington latitude, degrees.
    pub lat: f64,
    /// Carrington longitude, degrees.
    pub lon: f64,
}

/// One of the four daily sampling times of the connectivity tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuantizedTime(DateTime<Utc>);

impl QuantizedTime {
    /// Quantized sampling time nearest to `ts`.
    ///
    /// Rounds to the closest of 00/06/12/18 UT; 3 h or more past a sampling
    /// time rounds up, possibly rolling over to the next day's 00 UT.
    pub fn nearest(ts: DateTime<Utc>) -> Self {
        let hour = ts.hour();
        let rem = hour % 6;
        let base = ts
            .with_hour(0)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .expect("midnight is always representable");
        let quantized_hour = if rem >= 3 {
            hour - rem + 6
        } else {
            hour - rem
        };
        QuantizedTime(base + Duration::hours(quantized_hour as i64))
    }

    /// Construct directly from a date and one of the four valid hours.
    pub fn from_ymd_hour(year: i32, month: u32, day: u32, hour: u32) -> Option<Self> {
        if hour % 6 != 0 || hour >= 24 {
            return None;
        }
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
            .single()
            .map(QuantizedTime)
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Timestamp fragment used in connectivity tool file names,
    /// e.g. `20230109T060000`.
    pub fn file_stamp(&self) -> String {
        self.0.format("%Y%m%dT%H0000").to_string()
    }
}

impl std::fmt::Display for QuantizedTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:00:00"))
    }
}

/// Footpoint samples for one quantized timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivitySet {
    pub time: QuantizedTime,
    pub points: Vec<ConnectivityPoint>,
}

impl ConnectivitySet {
    pub fn new(time: QuantizedTime, points: Vec<ConnectivityPoint>) -> Self {
        Self { time, points }
    }

    /// An empty set, the degraded result of a failed lookup.
    pub fn empty(time: QuantizedTime) -> Self {
        Self {
            time,
            points: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_rounds_down_before_midpoint() {
        let ts = Utc.with_ymd_and_hms(2023, 1, 9, 8, 59, 0).unwrap();
        let q = QuantizedTime::nearest(ts);
        assert_eq!(q.datetime(), Utc.with_ymd_and_hms(2023, 1, 9, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_nearest_rounds_up_from_midpoint() {
        let ts = Utc.with_ymd_and_hms(2023, 1, 9, 9, 0, 0).unwrap();
        let q = QuantizedTime::nearest(ts);
        assert_eq!(q.datetime(), Utc.with_ymd_and_hms(2023, 1, 9, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_nearest_rolls_over_to_next_day() {
        let ts = Utc.with_ymd_and_hms(2023, 1, 9, 21, 30, 0).unwrap();
        let q = QuantizedTime::nearest(ts);
        assert_eq!(q.datetime(), Utc.with_ymd_and_hms(2023, 1, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_file_stamp_format() {
        let q = QuantizedTime::from_ymd_hour(2023, 1, 9, 6).unwrap();
        assert_eq!(q.file_stamp(), "20230109T060000");
        assert_eq!(q.to_string(), "2023-01-09T06:00:00");
    }

    #[test]
    fn test_from_ymd_hour_rejects_off_grid_hours() {
        assert!(QuantizedTime::from_ymd_hour(2023, 1, 9, 7).is_none());
        assert!(QuantizedTime::from_ymd_hour(2023, 1, 9, 24).is_none());
    }

    #[test]
    fn test_category_tokens() {
        assert_eq!(WindCategory::from_token("SSW"), Some(WindCategory::SlowWind));
        assert_eq!(WindCategory::from_token("FSW"), Some(WindCategory::FastWind));
        assert_eq!(WindCategory::from_token("M"), Some(WindCategory::Measured));
        assert_eq!(WindCategory::from_token("XYZ"), None);
    }
}
