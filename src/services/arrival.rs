//! Particle arrival-delay model.
//!
//! Converts per-channel particle speeds into expected arrival windows at
//! the spacecraft. The lower bound assumes direct travel along the path
//! from the flare start; the upper bound stretches the travel time by an
//! indirect factor from the flare end, covering scattering along the
//! interplanetary field line.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{SensorChannels, SunTimes};

/// Expected arrival interval for one energy channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrivalWindow {
    /// Earliest plausible arrival.
    pub low: DateTime<Utc>,
    /// Latest plausible arrival.
    pub high: DateTime<Utc>,
}

/// Travel-time model along a fixed path length.
#[derive(Debug, Clone, Copy)]
pub struct ArrivalModel {
    /// Assumed travel path length in meters.
    pub path_length_m: f64,
    /// Multiplier on the direct travel time for the window's upper bound.
    pub indirect_factor: f64,
}

impl ArrivalModel {
    pub fn new(path_length_m: f64, indirect_factor: f64) -> Self {
        Self {
            path_length_m,
            indirect_factor,
        }
    }

    /// Direct travel time in seconds for a particle at the given speed.
    ///
    /// Returns `None` for a non-physical speed or path length.
    pub fn delay(&self, speed_m_s: f64) -> Option<f64> {
        if !self.path_length_m.is_finite() || self.path_length_m <= 0.0 {
            return None;
        }
        if !speed_m_s.is_finite() || speed_m_s <= 0.0 {
            return None;
        }
        Some(self.path_length_m / speed_m_s)
    }

    /// Arrival window for one channel speed, anchored on the sun-frame
    /// flare start and end times. Sub-second travel times are floored.
    pub fn window(&self, sun: &SunTimes, speed_m_s: f64) -> Option<ArrivalWindow> {
        let direct = self.delay(speed_m_s)?;
        let low = sun.start + Duration::seconds(direct.floor() as i64);
        let high = sun.end + Duration::seconds((direct * self.indirect_factor).floor() as i64);
        Some(ArrivalWindow { low, high })
    }

    /// Arrival windows for every channel of a sensor, in channel order.
    pub fn windows(&self, channels: &SensorChannels, sun: &SunTimes) -> Vec<Option<ArrivalWindow>> {
        channels
            .speeds()
            .iter()
            .map(|&speed| self.window(sun, speed))
            .collect()
    }

    /// Per-channel alignment offsets in whole bins.
    ///
    /// The fastest channel gets offset zero; slower channels get the number
    /// of whole cadence steps their direct delay lags behind it. Shifting
    /// each channel earlier by its offset lines up the dispersed onsets.
    pub fn dispersion_offsets(&self, channels: &SensorChannels, cadence_seconds: u64) -> Vec<usize> {
        let delays: Vec<f64> = channels
            .speeds()
            .iter()
            .map(|&speed| self.delay(speed).unwrap_or(0.0))
            .collect();
        let min_delay = delays.iter().copied().fold(f64::INFINITY, f64::min);
        if !min_delay.is_finite() {
            return vec![0; delays.len()];
        }
        delays
            .iter()
            .map(|&d| ((d - min_delay) / cadence_seconds as f64).floor() as usize)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::channel::{relativistic_speed, Particle, AU_M, SPEED_OF_LIGHT};
    use chrono::{TimeZone, Utc};

    fn sun() -> SunTimes {
        let start = Utc.with_ymd_and_hms(2021, 5, 22, 2, 0, 0).unwrap();
        SunTimes {
            start,
            peak: start + Duration::minutes(4),
            end: start + Duration::minutes(9),
        }
    }

    #[test]
    fn test_light_speed_delay_at_one_au() {
        let model = ArrivalModel::new(AU_M, 1.5);
        let delay = model.delay(SPEED_OF_LIGHT).unwrap();
        assert!((delay - 499.0).abs() < 1.0);
    }

    #[test]
    fn test_window_bounds_anchor_on_start_and_end() {
        // Speed chosen so the direct delay is exactly 1000 s.
        let model = ArrivalModel::new(1.0e9, 1.5);
        let w = model.window(&sun(), 1.0e6).unwrap();

        assert_eq!(w.low, sun().start + Duration::seconds(1000));
        assert_eq!(w.high, sun().end + Duration::seconds(1500));
    }

    #[test]
    fn test_fractional_delay_floors() {
        // 999.9 s direct, 1499.85 s indirect.
        let model = ArrivalModel::new(9.999e8, 1.5);
        let w = model.window(&sun(), 1.0e6).unwrap();

        assert_eq!(w.low, sun().start + Duration::seconds(999));
        assert_eq!(w.high, sun().end + Duration::seconds(1499));
    }

    #[test]
    fn test_non_physical_speed_yields_no_window() {
        let model = ArrivalModel::new(AU_M, 1.5);
        assert!(model.window(&sun(), 0.0).is_none());
        assert!(model.window(&sun(), f64::NAN).is_none());
    }

    #[test]
    fn test_non_physical_path_length_yields_no_window() {
        // A degenerate path must not collapse the window onto the flare
        // times; the channel is excluded instead.
        for path in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let model = ArrivalModel::new(path, 1.5);
            assert!(model.delay(1.0e8).is_none(), "path {}", path);
            assert!(model.window(&sun(), 1.0e8).is_none(), "path {}", path);
        }
    }

    #[test]
    fn test_slower_channels_open_later() {
        let model = ArrivalModel::new(AU_M, 1.5);
        let channels = SensorChannels::ept_electrons();
        let windows = model.windows(&channels, &sun());

        assert_eq!(windows.len(), channels.len());
        for pair in windows.windows(2) {
            let (a, b) = (pair[0].unwrap(), pair[1].unwrap());
            // Higher-energy channels arrive no later than lower-energy ones.
            assert!(a.low >= b.low);
        }
    }

    #[test]
    fn test_dispersion_offsets_zero_for_fastest() {
        let model = ArrivalModel::new(AU_M, 1.5);
        let channels = SensorChannels::ept_electrons();
        let offsets = model.dispersion_offsets(&channels, 300);

        // Channels are ordered by increasing energy, so the last (fastest)
        // channel must sit at offset zero and offsets must not increase
        // with channel index.
        assert_eq!(*offsets.last().unwrap(), 0);
        for pair in offsets.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn test_offsets_scale_with_delay_gap() {
        let model = ArrivalModel::new(AU_M, 1.5);
        let slow = relativistic_speed(0.03, Particle::Electron);
        let fast = relativistic_speed(0.4, Particle::Electron);
        let gap = model.delay(slow).unwrap() - model.delay(fast).unwrap();
        assert!(gap > 0.0);

        let channels = SensorChannels::ept_electrons();
        let offsets = model.dispersion_offsets(&channels, 300);
        let spread = offsets[0] - *offsets.last().unwrap();
        assert!(spread >= 1, "lowest channel should lag by at least one bin");
    }
}
