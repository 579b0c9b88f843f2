//! Magnetic connectivity matching.
//!
//! Compares a flare's photospheric footpoint against the set of magnetic
//! footpoints traced back from the spacecraft, in Carrington coordinates.
//! Longitude wraps at 360 degrees; latitude does not wrap.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{ConnectivityPoint, ConnectivitySet, FlareRecord, WindCategory};

/// Angular distance between two (lon, lat) points in degrees, with
/// longitude wraparound. Latitude is treated as a plain offset.
pub fn wraparound_distance(lon_a: f64, lat_a: f64, lon_b: f64, lat_b: f64) -> f64 {
    let dl = lon_a - lon_b;
    let dlon = dl.abs().min((dl + 360.0).abs()).min((dl - 360.0).abs());
    let dlat = lat_a - lat_b;
    (dlon * dlon + dlat * dlat).sqrt()
}

/// Outcome of matching one flare against one connectivity set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityMatch {
    /// At least one footpoint lies within the angular threshold.
    pub connected: bool,
    /// Smallest footpoint distance in degrees, if any footpoints exist.
    pub min_distance: Option<f64>,
    /// Footpoint realizing the minimum distance.
    pub nearest: Option<ConnectivityPoint>,
    /// Largest within-threshold density bucket across wind categories.
    pub strength: f64,
    /// Within-threshold density, bucketed by wind category.
    pub density_by_category: HashMap<WindCategory, f64>,
    /// The connectivity set held no footpoints at all.
    pub no_data: bool,
}

impl ConnectivityMatch {
    fn no_data() -> Self {
        Self {
            connected: false,
            min_distance: None,
            nearest: None,
            strength: 0.0,
            density_by_category: HashMap::new(),
            no_data: true,
        }
    }
}

/// Matches flares against connectivity footpoints at a fixed threshold.
#[derive(Debug, Clone, Copy)]
pub struct ConnectivityMatcher {
    /// Angular threshold in degrees; a footpoint exactly at the threshold
    /// still counts as connected.
    pub delta: f64,
}

impl ConnectivityMatcher {
    pub fn new(delta: f64) -> Self {
        Self { delta }
    }

    /// Match one flare footpoint against a connectivity set.
    pub fn match_flare(&self, flare: &FlareRecord, set: &ConnectivitySet) -> ConnectivityMatch {
        if set.points.is_empty() {
            return ConnectivityMatch::no_data();
        }

        let mut min_distance = f64::INFINITY;
        let mut nearest: Option<&ConnectivityPoint> = None;
        let mut density_by_category: HashMap<WindCategory, f64> = HashMap::new();

        for point in &set.points {
            let distance =
                wraparound_distance(flare.lon, flare.lat, point.lon, point.lat);
            if distance < min_distance {
                min_distance = distance;
                nearest = Some(point);
            }
            if distance <= self.delta {
                *density_by_category.entry(point.category).or_insert(0.0) += point.density;
            }
        }
        let strength = density_by_category
            .values()
            .copied()
            .fold(0.0, f64::max);

        ConnectivityMatch {
            connected: min_distance <= self.delta,
            min_distance: Some(min_distance),
            nearest: nearest.cloned(),
            strength,
            density_by_category,
            no_data: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuantizedTime;
    use proptest::prelude::*;

    fn point(lon: f64, lat: f64, category: WindCategory, density: f64) -> ConnectivityPoint {
        ConnectivityPoint {
            category,
            density,
            lat,
            lon,
        }
    }

    fn set(points: Vec<ConnectivityPoint>) -> ConnectivitySet {
        ConnectivitySet::new(QuantizedTime::from_ymd_hour(2021, 5, 22, 6).unwrap(), points)
    }

    fn flare_at(lon: f64, lat: f64) -> FlareRecord {
        use chrono::{TimeZone, Utc};
        let start = Utc.with_ymd_and_hms(2021, 5, 22, 4, 0, 0).unwrap();
        FlareRecord::new(
            crate::models::FlareId(1),
            start,
            start + chrono::Duration::minutes(5),
            start + chrono::Duration::minutes(10),
            lon,
            lat,
            0.95,
            1000.0,
            100.0,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_nearby_footpoint_connects() {
        let flare = flare_at(100.0, 5.0);
        let m = ConnectivityMatcher::new(10.0)
            .match_flare(&flare, &set(vec![point(105.0, 4.0, WindCategory::Measured, 80.0)]));

        assert!(m.connected);
        let d = m.min_distance.unwrap();
        assert!((d - 26.0_f64.sqrt()).abs() < 1e-9);
        assert_eq!(m.density_by_category[&WindCategory::Measured], 80.0);
    }

    #[test]
    fn test_tight_threshold_rejects_same_footpoint() {
        let flare = flare_at(100.0, 5.0);
        let m = ConnectivityMatcher::new(4.0)
            .match_flare(&flare, &set(vec![point(105.0, 4.0, WindCategory::Measured, 80.0)]));

        assert!(!m.connected);
        assert!(m.min_distance.unwrap() > 4.0);
        assert_eq!(m.strength, 0.0);
    }

    #[test]
    fn test_longitude_wraps_at_360() {
        // 359 and 1 degree are 2 degrees apart, not 358.
        let d = wraparound_distance(359.0, 0.0, 1.0, 0.0);
        assert!((d - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_latitude_does_not_wrap() {
        let d = wraparound_distance(0.0, 80.0, 0.0, -80.0);
        assert!((d - 160.0).abs() < 1e-12);
    }

    #[test]
    fn test_exact_threshold_is_connected() {
        let flare = flare_at(100.0, 0.0);
        let m = ConnectivityMatcher::new(10.0)
            .match_flare(&flare, &set(vec![point(110.0, 0.0, WindCategory::SlowWind, 12.5)]));

        assert!(m.connected);
        assert_eq!(m.strength, 12.5);
    }

    #[test]
    fn test_empty_set_is_no_data() {
        let flare = flare_at(100.0, 5.0);
        let m = ConnectivityMatcher::new(10.0).match_flare(&flare, &set(vec![]));

        assert!(m.no_data);
        assert!(!m.connected);
        assert!(m.min_distance.is_none());
    }

    #[test]
    fn test_density_buckets_accumulate_per_category() {
        let flare = flare_at(50.0, 0.0);
        let m = ConnectivityMatcher::new(10.0).match_flare(
            &flare,
            &set(vec![
                point(52.0, 1.0, WindCategory::FastWind, 10.0),
                point(48.0, -1.0, WindCategory::FastWind, 5.0),
                point(55.0, 0.0, WindCategory::SlowWind, 2.0),
                point(200.0, 0.0, WindCategory::Measured, 99.0),
            ]),
        );

        assert!(m.connected);
        assert_eq!(m.density_by_category[&WindCategory::FastWind], 15.0);
        assert_eq!(m.density_by_category[&WindCategory::SlowWind], 2.0);
        assert!(!m.density_by_category.contains_key(&WindCategory::Measured));
        // Strength reports the dominant category, not the grand total.
        assert_eq!(m.strength, 15.0);
    }

    proptest! {
        #[test]
        fn prop_distance_is_symmetric(
            lon_a in 0.0f64..360.0,
            lat_a in -90.0f64..90.0,
            lon_b in 0.0f64..360.0,
            lat_b in -90.0f64..90.0,
        ) {
            let ab = wraparound_distance(lon_a, lat_a, lon_b, lat_b);
            let ba = wraparound_distance(lon_b, lat_b, lon_a, lat_a);
            prop_assert!((ab - ba).abs() < 1e-9);
        }

        #[test]
        fn prop_distance_is_nonnegative_and_zero_on_self(
            lon in 0.0f64..360.0,
            lat in -90.0f64..90.0,
        ) {
            prop_assert!(wraparound_distance(lon, lat, lon, lat).abs() < 1e-12);
            prop_assert!(wraparound_distance(lon, lat, lon + 1.0, lat) >= 0.0);
        }
    }
}
