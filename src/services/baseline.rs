//! Baseline estimation service.
//!
//! Computes, per channel, the trailing mean and population standard
//! deviation of the `window` bins strictly preceding each bin. The current
//! bin never contributes to its own baseline (the rolling statistic is
//! shifted forward by one bin before use), so a flux rise cannot inflate
//! the background it is tested against.

use crate::models::FluxSeries;

/// Trailing-window background statistics for every (bin, channel) cell.
///
/// Cells without a fully populated trailing window carry no value: the
/// first `window` bins of any series, and any bin whose trailing window
/// contains missing data.
#[derive(Debug, Clone)]
pub struct Baseline {
    window: usize,
    mean: Vec<Vec<Option<f64>>>,
    std: Vec<Vec<Option<f64>>>,
}

impl Baseline {
    /// Compute the baseline of a flux series.
    ///
    /// Pure function of the series; `window >= series.len()` simply yields
    /// an all-undefined baseline, not an error.
    pub fn compute(series: &FluxSeries, window: usize) -> Baseline {
        let bins = series.len();
        let channels = series.channels();
        let mut mean = vec![vec![None; channels]; bins];
        let mut std = vec![vec![None; channels]; bins];

        if window == 0 || window >= bins {
            return Baseline { window, mean, std };
        }

        for ch in 0..channels {
            for bin in window..bins {
                let mut sum = 0.0;
                let mut sum_sq = 0.0;
                let mut complete = true;
                for prev in bin - window..bin {
                    match series.value(prev, ch) {
                        Some(v) => {
                            sum += v;
                            sum_sq += v * v;
                        }
                        None => {
                            complete = false;
                            break;
                        }
                    }
                }
                if !complete {
                    continue;
                }
                let n = window as f64;
                let m = sum / n;
                // Population variance (ddof = 0); clamp tiny negatives from
                // floating point cancellation.
                let var = (sum_sq / n - m * m).max(0.0);
                mean[bin][ch] = Some(m);
                std[bin][ch] = Some(var.sqrt());
            }
        }

        Baseline { window, mean, std }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Baseline mean at (bin, channel); `None` while undefined.
    pub fn mean(&self, bin: usize, channel: usize) -> Option<f64> {
        *self.mean.get(bin)?.get(channel)?
    }

    /// Baseline standard deviation at (bin, channel); `None` while undefined.
    pub fn std(&self, bin: usize, channel: usize) -> Option<f64> {
        *self.std.get(bin)?.get(channel)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn series(values: Vec<Vec<Option<f64>>>) -> FluxSeries {
        let channels = values[0].len();
        FluxSeries::from_rows(
            Utc.with_ymd_and_hms(2021, 5, 21, 0, 0, 0).unwrap(),
            300,
            channels,
            values,
        )
        .unwrap()
    }

    #[test]
    fn test_undefined_for_leading_bins() {
        let s = series((0..10).map(|i| vec![Some(i as f64)]).collect());
        let b = Baseline::compute(&s, 4);

        for bin in 0..4 {
            assert_eq!(b.mean(bin, 0), None, "bin {} must be undefined", bin);
            assert_eq!(b.std(bin, 0), None);
        }
        assert!(b.mean(4, 0).is_some());
    }

    #[test]
    fn test_trailing_mean_excludes_current_bin() {
        // Constant 2.0 background with a spike at bin 5; the spike's own
        // baseline must still be the quiet background.
        let mut values: Vec<Vec<Option<f64>>> = (0..8).map(|_| vec![Some(2.0)]).collect();
        values[5] = vec![Some(100.0)];
        let b = Baseline::compute(&series(values), 4);

        assert_eq!(b.mean(5, 0), Some(2.0));
        assert_eq!(b.std(5, 0), Some(0.0));
        // The spike enters the window of later bins.
        assert!(b.mean(6, 0).unwrap() > 2.0);
    }

    #[test]
    fn test_population_std() {
        // Window over [1, 2, 3, 4]: mean 2.5, population std sqrt(1.25).
        let s = series(vec![
            vec![Some(1.0)],
            vec![Some(2.0)],
            vec![Some(3.0)],
            vec![Some(4.0)],
            vec![Some(0.0)],
        ]);
        let b = Baseline::compute(&s, 4);

        assert_eq!(b.mean(4, 0), Some(2.5));
        assert!((b.std(4, 0).unwrap() - 1.25_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_window_longer_than_series_yields_no_values() {
        let s = series((0..5).map(|i| vec![Some(i as f64)]).collect());
        let b = Baseline::compute(&s, 18);

        for bin in 0..5 {
            assert_eq!(b.mean(bin, 0), None);
            assert_eq!(b.std(bin, 0), None);
        }
    }

    #[test]
    fn test_missing_data_poisons_window() {
        let s = series(vec![
            vec![Some(1.0)],
            vec![None],
            vec![Some(3.0)],
            vec![Some(4.0)],
            vec![Some(5.0)],
            vec![Some(6.0)],
        ]);
        let b = Baseline::compute(&s, 3);

        // Windows containing the gap are undefined.
        assert_eq!(b.mean(3, 0), None);
        assert_eq!(b.mean(4, 0), None);
        // First fully clean window: bins [2, 3, 4].
        assert_eq!(b.mean(5, 0), Some(4.0));
    }
}
