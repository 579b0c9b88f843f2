//! Run configuration.
//!
//! All parameters of an analysis run live in an explicit [`RunConfig`] value
//! that is passed into each component. There is no ambient state: the same
//! configuration object parameterizes the baseline window, the detector
//! thresholds, the connectivity radius and the corroboration policy.
//!
//! Configurations can be loaded from TOML files; every tunable has a
//! default matching the reference analysis.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{AnalysisError, AnalysisResult};

/// How many overlapping channels it takes to call a flare connected to a
/// particle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CorroborationPolicy {
    /// Any channel's arrival window overlapping any event counts.
    FirstMatch,
    /// At least `min_channels` distinct channels must overlap the same event.
    ThresholdMatch { min_channels: usize },
}

impl Default for CorroborationPolicy {
    fn default() -> Self {
        CorroborationPolicy::ThresholdMatch { min_channels: 5 }
    }
}

/// Parameters of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// First day of the run (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the run (inclusive).
    pub end_date: NaiveDate,
    /// Baseline window length in bins.
    #[serde(default = "default_window_length")]
    pub window_length: usize,
    /// Sigma threshold for STEP channels.
    #[serde(default = "default_step_sigma")]
    pub step_sigma: f64,
    /// Sigma threshold for EPT channels.
    #[serde(default = "default_ept_sigma")]
    pub ept_sigma: f64,
    /// Acceptance radius around connectivity footpoints, degrees.
    #[serde(default = "default_delta")]
    pub delta: f64,
    /// Parker-spiral extension factor for the indirect path.
    #[serde(default = "default_indirect_factor")]
    pub indirect_factor: f64,
    /// Minimum number of simultaneously high channels for a candidate bin.
    #[serde(default = "default_min_bins")]
    pub min_bins: usize,
    /// Number of bins the persistence check looks at (candidate included).
    #[serde(default = "default_persistence_window")]
    pub persistence_window: usize,
    /// Number of those bins that must stay high.
    #[serde(default = "default_persistence_required")]
    pub persistence_required: usize,
    /// Flux series cadence in seconds.
    #[serde(default = "default_cadence_seconds")]
    pub cadence_seconds: u64,
    /// Corroboration policy applied where a sensor does not override it.
    #[serde(default)]
    pub corroboration: CorroborationPolicy,
    /// Abort the run when a connectivity lookup fails instead of degrading
    /// that timestamp to "no data".
    #[serde(default)]
    pub strict_lookup: bool,
    /// Retries for transient connectivity lookup failures.
    #[serde(default = "default_lookup_retries")]
    pub lookup_retries: u32,
    /// Require geometric connectivity in addition to a corroborated event.
    #[serde(default = "default_require_magnetic_connection")]
    pub require_magnetic_connection: bool,
}

fn default_window_length() -> usize {
    18
}

fn default_step_sigma() -> f64 {
    3.5
}

fn default_ept_sigma() -> f64 {
    2.5
}

fn default_delta() -> f64 {
    10.0
}

fn default_indirect_factor() -> f64 {
    1.5
}

fn default_min_bins() -> usize {
    5
}

fn default_persistence_window() -> usize {
    2
}

fn default_persistence_required() -> usize {
    2
}

fn default_cadence_seconds() -> u64 {
    300
}

fn default_lookup_retries() -> u32 {
    3
}

fn default_require_magnetic_connection() -> bool {
    true
}

impl RunConfig {
    /// Create a configuration for a date range with all defaults.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            window_length: default_window_length(),
            step_sigma: default_step_sigma(),
            ept_sigma: default_ept_sigma(),
            delta: default_delta(),
            indirect_factor: default_indirect_factor(),
            min_bins: default_min_bins(),
            persistence_window: default_persistence_window(),
            persistence_required: default_persistence_required(),
            cadence_seconds: default_cadence_seconds(),
            corroboration: CorroborationPolicy::default(),
            strict_lookup: false,
            lookup_retries: default_lookup_retries(),
            require_magnetic_connection: default_require_magnetic_connection(),
        }
    }

    /// Load a run configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// * `Ok(RunConfig)` if the file parses and validates
    /// * `Err(AnalysisError::Config)` otherwise
    pub fn from_file<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| AnalysisError::Config(format!("failed to read config file: {}", e)))?;

        let config: RunConfig = toml::from_str(&content)
            .map_err(|e| AnalysisError::Config(format!("failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.start_date > self.end_date {
            return Err(AnalysisError::Config(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.window_length == 0 {
            return Err(AnalysisError::Config("window_length must be >= 1".into()));
        }
        if self.step_sigma <= 0.0 || self.ept_sigma <= 0.0 {
            return Err(AnalysisError::Config("sigma factors must be positive".into()));
        }
        if self.delta < 0.0 {
            return Err(AnalysisError::Config("delta must be non-negative".into()));
        }
        if self.indirect_factor < 1.0 {
            return Err(AnalysisError::Config(
                "indirect_factor must be >= 1 (the indirect path cannot be shorter)".into(),
            ));
        }
        if let CorroborationPolicy::ThresholdMatch { min_channels } = self.corroboration {
            if min_channels == 0 {
                return Err(AnalysisError::Config(
                    "threshold_match min_channels must be >= 1".into(),
                ));
            }
        }
        if self.persistence_required > self.persistence_window {
            return Err(AnalysisError::Config(format!(
                "persistence_required ({}) exceeds persistence_window ({})",
                self.persistence_required, self.persistence_window
            )));
        }
        if self.cadence_seconds == 0 || 86400 % self.cadence_seconds != 0 {
            return Err(AnalysisError::Config(
                "cadence_seconds must divide 86400".into(),
            ));
        }
        Ok(())
    }
}
