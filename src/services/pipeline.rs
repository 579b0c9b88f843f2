//! End-to-end correlation run.
//!
//! Ties the services together: select flares for the run range, prefetch
//! connectivity for their quantized timestamps, detect particle events per
//! sensor, then walk the flares and attribute events through the arrival
//! model and the corroboration policy.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{CorroborationPolicy, RunConfig};
use crate::connectivity::{ConnectivityCache, ConnectivityProvider};
use crate::error::AnalysisResult;
use crate::models::channel::AU_M;
use crate::models::{
    EventTable, FlareId, FlareList, FlareRecord, FluxSeries, QuantizedTime, SensorChannels,
};
use crate::services::arrival::ArrivalModel;
use crate::services::baseline::Baseline;
use crate::services::connectivity_matcher::{ConnectivityMatch, ConnectivityMatcher};
use crate::services::correlation::{Correlation, Correlator};
use crate::services::events::EventDetector;

/// Viewing direction of an EPT telescope aperture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Viewing {
    Sun,
    AntiSun,
    North,
    South,
}

impl Viewing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sun => "sun",
            Self::AntiSun => "asun",
            Self::North => "north",
            Self::South => "south",
        }
    }
}

/// One sensor's input to a run: its channel table, its flux series, and
/// how to detect and corroborate on it.
#[derive(Debug, Clone)]
pub struct SensorData {
    pub label: String,
    /// Telescope aperture for EPT inputs; STEP has a single field of view.
    pub viewing: Option<Viewing>,
    pub channels: SensorChannels,
    pub series: FluxSeries,
    pub sigma: f64,
    pub policy: CorroborationPolicy,
    /// Shift channels into a common onset frame before detection.
    pub align_dispersion: bool,
}

impl SensorData {
    /// EPT input for one viewing direction, with the run's EPT threshold.
    pub fn ept(
        viewing: Viewing,
        channels: SensorChannels,
        series: FluxSeries,
        config: &RunConfig,
    ) -> Self {
        Self {
            label: format!("EPT {}", viewing.as_str()),
            viewing: Some(viewing),
            channels,
            series,
            sigma: config.ept_sigma,
            policy: CorroborationPolicy::FirstMatch,
            align_dispersion: false,
        }
    }

    /// STEP input, threshold-corroborated and dispersion-aligned.
    pub fn step(channels: SensorChannels, series: FluxSeries, config: &RunConfig) -> Self {
        Self {
            label: "STEP".to_string(),
            viewing: None,
            channels,
            series,
            sigma: config.step_sigma,
            policy: config.corroboration,
            align_dispersion: true,
        }
    }
}

/// How one flare fared in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlareOutcome {
    /// At least one sensor's event matched.
    Correlated,
    /// Connected, but no event fell inside an arrival window.
    NoMatch,
    /// No footpoint within the connectivity threshold.
    NotConnected,
    /// The connectivity product held no footpoints at all.
    NoConnectivityData,
}

/// Per-flare verdict with the connectivity evidence behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlareVerdict {
    pub flare: FlareId,
    pub outcome: FlareOutcome,
    pub connectivity: ConnectivityMatch,
}

/// Aggregate counts over a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub analyzed_flares: usize,
    pub connected_flares: usize,
    /// Flares matched on at least one sensor.
    pub matched_flares: usize,
    /// Flares matched on at least one EPT viewing direction.
    pub ept_matched_flares: usize,
    /// Matched flares per sensor label.
    pub per_sensor: HashMap<String, usize>,
}

/// A non-fatal per-item failure the run worked around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFailure {
    /// Quantized product timestamp the failure is attached to.
    pub timestamp: QuantizedTime,
    pub message: String,
}

/// Full output of a correlation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub verdicts: Vec<FlareVerdict>,
    pub correlations: Vec<Correlation>,
    pub summary: RunSummary,
    /// Degraded connectivity lookups (permissive mode only).
    pub failures: Vec<RunFailure>,
}

struct PreparedSensor<'a> {
    data: &'a SensorData,
    table: EventTable,
    offsets: Option<Vec<usize>>,
}

/// Detect events on each sensor once, up front.
///
/// Dispersion-aligned sensors are shifted into a common onset frame using
/// the run's reference path length before the baseline and detector run.
fn prepare_sensors<'a>(
    config: &RunConfig,
    sensors: &'a [SensorData],
    reference_path_m: f64,
) -> AnalysisResult<Vec<PreparedSensor<'a>>> {
    let mut prepared = Vec::with_capacity(sensors.len());
    for data in sensors {
        let detector = EventDetector::from_config(config, data.sigma);
        let (table, offsets) = if data.align_dispersion {
            let model = ArrivalModel::new(reference_path_m, config.indirect_factor);
            let offsets = model.dispersion_offsets(&data.channels, config.cadence_seconds);
            let shifted = data.series.shift_channels(&offsets)?;
            let baseline = Baseline::compute(&shifted, config.window_length);
            (detector.find_event_table(&shifted, &baseline), Some(offsets))
        } else {
            let baseline = Baseline::compute(&data.series, config.window_length);
            (detector.find_event_table(&data.series, &baseline), None)
        };
        info!("{}: {} event(s) detected", data.label, table.len());
        prepared.push(PreparedSensor {
            data,
            table,
            offsets,
        });
    }
    Ok(prepared)
}

/// Run the full flare / particle-event correlation over the configured
/// date range.
pub async fn run_analysis<P: ConnectivityProvider>(
    config: &RunConfig,
    flares: &FlareList,
    sensors: &[SensorData],
    provider: P,
) -> AnalysisResult<AnalysisReport> {
    let selected: Vec<&FlareRecord> = flares.range(config.start_date, config.end_date);
    info!(
        "analyzing {} flare(s) between {} and {}",
        selected.len(),
        config.start_date,
        config.end_date
    );

    let cache = ConnectivityCache::new(provider, config.strict_lookup, config.lookup_retries);

    // Warm the cache for every distinct quantized timestamp concurrently.
    let stamps: HashSet<QuantizedTime> = selected
        .iter()
        .map(|f| QuantizedTime::nearest(f.peak))
        .collect();
    for result in join_all(stamps.iter().map(|&t| cache.get(t))).await {
        result?;
    }

    // Detection does not depend on the flare under test apart from the
    // alignment path length, for which the first flare's distance stands
    // in for the whole run.
    let reference_path_m = selected
        .first()
        .map(|f| f.distance_au * AU_M)
        .unwrap_or(AU_M);
    let prepared = prepare_sensors(config, sensors, reference_path_m)?;

    let matcher = ConnectivityMatcher::new(config.delta);
    let mut verdicts = Vec::with_capacity(selected.len());
    let mut correlations = Vec::new();
    let mut summary = RunSummary {
        analyzed_flares: selected.len(),
        ..RunSummary::default()
    };

    for flare in &selected {
        let set = cache.get(QuantizedTime::nearest(flare.peak)).await?;
        let connectivity = matcher.match_flare(flare, &set);
        if connectivity.connected {
            summary.connected_flares += 1;
        }

        if connectivity.no_data {
            warn!("flare {}: no connectivity footpoints, skipping", flare.id);
            verdicts.push(FlareVerdict {
                flare: flare.id,
                outcome: FlareOutcome::NoConnectivityData,
                connectivity,
            });
            continue;
        }
        if config.require_magnetic_connection && !connectivity.connected {
            verdicts.push(FlareVerdict {
                flare: flare.id,
                outcome: FlareOutcome::NotConnected,
                connectivity,
            });
            continue;
        }

        let model = ArrivalModel::new(flare.distance_au * AU_M, config.indirect_factor);
        let sun = flare.sun_times();
        let mut matched_any = false;
        let mut matched_ept = false;

        for sensor in &prepared {
            let windows = model.windows(&sensor.data.channels, &sun);
            let correlator = Correlator::new(config.cadence_seconds, sensor.data.policy);
            if let Some(correlation) = correlator.correlate(
                flare,
                &sensor.data.label,
                &windows,
                &sensor.table,
                sensor.offsets.as_deref(),
                connectivity.connected,
            ) {
                *summary.per_sensor.entry(sensor.data.label.clone()).or_insert(0) += 1;
                correlations.push(correlation);
                matched_any = true;
                matched_ept |= sensor.data.viewing.is_some();
            }
        }

        if matched_any {
            summary.matched_flares += 1;
        }
        if matched_ept {
            summary.ept_matched_flares += 1;
        }
        verdicts.push(FlareVerdict {
            flare: flare.id,
            outcome: if matched_any {
                FlareOutcome::Correlated
            } else {
                FlareOutcome::NoMatch
            },
            connectivity,
        });
    }

    let failures = cache
        .degraded()
        .into_iter()
        .map(|(timestamp, message)| RunFailure { timestamp, message })
        .collect();

    info!(
        "run complete: {}/{} flare(s) matched, {} correlation(s)",
        summary.matched_flares,
        summary.analyzed_flares,
        correlations.len()
    );
    Ok(AnalysisReport {
        verdicts,
        correlations,
        summary,
        failures,
    })
}
