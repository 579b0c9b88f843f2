//! Consolidated public surface.
//!
//! Downstream consumers can import everything a run needs from this one
//! module instead of navigating the crate layout.

pub use crate::config::{CorroborationPolicy, RunConfig};
pub use crate::connectivity::{
    connectivity_file_name, parse_connectivity, ConnectivityCache, ConnectivityProvider,
    DirectoryProvider, MemoryProvider,
};
pub use crate::error::{AnalysisError, AnalysisResult};
pub use crate::models::channel::{relativistic_speed, EnergyBin, Particle, SensorChannels};
pub use crate::models::{
    ConnectivityPoint, ConnectivitySet, EventInterval, EventTable, FlareId, FlareList,
    FlareRecord, FluxSeries, QuantizedTime, SunTimes, WindCategory,
};
pub use crate::services::{
    run_analysis, AnalysisReport, ArrivalModel, ArrivalWindow, Baseline, Correlation,
    ConnectivityMatch, ConnectivityMatcher, Correlator, EventDetector, FlareOutcome,
    FlareVerdict, RunFailure, RunSummary, SensorData, Viewing,
};
