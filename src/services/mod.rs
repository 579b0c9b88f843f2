//! Analysis services.
//!
//! Each service is a pure computation over the model types; the pipeline
//! module composes them into a full run.

pub mod arrival;
pub mod baseline;
pub mod connectivity_matcher;
pub mod correlation;
pub mod events;
pub mod pipeline;

pub use arrival::{ArrivalModel, ArrivalWindow};
pub use baseline::Baseline;
pub use connectivity_matcher::{ConnectivityMatch, ConnectivityMatcher};
pub use correlation::{Correlation, Correlator};
pub use events::EventDetector;
pub use pipeline::{
    run_analysis, AnalysisReport, FlareOutcome, FlareVerdict, RunFailure, RunSummary, SensorData,
    Viewing,
};
