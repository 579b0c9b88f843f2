//! Typed domain entities.
//!
//! All entities are read-only within one analysis run; invariants such as
//! `start <= end` are enforced at construction time.

pub mod channel;
pub mod connectivity;
pub mod flare;
pub mod flux;

pub use channel::{EnergyBin, Particle, SensorChannels};
pub use connectivity::{ConnectivityPoint, ConnectivitySet, QuantizedTime, WindCategory};
pub use flare::{FlareId, FlareList, FlareRecord, SunTimes};
pub use flux::{EventInterval, EventTable, FluxSeries};
