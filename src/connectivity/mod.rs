//! Magnetic connectivity data access.
//!
//! Connectivity tool products are fixed-layout ascii files published at
//! six-hour cadence. This module parses them, abstracts over where they
//! come from, and memoizes lookups for the duration of a run.

pub mod cache;
pub mod parser;
pub mod provider;

pub use cache::ConnectivityCache;
pub use parser::{connectivity_file_name, parse_connectivity};
pub use provider::{ConnectivityProvider, DirectoryProvider, MemoryProvider};
