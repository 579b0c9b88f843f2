//! # SOLINK
//!
//! Automated linkage between solar flares and energetic particle events.
//!
//! This crate correlates flares from the STIX flare catalog with in-situ
//! energetic-particle detections on Solar Orbiter's EPD sensor suite. For a
//! given date range it decides, per flare and per sensor, whether the flare
//! is magnetically connected to the spacecraft and whether a matching
//! particle event was observed.
//!
//! ## Features
//!
//! - **Baseline Estimation**: trailing windowed mean/std per energy channel
//! - **Event Detection**: sigma thresholding with a persistence check that
//!   turns noisy multi-channel flux series into discrete event intervals
//! - **Connectivity Matching**: nearest-footpoint search with longitude
//!   wraparound against magnetic connectivity tool samples
//! - **Arrival-Delay Modelling**: relativistic per-channel speeds and
//!   Parker-spiral propagation delays
//! - **Correlation**: flare-to-event matching across sensors and channels
//!   with configurable corroboration policies
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: consolidated public types for downstream consumers
//! - [`models`]: typed domain entities (flares, channels, flux, footpoints)
//! - [`services`]: the analysis algorithms and the batch pipeline
//! - [`connectivity`]: parsing, fetching and caching of connectivity samples
//!
//! All processing is batch: inputs are immutable per run, configuration is
//! an explicit [`config::RunConfig`] value, and the only suspending
//! operation is the connectivity lookup behind
//! [`connectivity::ConnectivityCache`].

pub mod api;
pub mod config;
pub mod error;

pub mod models;

pub mod connectivity;

pub mod services;
