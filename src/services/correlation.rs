//! Flare / particle-event correlation.
//!
//! Decides whether a detected in-situ particle event is consistent with a
//! given flare by testing the event onset against the per-channel arrival
//! windows. Events are scanned in time order and the first one satisfying
//! the corroboration policy wins.

use chrono::Duration;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::CorroborationPolicy;
use crate::models::{EventInterval, EventTable, FlareId, FlareRecord};
use crate::services::arrival::ArrivalWindow;

/// A flare attributed to one detected particle event on one sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correlation {
    pub flare: FlareId,
    /// Sensor label, e.g. "EPT sun" or "STEP".
    pub sensor: String,
    /// The matched event, in observed time.
    pub event: EventInterval,
    /// Index of the event in the sensor's event table.
    pub event_index: usize,
    /// Channels whose window contained the event onset.
    pub matched_channels: Vec<usize>,
    /// Lowest matched channel index.
    pub first_channel: usize,
    /// Highest matched channel index.
    pub last_channel: usize,
    /// The flare was magnetically connected at match time.
    pub connected: bool,
}

/// Applies a corroboration policy to events and arrival windows.
#[derive(Debug, Clone)]
pub struct Correlator {
    /// Series cadence, needed to undo dispersion alignment on onsets.
    pub cadence_seconds: u64,
    pub policy: CorroborationPolicy,
}

impl Correlator {
    pub fn new(cadence_seconds: u64, policy: CorroborationPolicy) -> Self {
        Self {
            cadence_seconds,
            policy,
        }
    }

    /// Channels whose arrival window strictly contains the event onset.
    ///
    /// When the series was dispersion-aligned before detection, each
    /// channel's onset is moved back to observed time by adding its
    /// alignment offset. Under a threshold policy a channel must also
    /// have been active in the event itself.
    fn matched_channels(
        &self,
        event: &EventInterval,
        event_index: usize,
        windows: &[Option<ArrivalWindow>],
        table: &EventTable,
        offsets: Option<&[usize]>,
    ) -> Vec<usize> {
        let require_active = matches!(self.policy, CorroborationPolicy::ThresholdMatch { .. });
        windows
            .iter()
            .enumerate()
            .filter_map(|(ch, window)| {
                let window = window.as_ref()?;
                let shift = offsets
                    .and_then(|o| o.get(ch).copied())
                    .unwrap_or(0) as i64
                    * self.cadence_seconds as i64;
                let onset = event.start() + Duration::seconds(shift);
                if window.low < onset && onset < window.high {
                    if require_active && !table.channel_active(event_index, ch) {
                        return None;
                    }
                    Some(ch)
                } else {
                    None
                }
            })
            .collect()
    }

    fn policy_satisfied(&self, matched: &[usize]) -> bool {
        // An empty match set never satisfies any policy, even a zero
        // threshold.
        if matched.is_empty() {
            return false;
        }
        match self.policy {
            CorroborationPolicy::FirstMatch => true,
            CorroborationPolicy::ThresholdMatch { min_channels } => matched.len() >= min_channels,
        }
    }

    /// Attribute the flare to the first event satisfying the policy.
    pub fn correlate(
        &self,
        flare: &FlareRecord,
        sensor: &str,
        windows: &[Option<ArrivalWindow>],
        table: &EventTable,
        offsets: Option<&[usize]>,
        connected: bool,
    ) -> Option<Correlation> {
        for (index, event) in table.intervals().iter().enumerate() {
            let matched = self.matched_channels(event, index, windows, table, offsets);
            if self.policy_satisfied(&matched) {
                debug!(
                    "flare {} matched event {} on {} in {} channel(s)",
                    flare.id, index, sensor, matched.len()
                );
                let first_channel = matched[0];
                let last_channel = *matched.last().unwrap_or(&first_channel);
                return Some(Correlation {
                    flare: flare.id,
                    sensor: sensor.to_string(),
                    event: *event,
                    event_index: index,
                    matched_channels: matched,
                    first_channel,
                    last_channel,
                    connected,
                });
            }
        }
        None
    }
}
