//! Scan debouncer
//!
//! A QR code stays in view for many consecutive frames. After a code is
//! accepted, every observation is suppressed until the cooldown elapses,
//! regardless of payload. Unknown payloads never start a cooldown.

use crate::domain::station::StationRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default cooldown after an accepted scan
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Result of feeding one decode result to the debouncer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// A known station was seen; cooldown started
    Accepted(String),
    /// Cooling down after an earlier acceptance
    Suppressed { remaining: Duration },
    /// Decoded payload is not a known station
    Invalid(String),
    /// Nothing decoded in this frame
    NoSignal,
}

pub struct ScanDebouncer {
    registry: Arc<StationRegistry>,
    cooldown: Duration,
    cooldown_until: Option<u64>, // epoch ms
}

impl ScanDebouncer {
    pub fn new(registry: Arc<StationRegistry>, cooldown: Duration) -> Self {
        Self { registry, cooldown, cooldown_until: None }
    }

    pub fn with_default_cooldown(registry: Arc<StationRegistry>) -> Self {
        Self::new(registry, DEFAULT_COOLDOWN)
    }

    pub fn observe(&mut self, payload: Option<&str>, now_ms: u64) -> Observation {
        if let Some(remaining) = self.cooldown_remaining(now_ms) {
            return Observation::Suppressed { remaining };
        }
        if self.cooldown_until.take().is_some() {
            debug!(now_ms = %now_ms, "scan_cooldown_elapsed");
        }

        let Some(payload) = payload else {
            return Observation::NoSignal;
        };

        if !self.registry.is_valid(payload) {
            debug!(payload = %payload, "scan_invalid");
            return Observation::Invalid(payload.to_string());
        }

        let until = now_ms.saturating_add(self.cooldown.as_millis() as u64);
        self.cooldown_until = Some(until);
        info!(station = %payload, cooldown_until = %until, "scan_accepted");
        Observation::Accepted(payload.to_string())
    }

    /// Time left in the current cooldown, if any
    pub fn cooldown_remaining(&self, now_ms: u64) -> Option<Duration> {
        match self.cooldown_until {
            Some(until) if now_ms < until => Some(Duration::from_millis(until - now_ms)),
            _ => None,
        }
    }

    pub fn cooldown_until(&self) -> Option<u64> {
        self.cooldown_until
    }

    /// Drop any running cooldown
    pub fn reset(&mut self) {
        self.cooldown_until = None;
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
