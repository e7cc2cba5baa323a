//! Shared types for the trip tracker

use serde::{Deserialize, Serialize};

/// Newtype wrapper for user ids to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated station observation produced by the capture loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub station_id: String,
    pub at_ms: u64, // epoch ms
}

impl ScanEvent {
    pub fn new(station_id: &str, at_ms: u64) -> Self {
        Self { station_id: station_id.to_string(), at_ms }
    }
}
