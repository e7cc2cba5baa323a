//! Per-user session context
//!
//! The Session ties together everything a logged-in user works with:
//! - Trip state machine (start/end pairing)
//! - Capture loop (camera, decoder, debouncer)
//! - Shared trip store (history and points)
//!
//! Created on login, torn down by `logout`. Nothing here is global.

use crate::domain::error::TripError;
use crate::domain::station::StationRegistry;
use crate::domain::trip::TripRecord;
use crate::domain::types::UserId;
use crate::infra::clock::Clock;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::camera::{DeviceError, FrameDecoder, SharedCamera};
use crate::io::trip_log::StoreError;
use crate::io::trip_store::SharedTripStore;
use crate::services::capture::{CaptureLoop, CaptureOutcome, CaptureSettings, CaptureUpdate};
use crate::services::debouncer::ScanDebouncer;
use crate::services::trip_session::{Transition, TripSession, TripState};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Trip(#[from] TripError),

    /// The trip was completed and kept in memory, but not persisted
    #[error("trip not saved: {0}")]
    Store(#[from] StoreError),
}

/// What one `scan` call achieved
#[derive(Debug, Clone, PartialEq)]
pub enum ScanResult {
    Started { station: String, at_ms: u64 },
    Completed(TripRecord),
    /// Stopped before a station was detected; trip state unchanged
    Cancelled,
}

impl ScanResult {
    pub fn summary(&self) -> String {
        match self {
            ScanResult::Started { station, .. } => format!("Trip started at {}", station),
            ScanResult::Completed(trip) => format!(
                "Trip completed: {} -> {}, {} km, {} points",
                trip.start_station,
                trip.end_station,
                trip.distance_display(),
                trip.points_earned
            ),
            ScanResult::Cancelled => "Scan cancelled".to_string(),
        }
    }
}

pub struct Session {
    /// Logged-in user
    user: UserId,
    /// Start/end pairing for this user
    trip: TripSession,
    /// Camera polling and debouncing; the debouncer survives across scans
    capture: CaptureLoop,
    /// Completed trips, shared with other sessions
    store: SharedTripStore,
    /// Metrics collector
    metrics: Arc<Metrics>,
}

impl Session {
    pub fn new(
        user: UserId,
        registry: Arc<StationRegistry>,
        capture: CaptureLoop,
        store: SharedTripStore,
        metrics: Arc<Metrics>,
    ) -> Self {
        info!(user = %user, "session_started");
        Self { trip: TripSession::new(user.clone(), registry), user, capture, store, metrics }
    }

    /// Build a session and its capture loop from configuration
    pub fn login(
        user: UserId,
        config: &Config,
        camera: SharedCamera,
        decoder: Arc<dyn FrameDecoder>,
        clock: Arc<dyn Clock>,
        store: SharedTripStore,
        metrics: Arc<Metrics>,
    ) -> Self {
        let registry = Arc::new(config.station_registry());
        let capture = CaptureLoop::new(
            camera,
            decoder,
            ScanDebouncer::new(registry.clone(), config.cooldown()),
            clock,
            CaptureSettings::from_config(config),
            metrics.clone(),
        );
        Self::new(user, registry, capture, store, metrics)
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn state(&self) -> &TripState {
        self.trip.state()
    }

    pub fn capture(&self) -> &CaptureLoop {
        &self.capture
    }

    /// Run the camera until a station is scanned, then apply it to the trip.
    ///
    /// The first scan starts a trip, the next one completes it. Device
    /// failures and cancellation leave the trip state as it was.
    pub async fn scan<F>(&mut self, on_update: F, stop: watch::Receiver<bool>) -> Result<ScanResult, SessionError>
    where
        F: FnMut(CaptureUpdate<'_>),
    {
        let event = match self.capture.run(on_update, stop).await? {
            CaptureOutcome::Detected(event) => event,
            CaptureOutcome::Cancelled => return Ok(ScanResult::Cancelled),
        };

        match self.trip.on_scan(&event)? {
            Transition::Started { station, at_ms } => Ok(ScanResult::Started { station, at_ms }),
            Transition::Completed(trip) => {
                self.metrics.record_trip_completed(trip.points_earned);
                self.store.lock().record(trip.clone())?;
                Ok(ScanResult::Completed(trip))
            }
        }
    }

    /// Abandon the running trip, if any
    pub fn cancel_trip(&mut self) -> bool {
        let cancelled = self.trip.cancel();
        if cancelled {
            self.metrics.record_trip_cancelled();
        }
        cancelled
    }

    /// This user's completed trips, oldest first
    pub fn history(&self) -> Vec<TripRecord> {
        self.store.lock().list_for(&self.user).into_iter().cloned().collect()
    }

    pub fn total_points(&self) -> u64 {
        self.store.lock().total_points_for(&self.user)
    }

    /// End the session: drops any pending trip and the scan cooldown
    pub fn logout(mut self) {
        if self.cancel_trip() {
            warn!(user = %self.user, "pending_trip_discarded_on_logout");
        }
        self.capture.debouncer_mut().reset();
        info!(user = %self.user, "session_ended");
    }
}
