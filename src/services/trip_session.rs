//! Trip session state machine
//!
//! `Idle --scan(X)--> AwaitingEnd --scan(Y)--> Idle` emits one `TripRecord`
//! for X → Y. `cancel` from `AwaitingEnd` returns to `Idle` without a
//! record; from `Idle` it does nothing. Failed transitions leave the state
//! untouched.

use crate::domain::error::TripError;
use crate::domain::station::{Station, StationRegistry};
use crate::domain::trip::TripRecord;
use crate::domain::types::{ScanEvent, UserId};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub enum TripState {
    Idle,
    AwaitingEnd { start: Station, started_at: u64 },
}

impl TripState {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            TripState::Idle => "idle",
            TripState::AwaitingEnd { .. } => "awaiting_end",
        }
    }

    pub fn start_station(&self) -> Option<&Station> {
        match self {
            TripState::Idle => None,
            TripState::AwaitingEnd { start, .. } => Some(start),
        }
    }
}

/// What an accepted scan did to the session
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Started { station: String, at_ms: u64 },
    Completed(TripRecord),
}

pub struct TripSession {
    user_id: UserId,
    registry: Arc<StationRegistry>,
    state: TripState,
}

impl TripSession {
    pub fn new(user_id: UserId, registry: Arc<StationRegistry>) -> Self {
        Self { user_id, registry, state: TripState::Idle }
    }

    pub fn state(&self) -> &TripState {
        &self.state
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, TripState::Idle)
    }

    /// Apply an accepted scan: start a trip, or finish the running one.
    pub fn on_scan(&mut self, event: &ScanEvent) -> Result<Transition, TripError> {
        let station = self.registry.resolve(&event.station_id)?.clone();

        match std::mem::replace(&mut self.state, TripState::Idle) {
            TripState::Idle => {
                info!(
                    user = %self.user_id,
                    station = %station.id,
                    at_ms = %event.at_ms,
                    "trip_started"
                );
                self.state = TripState::AwaitingEnd { start: station, started_at: event.at_ms };
                Ok(Transition::Started { station: event.station_id.clone(), at_ms: event.at_ms })
            }
            TripState::AwaitingEnd { start, started_at } => {
                let trip = TripRecord::between(self.user_id.clone(), &start, started_at, &station, event.at_ms);
                info!(
                    user = %self.user_id,
                    trip_id = %trip.trip_id,
                    from = %trip.start_station,
                    to = %trip.end_station,
                    distance_km = format!("{:.2}", trip.distance_km),
                    points = %trip.points_earned,
                    "trip_completed"
                );
                Ok(Transition::Completed(trip))
            }
        }
    }

    /// Abandon the running trip. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        match std::mem::replace(&mut self.state, TripState::Idle) {
            TripState::Idle => false,
            TripState::AwaitingEnd { start, .. } => {
                info!(user = %self.user_id, station = %start.id, "trip_cancelled");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> TripSession {
        TripSession::new(UserId::new("alice"), Arc::new(StationRegistry::singapore()))
    }

    #[test]
    fn test_starts_idle() {
        let s = session();
        assert!(s.is_idle());
        assert_eq!(s.state().as_str(), "idle");
        assert!(s.state().start_station().is_none());
    }

    #[test]
    fn test_start_then_end_emits_one_record() {
        let mut s = session();

        let started = s.on_scan(&ScanEvent::new("HarbourFront", 1_000)).unwrap();
        assert_eq!(started, Transition::Started { station: "HarbourFront".to_string(), at_ms: 1_000 });
        assert_eq!(s.state().as_str(), "awaiting_end");
        assert_eq!(s.state().start_station().unwrap().id, "HarbourFront");

        let Transition::Completed(trip) = s.on_scan(&ScanEvent::new("Outram Park", 90_000)).unwrap() else {
            panic!("expected a completed trip");
        };
        assert_eq!(trip.user_id, UserId::new("alice"));
        assert_eq!(trip.start_station, "HarbourFront");
        assert_eq!(trip.end_station, "Outram Park");
        assert_eq!(trip.start_time, 1_000);
        assert_eq!(trip.end_time, 90_000);
        assert_eq!(trip.points_earned, 12);
        assert!(s.is_idle());
    }

    #[test]
    fn test_dhoby_ghaut_to_clarke_quay() {
        let mut s = session();
        s.on_scan(&ScanEvent::new("Dhoby Ghaut", 0)).unwrap();
        let Transition::Completed(trip) = s.on_scan(&ScanEvent::new("Clarke Quay", 60_000)).unwrap() else {
            panic!("expected a completed trip");
        };
        assert!((trip.distance_km - 0.786).abs() < 0.005);
        assert_eq!(trip.points_earned, 7);
    }

    #[test]
    fn test_same_station_is_zero_point_trip() {
        let mut s = session();
        s.on_scan(&ScanEvent::new("Kovan", 0)).unwrap();
        let Transition::Completed(trip) = s.on_scan(&ScanEvent::new("Kovan", 120_000)).unwrap() else {
            panic!("expected a completed trip");
        };
        assert_eq!(trip.distance_km, 0.0);
        assert_eq!(trip.points_earned, 0);
    }

    #[test]
    fn test_cancel_discards_start() {
        let mut s = session();
        s.on_scan(&ScanEvent::new("Kovan", 0)).unwrap();

        assert!(s.cancel());
        assert!(s.is_idle());

        // Next scan starts a fresh trip instead of completing one
        let t = s.on_scan(&ScanEvent::new("Hougang", 5_000)).unwrap();
        assert!(matches!(t, Transition::Started { .. }));
    }

    #[test]
    fn test_cancel_from_idle_is_noop() {
        let mut s = session();
        assert!(!s.cancel());
        assert!(!s.cancel());
        assert!(s.is_idle());
    }

    #[test]
    fn test_unknown_station_leaves_state_unchanged() {
        let mut s = session();
        assert_eq!(
            s.on_scan(&ScanEvent::new("Atlantis", 0)).unwrap_err(),
            TripError::InvalidStation("Atlantis".to_string())
        );
        assert!(s.is_idle());

        s.on_scan(&ScanEvent::new("Kovan", 0)).unwrap();
        let before = s.state().clone();
        assert!(s.on_scan(&ScanEvent::new("Atlantis", 10)).is_err());
        assert_eq!(s.state(), &before);
    }
}
