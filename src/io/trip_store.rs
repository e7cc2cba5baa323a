//! Trip store - append-only collection of completed trips
//!
//! History is loaded from the trip log when the store opens; every new
//! trip is kept in memory and appended to the log. There is no update
//! or delete.

use crate::domain::trip::TripRecord;
use crate::domain::types::UserId;
use crate::io::trip_log::{MemoryTripLog, StoreError, TripLog};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info};

/// Store shared between sessions; appends go through the lock (single writer)
pub type SharedTripStore = Arc<Mutex<TripStore>>;

pub struct TripStore {
    records: Vec<TripRecord>,
    log: Box<dyn TripLog>,
}

impl TripStore {
    /// Open a store, loading existing history from the log
    pub fn open(log: Box<dyn TripLog>) -> Result<Self, StoreError> {
        let records = log.load()?;
        info!(trips = records.len(), "trip_store_opened");
        Ok(Self { records, log })
    }

    /// Store without persistence
    pub fn in_memory() -> Self {
        Self { records: Vec::new(), log: Box::new(MemoryTripLog::new()) }
    }

    pub fn into_shared(self) -> SharedTripStore {
        Arc::new(Mutex::new(self))
    }

    /// Append a completed trip.
    ///
    /// The trip is always kept in memory; a log failure is returned so the
    /// caller can report that the trip was not persisted.
    pub fn record(&mut self, trip: TripRecord) -> Result<(), StoreError> {
        let result = self.log.append(&trip);
        if let Err(ref e) = result {
            error!(trip_id = %trip.trip_id, user = %trip.user_id, error = %e, "trip_persist_failed");
        }
        self.records.push(trip);
        result
    }

    /// A user's trips in insertion order
    pub fn list_for(&self, user: &UserId) -> Vec<&TripRecord> {
        self.records.iter().filter(|t| &t.user_id == user).collect()
    }

    pub fn total_points_for(&self, user: &UserId) -> u64 {
        self.records
            .iter()
            .filter(|t| &t.user_id == user)
            .map(|t| t.points_earned as u64)
            .sum()
    }

    pub fn all(&self) -> &[TripRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::station::Station;
    use crate::io::trip_log::JsonlTripLog;
    use tempfile::tempdir;

    fn trip(user: &str, from: &Station, to: &Station) -> TripRecord {
        TripRecord::between(UserId::new(user), from, 1_000, to, 2_000)
    }

    fn stations() -> (Station, Station, Station) {
        (
            Station::new("HarbourFront", 1.2850, 103.8500),
            Station::new("Outram Park", 1.2950, 103.8550),
            Station::new("Chinatown", 1.3000, 103.8500),
        )
    }

    #[test]
    fn test_list_for_filters_by_user_in_order() {
        let (a, b, c) = stations();
        let mut store = TripStore::in_memory();

        store.record(trip("alice", &a, &b)).unwrap();
        store.record(trip("bob", &b, &c)).unwrap();
        store.record(trip("alice", &b, &c)).unwrap();

        let alice = store.list_for(&UserId::new("alice"));
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].start_station, "HarbourFront");
        assert_eq!(alice[1].start_station, "Outram Park");
        assert_eq!(store.list_for(&UserId::new("bob")).len(), 1);
        assert!(store.list_for(&UserId::new("nobody")).is_empty());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_total_points() {
        let (a, b, _) = stations();
        let mut store = TripStore::in_memory();

        store.record(trip("alice", &a, &b)).unwrap();
        store.record(trip("alice", &b, &a)).unwrap();

        assert_eq!(store.total_points_for(&UserId::new("alice")), 24);
        assert_eq!(store.total_points_for(&UserId::new("bob")), 0);
    }

    #[test]
    fn test_open_loads_history() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("trips.jsonl");
        let (a, b, _) = stations();

        {
            let mut store = TripStore::open(Box::new(JsonlTripLog::new(&file_path))).unwrap();
            store.record(trip("alice", &a, &b)).unwrap();
        }

        let store = TripStore::open(Box::new(JsonlTripLog::new(&file_path))).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].end_station, "Outram Park");
    }

    #[test]
    fn test_open_appends_after_existing_history() {
        let (a, b, c) = stations();
        let log = MemoryTripLog::with_records(vec![trip("alice", &a, &b)]);
        let mut store = TripStore::open(Box::new(log)).unwrap();

        store.record(trip("alice", &b, &c)).unwrap();

        let alice = store.list_for(&UserId::new("alice"));
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].end_station, "Outram Park");
        assert_eq!(alice[1].end_station, "Chinatown");
    }

    #[test]
    fn test_persist_failure_keeps_trip_in_memory() {
        let dir = tempdir().unwrap();
        let (a, b, _) = stations();
        // Appending to a directory path always fails
        let mut store =
            TripStore { records: Vec::new(), log: Box::new(JsonlTripLog::new(dir.path())) };

        assert!(store.record(trip("alice", &a, &b)).is_err());
        assert_eq!(store.list_for(&UserId::new("alice")).len(), 1);
    }
}
