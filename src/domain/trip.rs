//! Trip record - a completed, scored trip between two stations

use crate::domain::geo::{distance_km, points_for_distance};
use crate::domain::station::Station;
use crate::domain::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable)
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// Get current epoch milliseconds
#[inline]
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Format epoch milliseconds as `YYYY-MM-DD HH:MM:SS` (UTC)
pub fn format_epoch_ms(ms: u64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(ms as i64) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}

/// Completed trip. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub trip_id: String,
    pub user_id: UserId,
    pub start_station: String,
    pub end_station: String,
    pub start_time: u64, // epoch ms
    pub end_time: u64,   // epoch ms
    pub distance_km: f64,
    pub points_earned: u32,
}

impl TripRecord {
    /// Build the record for a trip from `start` to `end`.
    ///
    /// Distance and points are derived from the station coordinates, so
    /// `points_earned == floor(distance_km * 10)` always holds. An end time
    /// earlier than the start (clock stepped back) is clamped to the start.
    ///
    /// # Example
    ///
    /// ```
    /// use transit_points::domain::{Station, TripRecord, UserId};
    ///
    /// let a = Station::new("HarbourFront", 1.2850, 103.8500);
    /// let b = Station::new("Outram Park", 1.2950, 103.8550);
    /// let trip = TripRecord::between(UserId::new("alice"), &a, 1_000, &b, 61_000);
    /// assert_eq!(trip.points_earned, 12);
    /// ```
    pub fn between(user_id: UserId, start: &Station, start_time: u64, end: &Station, end_time: u64) -> Self {
        let distance = distance_km(start.coord, end.coord);
        Self {
            trip_id: new_uuid_v7(),
            user_id,
            start_station: start.id.clone(),
            end_station: end.id.clone(),
            start_time,
            end_time: end_time.max(start_time),
            distance_km: distance,
            points_earned: points_for_distance(distance),
        }
    }

    /// Trip duration in milliseconds; zero for records whose end precedes the start
    #[inline]
    pub fn duration_ms(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }

    /// Distance rounded to two decimals, as shown to users
    pub fn distance_display(&self) -> f64 {
        (self.distance_km * 100.0).round() / 100.0
    }

    /// Serialize to a single-line JSON object
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
