//! Domain models - stations, distances and trip records
//!
//! This module contains the canonical data types used throughout the system:
//! - `Station` / `StationRegistry` - the fixed set of scannable stations
//! - `distance_km` - great-circle distance between two coordinates
//! - `TripRecord` - a completed, scored trip
//! - `ScanEvent` - a validated "station observed" event from the camera
//! - `TripError` - domain validation failures

pub mod error;
pub mod geo;
pub mod station;
pub mod trip;
pub mod types;

// Re-export commonly used types at module level
pub use error::TripError;
pub use geo::{distance_km, points_for_distance, Coordinate};
pub use station::{Station, StationRegistry};
pub use trip::TripRecord;
pub use types::{ScanEvent, UserId};
