//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `camera` - Camera device and QR decoder seams, replay camera
//! - `trip_log` - JSONL persistence of completed trips
//! - `trip_store` - Append-only trip collection backed by a trip log
//! - `export` - CSV export of trip history

pub mod camera;
pub mod export;
pub mod trip_log;
pub mod trip_store;

// Re-export commonly used types
pub use camera::{
    shared_camera, CameraDevice, CameraLease, DeviceError, Frame, FrameDecoder, ReplayCamera,
    SharedCamera, TextFrameDecoder,
};
pub use trip_log::{JsonlTripLog, MemoryTripLog, StoreError, TripLog};
pub use trip_store::{SharedTripStore, TripStore};
