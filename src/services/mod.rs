//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `debouncer` - Per-frame scan acceptance with post-scan cooldown
//! - `capture` - Camera polling loop producing scan events
//! - `trip_session` - Start/end trip state machine
//! - `session` - Per-user context tying capture, trips and history together

pub mod capture;
pub mod debouncer;
pub mod session;
pub mod trip_session;

// Re-export commonly used types
pub use capture::{CaptureLoop, CaptureOutcome, CaptureSettings, CaptureUpdate};
pub use debouncer::{Observation, ScanDebouncer};
pub use session::{ScanResult, Session, SessionError};
pub use trip_session::{Transition, TripSession, TripState};
