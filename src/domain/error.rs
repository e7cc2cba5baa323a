//! Domain error types.

/// Domain-level errors for trip validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TripError {
    /// Scanned payload does not name a registered station
    #[error("unknown station: {0}")]
    InvalidStation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TripError::InvalidStation("Atlantis".into());
        assert_eq!(err.to_string(), "unknown station: Atlantis");
    }
}
