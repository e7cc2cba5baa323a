//! Great-circle distance and point scoring

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Points awarded per kilometre travelled
pub const POINTS_PER_KM: f64 = 10.0;

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Haversine distance between two coordinates in kilometres.
///
/// Inputs are not range-checked; station coordinates come from the registry.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Points for a trip: `floor(distance_km * 10)`.
///
/// Negative or non-finite distances score zero.
#[inline]
pub fn points_for_distance(distance_km: f64) -> u32 {
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return 0;
    }
    (distance_km * POINTS_PER_KM).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const HARBOURFRONT: Coordinate = Coordinate::new(1.2850, 103.8500);
    const OUTRAM_PARK: Coordinate = Coordinate::new(1.2950, 103.8550);
    const DHOBY_GHAUT: Coordinate = Coordinate::new(1.3050, 103.8450);
    const CLARKE_QUAY: Coordinate = Coordinate::new(1.3100, 103.8500);

    #[test]
    fn test_distance_to_self_is_zero() {
        for c in [HARBOURFRONT, OUTRAM_PARK, DHOBY_GHAUT, CLARKE_QUAY] {
            assert_eq!(distance_km(c, c), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [(HARBOURFRONT, OUTRAM_PARK), (DHOBY_GHAUT, CLARKE_QUAY), (HARBOURFRONT, CLARKE_QUAY)];
        for (a, b) in pairs {
            assert!((distance_km(a, b) - distance_km(b, a)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_harbourfront_to_outram_park() {
        let d = distance_km(HARBOURFRONT, OUTRAM_PARK);
        assert!((d - 1.243).abs() < 0.005, "distance was {d}");
        assert_eq!(points_for_distance(d), 12);
    }

    #[test]
    fn test_dhoby_ghaut_to_clarke_quay() {
        let d = distance_km(DHOBY_GHAUT, CLARKE_QUAY);
        assert!((d - 0.786).abs() < 0.005, "distance was {d}");
        assert_eq!(points_for_distance(d), 7);
    }

    #[test]
    fn test_points_floor() {
        assert_eq!(points_for_distance(0.0), 0);
        assert_eq!(points_for_distance(0.099), 0);
        assert_eq!(points_for_distance(0.1), 1);
        assert_eq!(points_for_distance(2.57), 25);
        assert_eq!(points_for_distance(-3.0), 0);
        assert_eq!(points_for_distance(f64::NAN), 0);
    }
}
