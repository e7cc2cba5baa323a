//! Station registry - the fixed set of scannable stations
//!
//! The registry is built once at startup (default table or config) and is
//! read-only afterwards. QR payloads are matched against station ids exactly.

use crate::domain::error::TripError;
use crate::domain::geo::Coordinate;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// A named transit stop with fixed coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub id: String,
    pub coord: Coordinate,
}

impl Station {
    pub fn new(id: &str, lat: f64, lon: f64) -> Self {
        Self { id: id.to_string(), coord: Coordinate::new(lat, lon) }
    }
}

/// Default stations (North East line, Singapore)
const SINGAPORE_STATIONS: [(&str, f64, f64); 17] = [
    ("HarbourFront", 1.2850, 103.8500),
    ("Outram Park", 1.2950, 103.8550),
    ("Chinatown", 1.3000, 103.8500),
    ("Dhoby Ghaut", 1.3050, 103.8450),
    ("Clarke Quay", 1.3100, 103.8500),
    ("Little India", 1.3150, 103.8550),
    ("Farrer Park", 1.3200, 103.8600),
    ("Boon Keng", 1.3250, 103.8550),
    ("Potong Pasir", 1.3300, 103.8600),
    ("Woodleigh", 1.3400, 103.8650),
    ("Serangoon", 1.3500, 103.8700),
    ("Kovan", 1.3550, 103.8750),
    ("Hougang", 1.3600, 103.8800),
    ("Buangkok", 1.3650, 103.8850),
    ("Sengkang", 1.3700, 103.8900),
    ("Punggol", 1.3800, 103.8950),
    ("Punggol Coast", 1.3850, 103.9000),
];

/// Read-only mapping from station id to station
#[derive(Debug, Clone)]
pub struct StationRegistry {
    stations: Vec<Station>,
    index: FxHashMap<String, usize>,
}

impl StationRegistry {
    /// Build a registry from stations, keeping registration order.
    ///
    /// A repeated id replaces the earlier coordinates.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Station>,
    {
        let mut stations: Vec<Station> = Vec::new();
        let mut index = FxHashMap::default();

        for station in entries {
            match index.get(&station.id) {
                Some(&idx) => stations[idx] = station,
                None => {
                    index.insert(station.id.clone(), stations.len());
                    stations.push(station);
                }
            }
        }

        Self { stations, index }
    }

    /// The built-in Singapore table
    pub fn singapore() -> Self {
        Self::from_entries(
            SINGAPORE_STATIONS.iter().map(|&(id, lat, lon)| Station::new(id, lat, lon)),
        )
    }

    pub fn lookup(&self, id: &str) -> Option<&Station> {
        self.index.get(id).map(|&idx| &self.stations[idx])
    }

    #[inline]
    pub fn is_valid(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Like `lookup`, but an unknown id is an `InvalidStation` error
    pub fn resolve(&self, id: &str) -> Result<&Station, TripError> {
        self.lookup(id).ok_or_else(|| TripError::InvalidStation(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl Default for StationRegistry {
    fn default() -> Self {
        Self::singapore()
    }
}
