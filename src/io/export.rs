//! Trip history export as CSV

use crate::domain::trip::{format_epoch_ms, TripRecord};
use crate::io::trip_log::StoreError;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// One CSV row; headers match the history table shown to users
#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    #[serde(rename = "username")]
    user: &'a str,
    #[serde(rename = "Start Location")]
    start: &'a str,
    #[serde(rename = "End Location")]
    end: &'a str,
    #[serde(rename = "Start Time")]
    start_time: String,
    #[serde(rename = "End Time")]
    end_time: String,
    #[serde(rename = "Distance (km)")]
    distance_km: f64,
    #[serde(rename = "Points Earned")]
    points: u32,
}

impl<'a> From<&'a TripRecord> for HistoryRow<'a> {
    fn from(trip: &'a TripRecord) -> Self {
        Self {
            user: trip.user_id.as_str(),
            start: &trip.start_station,
            end: &trip.end_station,
            start_time: format_epoch_ms(trip.start_time),
            end_time: format_epoch_ms(trip.end_time),
            distance_km: trip.distance_display(),
            points: trip.points_earned,
        }
    }
}

/// Write trips as CSV with a header row
pub fn write_history_csv<W: Write>(writer: W, trips: &[&TripRecord]) -> Result<(), StoreError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for trip in trips {
        csv_writer.serialize(HistoryRow::from(*trip))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write trips as CSV to a file, replacing it
pub fn export_history_csv<P: AsRef<Path>>(path: P, trips: &[&TripRecord]) -> Result<(), StoreError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_history_csv(file, trips)?;
    info!(file = %path.display(), trips = trips.len(), "history_exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::station::Station;
    use crate::domain::types::UserId;

    #[test]
    fn test_write_history_csv() {
        let a = Station::new("Dhoby Ghaut", 1.3050, 103.8450);
        let b = Station::new("Clarke Quay", 1.3100, 103.8500);
        let trip = TripRecord::between(UserId::new("alice"), &a, 0, &b, 90_000);

        let mut out = Vec::new();
        write_history_csv(&mut out, &[&trip]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "username,Start Location,End Location,Start Time,End Time,Distance (km),Points Earned"
        );
        assert_eq!(
            lines[1],
            "alice,Dhoby Ghaut,Clarke Quay,1970-01-01 00:00:00,1970-01-01 00:01:30,0.79,7"
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_export_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");

        export_history_csv(&path, &[]).unwrap();
        assert!(path.exists());
    }
}
