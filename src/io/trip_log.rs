//! Trip log - append-only persistence of completed trips
//!
//! Trips are written in JSONL format (one JSON object per line)
//! to the file specified in config.

use crate::domain::trip::TripRecord;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Trip persistence failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("trip log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode trip record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("corrupt trip log at line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Persistence collaborator for the trip store
pub trait TripLog: Send {
    /// All previously persisted trips, oldest first
    fn load(&self) -> Result<Vec<TripRecord>, StoreError>;

    fn append(&mut self, record: &TripRecord) -> Result<(), StoreError>;
}

/// JSONL file trip log
pub struct JsonlTripLog {
    file_path: PathBuf,
}

impl JsonlTripLog {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        info!(file_path = %file_path.display(), "trip_log_initialized");
        Self { file_path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

impl TripLog for JsonlTripLog {
    fn load(&self) -> Result<Vec<TripRecord>, StoreError> {
        let content = match fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(line)
                .map_err(|source| StoreError::Decode { line: idx + 1, source })?;
            records.push(record);
        }

        debug!(file = %self.file_path.display(), trips = records.len(), "trip_log_loaded");
        Ok(records)
    }

    fn append(&mut self, record: &TripRecord) -> Result<(), StoreError> {
        let line = record.to_json()?;

        // Create parent directories if they don't exist
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.file_path)?;
        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path.display(), bytes = %line.len(), "trip_log_written");

        Ok(())
    }
}

/// Trip log kept in memory only
#[derive(Debug, Default)]
pub struct MemoryTripLog {
    records: Vec<TripRecord>,
}

impl MemoryTripLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<TripRecord>) -> Self {
        Self { records }
    }
}

impl TripLog for MemoryTripLog {
    fn load(&self) -> Result<Vec<TripRecord>, StoreError> {
        Ok(self.records.clone())
    }

    fn append(&mut self, record: &TripRecord) -> Result<(), StoreError> {
        self.records.push(record.clone());
        Ok(())
    }
}
