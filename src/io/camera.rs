//! Camera device and frame decoder interfaces
//!
//! The camera is an exclusively owned resource: a `CameraLease` takes the
//! shared device with `try_lock`, opens it, and releases it when dropped.
//! Dropping covers every exit path of the capture loop, including the loop
//! future itself being dropped mid-await.
//!
//! `ReplayCamera` plays back a frame script, one line per frame:
//! - `Dhoby Ghaut` - a frame containing one code
//! - `A|B` - a frame containing two codes
//! - empty line - a frame with no code
//! - `!` - a failed frame read

use crate::domain::trip::epoch_ms;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Camera failures surfaced to the capture loop
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// Another capture loop holds the camera
    #[error("camera is busy")]
    Busy,

    #[error("camera {device} unavailable: {reason}")]
    Unavailable { device: String, reason: String },

    #[error("camera {0} disconnected")]
    Disconnected(String),

    /// A single frame could not be read
    #[error("frame read failed: {0}")]
    Read(String),

    #[error("gave up after {attempts} consecutive frame read failures: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl DeviceError {
    /// Only single-frame read failures are worth retrying
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeviceError::Read(_))
    }
}

/// A captured image frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub seq: u64,
    pub captured_at: u64, // epoch ms
    pub data: Vec<u8>,
}

#[async_trait]
pub trait CameraDevice: Send {
    fn name(&self) -> &str;

    fn open(&mut self) -> Result<(), DeviceError>;

    async fn read_frame(&mut self) -> Result<Frame, DeviceError>;

    fn release(&mut self);
}

/// Extracts QR payloads from a frame
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, frame: &Frame) -> Vec<String>;
}

/// First decoded payload of a frame; further codes in the same frame are ignored
pub fn first_payload(decoder: &dyn FrameDecoder, frame: &Frame) -> Option<String> {
    decoder.decode(frame).into_iter().next()
}

/// Decoder for frames whose bytes are UTF-8 payload text, one code per line
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFrameDecoder;

impl FrameDecoder for TextFrameDecoder {
    fn decode(&self, frame: &Frame) -> Vec<String> {
        String::from_utf8_lossy(&frame.data)
            .split('\n')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

pub type SharedCamera = Arc<Mutex<Box<dyn CameraDevice>>>;

pub fn shared_camera<C: CameraDevice + 'static>(device: C) -> SharedCamera {
    Arc::new(Mutex::new(Box::new(device)))
}

/// Exclusive, opened handle on the shared camera. Releases on drop.
pub struct CameraLease {
    guard: OwnedMutexGuard<Box<dyn CameraDevice>>,
}

impl CameraLease {
    /// Take and open the camera. A held camera is `Busy`; not retried.
    pub fn acquire(camera: &SharedCamera) -> Result<Self, DeviceError> {
        let mut guard = Arc::clone(camera).try_lock_owned().map_err(|_| DeviceError::Busy)?;
        if let Err(e) = guard.open() {
            // Undo whatever a partial open left behind
            guard.release();
            warn!(device = %guard.name(), error = %e, "camera_open_failed");
            return Err(e);
        }
        info!(device = %guard.name(), "camera_opened");
        Ok(Self { guard })
    }
}

impl Deref for CameraLease {
    type Target = dyn CameraDevice;

    fn deref(&self) -> &Self::Target {
        &**self.guard
    }
}

impl DerefMut for CameraLease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut **self.guard
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.guard.release();
        info!(device = %self.guard.name(), "camera_released");
    }
}

/// Open/read/release counters, shareable with the code that drives a camera
#[derive(Debug, Default)]
pub struct CameraStats {
    opens: AtomicU64,
    releases: AtomicU64,
    reads: AtomicU64,
}

impl CameraStats {
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::Relaxed)
    }

    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ScriptLine {
    Codes(Vec<String>),
    Fail,
}

impl ScriptLine {
    fn parse(line: &str) -> Self {
        if line == "!" {
            return ScriptLine::Fail;
        }
        let codes = line.split('|').filter(|s| !s.is_empty()).map(str::to_string).collect();
        ScriptLine::Codes(codes)
    }
}

/// Camera that replays a frame script
pub struct ReplayCamera {
    name: String,
    source: Option<String>,
    frames: VecDeque<ScriptLine>,
    loaded: bool,
    opened: bool,
    seq: u64,
    stats: Arc<CameraStats>,
}

impl ReplayCamera {
    /// Camera backed by a script file, read on first open
    pub fn from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().display().to_string();
        Self {
            name: path.clone(),
            source: Some(path),
            frames: VecDeque::new(),
            loaded: false,
            opened: false,
            seq: 0,
            stats: Arc::new(CameraStats::default()),
        }
    }

    /// Camera backed by in-memory script lines
    pub fn from_lines<I, S>(name: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.to_string(),
            source: None,
            frames: lines.into_iter().map(|l| ScriptLine::parse(l.as_ref())).collect(),
            loaded: true,
            opened: false,
            seq: 0,
            stats: Arc::new(CameraStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<CameraStats> {
        Arc::clone(&self.stats)
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl CameraDevice for ReplayCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<(), DeviceError> {
        if !self.loaded {
            let path = self.source.as_deref().unwrap_or_default();
            let content = fs::read_to_string(path).map_err(|e| DeviceError::Unavailable {
                device: self.name.clone(),
                reason: e.to_string(),
            })?;
            self.frames = content.lines().map(ScriptLine::parse).collect();
            self.loaded = true;
            debug!(device = %self.name, frames = self.frames.len(), "replay_script_loaded");
        }
        self.opened = true;
        self.stats.opens.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Frame, DeviceError> {
        if !self.opened {
            return Err(DeviceError::Unavailable {
                device: self.name.clone(),
                reason: "not open".to_string(),
            });
        }
        self.stats.reads.fetch_add(1, Ordering::Relaxed);

        match self.frames.pop_front() {
            Some(ScriptLine::Codes(codes)) => {
                self.seq += 1;
                Ok(Frame { seq: self.seq, captured_at: epoch_ms(), data: codes.join("\n").into_bytes() })
            }
            Some(ScriptLine::Fail) => Err(DeviceError::Read("replayed read failure".to_string())),
            None => Err(DeviceError::Disconnected(self.name.clone())),
        }
    }

    fn release(&mut self) {
        if self.opened {
            self.opened = false;
            self.stats.releases.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn frame(data: &str) -> Frame {
        Frame { seq: 1, captured_at: 0, data: data.as_bytes().to_vec() }
    }

    #[test]
    fn test_text_decoder_first_payload_wins() {
        let decoder = TextFrameDecoder;
        assert_eq!(decoder.decode(&frame("Kovan\nSengkang")), vec!["Kovan", "Sengkang"]);
        assert_eq!(first_payload(&decoder, &frame("Kovan\nSengkang")), Some("Kovan".to_string()));
        assert_eq!(first_payload(&decoder, &frame("")), None);
    }

    #[test]
    fn test_text_decoder_keeps_whitespace() {
        assert_eq!(TextFrameDecoder.decode(&frame(" Kovan ")), vec![" Kovan "]);
    }

    #[test]
    fn test_device_error_retryable() {
        assert!(DeviceError::Read("x".into()).is_retryable());
        assert!(!DeviceError::Busy.is_retryable());
        assert!(!DeviceError::Disconnected("cam".into()).is_retryable());
        assert!(!DeviceError::RetriesExhausted { attempts: 3, last: "x".into() }.is_retryable());
    }

    #[tokio::test]
    async fn test_replay_camera_script() {
        let mut camera = ReplayCamera::from_lines("cam", ["Kovan", "", "!", "A|B"]);
        camera.open().unwrap();

        assert_eq!(camera.read_frame().await.unwrap().data, b"Kovan");
        assert!(camera.read_frame().await.unwrap().data.is_empty());
        assert!(camera.read_frame().await.unwrap_err().is_retryable());
        let multi = camera.read_frame().await.unwrap();
        assert_eq!(TextFrameDecoder.decode(&multi), vec!["A", "B"]);
        assert_eq!(multi.seq, 3);
        assert_eq!(camera.read_frame().await.unwrap_err(), DeviceError::Disconnected("cam".into()));
    }

    #[tokio::test]
    async fn test_replay_camera_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "HarbourFront").unwrap();
        writeln!(file, "Outram Park").unwrap();
        file.flush().unwrap();

        let mut camera = ReplayCamera::from_file(file.path());
        camera.open().unwrap();
        assert_eq!(camera.remaining(), 2);
        assert_eq!(camera.read_frame().await.unwrap().data, b"HarbourFront");
    }

    #[test]
    fn test_replay_camera_missing_file() {
        let mut camera = ReplayCamera::from_file("/nonexistent/frames.txt");
        assert!(matches!(camera.open(), Err(DeviceError::Unavailable { .. })));
    }

    #[test]
    fn test_lease_releases_on_drop() {
        let camera = ReplayCamera::from_lines("cam", ["Kovan"]);
        let stats = camera.stats();
        let shared = shared_camera(camera);

        {
            let lease = CameraLease::acquire(&shared).unwrap();
            assert_eq!(lease.name(), "cam");
            assert_eq!(stats.opens(), 1);
            assert!(matches!(CameraLease::acquire(&shared), Err(DeviceError::Busy)));
        }

        assert_eq!(stats.releases(), 1);
        assert!(CameraLease::acquire(&shared).is_ok());
        assert_eq!(stats.releases(), 2);
    }

    /// Device whose open always fails, counting releases
    struct DeadCamera {
        releases: Arc<AtomicU64>,
    }

    #[async_trait]
    impl CameraDevice for DeadCamera {
        fn name(&self) -> &str {
            "dead"
        }

        fn open(&mut self) -> Result<(), DeviceError> {
            Err(DeviceError::Unavailable { device: "dead".to_string(), reason: "no sensor".to_string() })
        }

        async fn read_frame(&mut self) -> Result<Frame, DeviceError> {
            Err(DeviceError::Disconnected("dead".to_string()))
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_failed_open_releases_and_frees_camera() {
        let releases = Arc::new(AtomicU64::new(0));
        let shared = shared_camera(DeadCamera { releases: releases.clone() });

        assert!(matches!(CameraLease::acquire(&shared), Err(DeviceError::Unavailable { .. })));
        assert_eq!(releases.load(Ordering::Relaxed), 1);

        // Not left locked: the next attempt fails on open again, not Busy
        assert!(matches!(CameraLease::acquire(&shared), Err(DeviceError::Unavailable { .. })));
        assert_eq!(releases.load(Ordering::Relaxed), 2);
    }
}
