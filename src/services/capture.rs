//! Capture loop - drives the camera until a station is detected
//!
//! Each iteration:
//! 1. stop requested → release camera, return `Cancelled`
//! 2. cooling down → report remaining wait, sleep the coarse interval,
//!    no frame read
//! 3. read a frame (bounded retries on transient failures)
//! 4. decode, feed the debouncer, report the observation
//! 5. `Accepted` → return the scan event; otherwise sleep and go again
//!
//! Sleeps race the stop signal, so a stop is honoured within one
//! iteration. The camera lease is released on every exit path.

use crate::domain::types::ScanEvent;
use crate::infra::clock::Clock;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::camera::{first_payload, CameraLease, DeviceError, Frame, FrameDecoder, SharedCamera};
use crate::services::debouncer::{Observation, ScanDebouncer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{error, info, trace, warn};

/// Polling and retry policy for the capture loop
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub poll_interval: Duration,
    pub cooldown_poll_interval: Duration,
    pub max_read_failures: u32,
    pub retry_delay: Duration,
}

impl CaptureSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            cooldown_poll_interval: config.cooldown_poll_interval(),
            max_read_failures: config.max_read_failures(),
            retry_delay: config.retry_delay(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Terminal result of one `run`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Detected(ScanEvent),
    Cancelled,
}

/// Progress reported to the caller while scanning
#[derive(Debug)]
pub enum CaptureUpdate<'a> {
    /// Camera opened, scanning started
    Scanning,
    Frame { frame: &'a Frame, observation: &'a Observation },
    CoolingDown { remaining: Duration },
    ReadFailed { attempt: u32, error: &'a DeviceError },
}

impl CaptureUpdate<'_> {
    /// Status text for display
    pub fn status_line(&self) -> String {
        match self {
            CaptureUpdate::Scanning => "Scanning for QR code...".to_string(),
            CaptureUpdate::Frame { observation, .. } => match observation {
                Observation::Accepted(station) => format!("QR code detected: {}", station),
                Observation::Invalid(payload) => format!("Invalid QR code: {}", payload),
                Observation::NoSignal => "Scanning for QR code...".to_string(),
                Observation::Suppressed { remaining } => waiting_line(*remaining),
            },
            CaptureUpdate::CoolingDown { remaining } => waiting_line(*remaining),
            CaptureUpdate::ReadFailed { .. } => "Failed to grab frame from camera".to_string(),
        }
    }
}

fn waiting_line(remaining: Duration) -> String {
    format!(
        "QR code detected! Waiting for {} seconds before resuming scan...",
        remaining.as_secs()
    )
}

/// Resolves once `stop` reads `true`. Never resolves if the sender is gone.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn sleep_unless_stopped(stop: &mut watch::Receiver<bool>, duration: Duration) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = stopped(stop) => {}
    }
}

pub struct CaptureLoop {
    camera: SharedCamera,
    decoder: Arc<dyn FrameDecoder>,
    debouncer: ScanDebouncer,
    clock: Arc<dyn Clock>,
    settings: CaptureSettings,
    metrics: Arc<Metrics>,
}

impl CaptureLoop {
    pub fn new(
        camera: SharedCamera,
        decoder: Arc<dyn FrameDecoder>,
        debouncer: ScanDebouncer,
        clock: Arc<dyn Clock>,
        settings: CaptureSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { camera, decoder, debouncer, clock, settings, metrics }
    }

    pub fn debouncer(&self) -> &ScanDebouncer {
        &self.debouncer
    }

    pub fn debouncer_mut(&mut self) -> &mut ScanDebouncer {
        &mut self.debouncer
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Scan until a station is accepted, `stop` turns true, or the camera fails.
    pub async fn run<F>(
        &mut self,
        mut on_update: F,
        mut stop: watch::Receiver<bool>,
    ) -> Result<CaptureOutcome, DeviceError>
    where
        F: FnMut(CaptureUpdate<'_>),
    {
        let mut lease = CameraLease::acquire(&self.camera).inspect_err(|e| {
            self.metrics.record_device_error();
            error!(error = %e, "camera_acquire_failed");
        })?;

        info!(
            device = %lease.name(),
            poll_interval_ms = %self.settings.poll_interval.as_millis(),
            max_read_failures = %self.settings.max_read_failures,
            "capture_started"
        );
        on_update(CaptureUpdate::Scanning);

        let max_failures = self.settings.max_read_failures.max(1);
        let mut failures: u32 = 0;

        loop {
            if *stop.borrow_and_update() {
                self.metrics.record_capture_cancelled();
                info!(device = %lease.name(), "capture_cancelled");
                return Ok(CaptureOutcome::Cancelled);
            }

            if let Some(remaining) = self.debouncer.cooldown_remaining(self.clock.now_ms()) {
                self.metrics.record_scan_suppressed();
                trace!(remaining_ms = %remaining.as_millis(), "capture_cooling_down");
                on_update(CaptureUpdate::CoolingDown { remaining });
                sleep_unless_stopped(&mut stop, self.settings.cooldown_poll_interval).await;
                continue;
            }

            let read_started = Instant::now();
            let frame = match lease.read_frame().await {
                Ok(frame) => {
                    failures = 0;
                    frame
                }
                Err(e) if e.is_retryable() => {
                    failures += 1;
                    self.metrics.record_read_failure();
                    if failures >= max_failures {
                        let err = DeviceError::RetriesExhausted { attempts: failures, last: e.to_string() };
                        self.metrics.record_device_error();
                        error!(device = %lease.name(), error = %err, "capture_device_error");
                        return Err(err);
                    }
                    warn!(
                        device = %lease.name(),
                        attempt = %failures,
                        max_attempts = %max_failures,
                        error = %e,
                        "camera_read_failed"
                    );
                    on_update(CaptureUpdate::ReadFailed { attempt: failures, error: &e });
                    sleep_unless_stopped(&mut stop, self.settings.retry_delay).await;
                    continue;
                }
                Err(e) => {
                    self.metrics.record_device_error();
                    error!(device = %lease.name(), error = %e, "capture_device_error");
                    return Err(e);
                }
            };

            let payload = first_payload(self.decoder.as_ref(), &frame);
            let now = self.clock.now_ms();
            let observation = self.debouncer.observe(payload.as_deref(), now);
            self.metrics.record_frame(read_started.elapsed().as_micros() as u64);
            on_update(CaptureUpdate::Frame { frame: &frame, observation: &observation });

            let pause = match observation {
                Observation::Accepted(station_id) => {
                    self.metrics.record_scan_accepted();
                    info!(station = %station_id, frame_seq = %frame.seq, at_ms = %now, "capture_detected");
                    return Ok(CaptureOutcome::Detected(ScanEvent { station_id, at_ms: now }));
                }
                // Clock stepped back since the cooldown check
                Observation::Suppressed { .. } => {
                    self.metrics.record_scan_suppressed();
                    self.settings.cooldown_poll_interval
                }
                Observation::Invalid(payload) => {
                    self.metrics.record_scan_invalid();
                    warn!(payload = %payload, frame_seq = %frame.seq, "invalid_qr_code");
                    self.settings.poll_interval
                }
                Observation::NoSignal => {
                    self.metrics.record_no_signal();
                    trace!(frame_seq = %frame.seq, "capture_no_signal");
                    self.settings.poll_interval
                }
            };

            sleep_unless_stopped(&mut stop, pause).await;
        }
    }
}
