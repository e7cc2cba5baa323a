//! Lock-free metrics collection and periodic reporting
//!
//! Counters are atomics updated from the capture loop and the session.
//! NOTE: All atomics use Relaxed ordering; these are statistical counters
//! only and must not drive control flow.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Frame processing latency bucket boundaries (microseconds)
/// Buckets: ≤250, ≤500, ≤1000, ≤2000, ≤4000, ≤8000, ≤16000, ≤32000, >32000
const BUCKET_BOUNDS: [u64; 8] = [250, 500, 1000, 2000, 4000, 8000, 16000, 32000];
pub const NUM_BUCKETS: usize = 9;

/// Upper bounds reported for percentiles (last bucket uses 2x the previous bound)
const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] = [250, 500, 1000, 2000, 4000, 8000, 16000, 32000, 64000];

#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Upper bound of the bucket containing the given percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;
    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Frames decoded (monotonic)
    frames_total: AtomicU64,
    /// Frames since last report (reset on report)
    frames_since_report: AtomicU64,
    /// Sum of frame processing latencies (reset on report)
    frame_latency_sum_us: AtomicU64,
    /// Max frame processing latency (reset on report)
    frame_latency_max_us: AtomicU64,
    /// Frame processing latency histogram (reset on report)
    frame_latency_buckets: [AtomicU64; NUM_BUCKETS],
    scans_accepted: AtomicU64,
    scans_invalid: AtomicU64,
    scans_suppressed: AtomicU64,
    frames_no_signal: AtomicU64,
    read_failures: AtomicU64,
    device_errors: AtomicU64,
    captures_cancelled: AtomicU64,
    trips_completed: AtomicU64,
    trips_cancelled: AtomicU64,
    points_awarded: AtomicU64,
    last_report_time: Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            frames_total: AtomicU64::new(0),
            frames_since_report: AtomicU64::new(0),
            frame_latency_sum_us: AtomicU64::new(0),
            frame_latency_max_us: AtomicU64::new(0),
            frame_latency_buckets: Default::default(),
            scans_accepted: AtomicU64::new(0),
            scans_invalid: AtomicU64::new(0),
            scans_suppressed: AtomicU64::new(0),
            frames_no_signal: AtomicU64::new(0),
            read_failures: AtomicU64::new(0),
            device_errors: AtomicU64::new(0),
            captures_cancelled: AtomicU64::new(0),
            trips_completed: AtomicU64::new(0),
            trips_cancelled: AtomicU64::new(0),
            points_awarded: AtomicU64::new(0),
            last_report_time: Mutex::new(Instant::now()),
        }
    }

    /// Record a decoded frame and its read-to-decision latency
    #[inline]
    pub fn record_frame(&self, latency_us: u64) {
        self.frames_total.fetch_add(1, Ordering::Relaxed);
        self.frames_since_report.fetch_add(1, Ordering::Relaxed);
        self.frame_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.frame_latency_max_us, latency_us);
        self.frame_latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_scan_accepted(&self) {
        self.scans_accepted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_scan_invalid(&self) {
        self.scans_invalid.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_scan_suppressed(&self) {
        self.scans_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_no_signal(&self) {
        self.frames_no_signal.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_device_error(&self) {
        self.device_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_capture_cancelled(&self) {
        self.captures_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trip_completed(&self, points: u32) {
        self.trips_completed.fetch_add(1, Ordering::Relaxed);
        self.points_awarded.fetch_add(points as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_trip_cancelled(&self) {
        self.trips_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_total(&self) -> u64 {
        self.frames_total.load(Ordering::Relaxed)
    }

    pub fn trips_completed(&self) -> u64 {
        self.trips_completed.load(Ordering::Relaxed)
    }

    /// Snapshot counters, resetting the periodic ones
    pub fn report(&self) -> MetricsSummary {
        let frames_count = self.frames_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.frame_latency_sum_us.swap(0, Ordering::Relaxed);
        let max_latency = self.frame_latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.frame_latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let frames_per_sec = if elapsed.as_secs_f64() > 0.0 {
            frames_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let avg_latency = if frames_count > 0 { latency_sum / frames_count } else { 0 };

        MetricsSummary {
            frames_total: self.frames_total.load(Ordering::Relaxed),
            frames_per_sec,
            avg_frame_latency_us: avg_latency,
            max_frame_latency_us: max_latency,
            lat_buckets,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p95_us: percentile_from_buckets(&lat_buckets, 0.95),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            scans_accepted: self.scans_accepted.load(Ordering::Relaxed),
            scans_invalid: self.scans_invalid.load(Ordering::Relaxed),
            scans_suppressed: self.scans_suppressed.load(Ordering::Relaxed),
            frames_no_signal: self.frames_no_signal.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            device_errors: self.device_errors.load(Ordering::Relaxed),
            captures_cancelled: self.captures_cancelled.load(Ordering::Relaxed),
            trips_completed: self.trips_completed.load(Ordering::Relaxed),
            trips_cancelled: self.trips_cancelled.load(Ordering::Relaxed),
            points_awarded: self.points_awarded.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub frames_total: u64,
    pub frames_per_sec: f64,
    pub avg_frame_latency_us: u64,
    pub max_frame_latency_us: u64,
    /// Bounds: ≤250, ≤500, ≤1000, ≤2000, ≤4000, ≤8000, ≤16000, ≤32000, >32000 µs
    pub lat_buckets: [u64; NUM_BUCKETS],
    pub lat_p50_us: u64,
    pub lat_p95_us: u64,
    pub lat_p99_us: u64,
    pub scans_accepted: u64,
    pub scans_invalid: u64,
    pub scans_suppressed: u64,
    pub frames_no_signal: u64,
    pub read_failures: u64,
    pub device_errors: u64,
    pub captures_cancelled: u64,
    pub trips_completed: u64,
    pub trips_cancelled: u64,
    pub points_awarded: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            frames_total = %self.frames_total,
            frames_per_sec = format!("{:.1}", self.frames_per_sec),
            avg_latency_us = %self.avg_frame_latency_us,
            max_latency_us = %self.max_frame_latency_us,
            p50_us = %self.lat_p50_us,
            p99_us = %self.lat_p99_us,
            accepted = %self.scans_accepted,
            invalid = %self.scans_invalid,
            suppressed = %self.scans_suppressed,
            read_failures = %self.read_failures,
            device_errors = %self.device_errors,
            trips_completed = %self.trips_completed,
            trips_cancelled = %self.trips_cancelled,
            points_awarded = %self.points_awarded,
            "metrics"
        );
    }
}
