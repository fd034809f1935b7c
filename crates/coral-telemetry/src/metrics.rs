//! The counters and histograms a node accumulates between exporter publishes.

use hdrhistogram::Histogram;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Why a frame was dropped from the work queue or skip filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropAction {
    /// The bounded work queue was at capacity and the oldest entry was evicted.
    Full,
    /// The frame-skip filter discarded the frame.
    Pass,
}

/// Counters and histograms for one node. Safe to share across worker tasks via `Arc`.
pub struct Metrics {
    process_frames_count: AtomicU64,
    drop_frames_full: AtomicU64,
    drop_frames_pass: AtomicU64,
    process_frames_cost: Mutex<Histogram<u64>>,
    pendding_frames_cost: Mutex<Histogram<u64>>,
}

/// A snapshot of every metric, ready to be serialized and published.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Frames successfully processed since the last publish.
    pub process_frames_count: u64,
    /// Frames dropped for queue overflow since the last publish.
    pub drop_frames_full: u64,
    /// Frames dropped by the frame-skip filter since the last publish.
    pub drop_frames_pass: u64,
    /// Mean sender wall time in seconds, if any samples were recorded.
    pub process_frames_cost_mean: Option<f64>,
    /// Mean per-hop pending latency in seconds, if any samples were recorded.
    pub pendding_frames_cost_mean: Option<f64>,
}

impl Metrics {
    /// Creates a fresh, zeroed metrics set.
    ///
    /// # Panics
    ///
    /// Never, in practice: the histogram bounds below are valid by construction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            process_frames_count: AtomicU64::new(0),
            drop_frames_full: AtomicU64::new(0),
            drop_frames_pass: AtomicU64::new(0),
            process_frames_cost: Mutex::new(
                Histogram::new_with_bounds(1, 60_000_000, 3).expect("valid histogram bounds"),
            ),
            pendding_frames_cost: Mutex::new(
                Histogram::new_with_bounds(1, 60_000_000, 3).expect("valid histogram bounds"),
            ),
        }
    }

    /// Records one successfully processed frame.
    pub fn record_processed(&self) {
        let _ = self.process_frames_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one dropped frame, attributed to `action`.
    pub fn record_drop(&self, action: DropAction) {
        match action {
            DropAction::Full => {
                let _ = self.drop_frames_full.fetch_add(1, Ordering::Relaxed);
            }
            DropAction::Pass => {
                let _ = self.drop_frames_pass.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Records one `sender` callback's wall-clock duration.
    pub fn record_process_cost(&self, duration: std::time::Duration) {
        let micros = duration.as_micros().clamp(1, u64::MAX as u128) as u64;
        if let Ok(mut hist) = self.process_frames_cost.lock() {
            let _ = hist.record(micros);
        }
    }

    /// Records one hop's pending latency (`now - envelope.timestamp` at receive time).
    pub fn record_pending_cost(&self, duration: std::time::Duration) {
        let micros = duration.as_micros().clamp(1, u64::MAX as u128) as u64;
        if let Ok(mut hist) = self.pendding_frames_cost.lock() {
            let _ = hist.record(micros);
        }
    }

    /// Snapshots and resets the counters; histograms report their running mean and are not reset
    /// (mirroring a typical HDR-histogram exporter that reports cumulative distributions).
    pub fn snapshot_and_reset_counters(&self) -> MetricsSnapshot {
        let process_frames_count = self.process_frames_count.swap(0, Ordering::Relaxed);
        let drop_frames_full = self.drop_frames_full.swap(0, Ordering::Relaxed);
        let drop_frames_pass = self.drop_frames_pass.swap(0, Ordering::Relaxed);

        let process_frames_cost_mean = self
            .process_frames_cost
            .lock()
            .ok()
            .filter(|h| h.len() > 0)
            .map(|h| h.mean() / 1_000_000.0);
        let pendding_frames_cost_mean = self
            .pendding_frames_cost
            .lock()
            .ok()
            .filter(|h| h.len() > 0)
            .map(|h| h.mean() / 1_000_000.0);

        MetricsSnapshot {
            process_frames_count,
            drop_frames_full,
            drop_frames_pass,
            process_frames_cost_mean,
            pendding_frames_cost_mean,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
