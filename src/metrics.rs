//! Metrics for ringflight runs.
//!
//! Lightweight counters plus an HDR latency histogram. One instance is
//! shared by every slot of a ring.

use std::sync::atomic::{ AtomicU64, Ordering };
use std::time::Duration;

use hdrhistogram::Histogram;
use parking_lot::Mutex;

use crate::constants::{ LATENCY_MAX_US, LATENCY_SIGFIGS };
use crate::error::{ Result, RingflightError };

/// Request counters and submit-to-completion latency
pub struct Metrics {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    latency_us: Mutex<Histogram<u64>>,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let histogram = Histogram::new_with_bounds(1, LATENCY_MAX_US, LATENCY_SIGFIGS).map_err(|e|
            RingflightError::config(format!("latency histogram: {e:?}"))
        )?;
        Ok(Self {
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            latency_us: Mutex::new(histogram),
        })
    }

    #[inline]
    pub fn record_submit(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_completion(&self, latency: Duration) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latency_us.lock().saturating_record(micros.max(1));
    }

    #[inline]
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    pub fn latency(&self) -> LatencySummary {
        let hist = self.latency_us.lock();
        if hist.is_empty() {
            return LatencySummary::default();
        }
        LatencySummary {
            samples: hist.len(),
            mean_us: hist.mean(),
            p50_us: hist.value_at_quantile(0.5),
            p90_us: hist.value_at_quantile(0.9),
            p99_us: hist.value_at_quantile(0.99),
            max_us: hist.max(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
}

impl MetricsSnapshot {
    /// Submissions not yet joined by a successful or failed wait
    pub fn outstanding(&self) -> u64 {
        self.submitted.saturating_sub(self.completed + self.failed)
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "submitted={} completed={} failed={}", self.submitted, self.completed, self.failed)
    }
}

/// Latency percentiles in microseconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencySummary {
    pub samples: u64,
    pub mean_us: f64,
    pub p50_us: u64,
    pub p90_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl std::fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "n={} mean={:.1}us p50={}us p90={}us p99={}us max={}us",
            self.samples,
            self.mean_us,
            self.p50_us,
            self.p90_us,
            self.p99_us,
            self.max_us
        )
    }
}
