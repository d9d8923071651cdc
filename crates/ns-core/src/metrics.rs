//! Engine performance counters
//!
//! Lock-free counters for classification latency and rejected filter lines.
//! They sit beside the [`StatisticsAggregator`](crate::stats::StatisticsAggregator)
//! rather than inside it so the hot path never waits on the statistics lock
//! for timing data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Elapsed-time helper that also builds for `wasm32-unknown-unknown`,
/// where `std::time::Instant` is unavailable and every reading is zero.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    started: std::time::Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            started: std::time::Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.started.elapsed()
        }
        #[cfg(target_arch = "wasm32")]
        {
            Duration::ZERO
        }
    }
}

/// Milliseconds since the Unix epoch, 0 where no wall clock is available.
pub fn unix_time_ms() -> u64 {
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
    #[cfg(target_arch = "wasm32")]
    {
        0
    }
}

/// Point-in-time copy of [`EngineMetrics`]. Times are in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub total_classify_ns: u64,
    pub avg_classify_ns: u64,
    /// 0 until the first request
    pub min_classify_ns: u64,
    pub max_classify_ns: u64,
    /// Unsupported or malformed lines seen by `add_list`
    pub parse_errors: u64,
}

#[derive(Debug)]
pub struct EngineMetrics {
    requests: AtomicU64,
    total_ns: AtomicU64,
    min_ns: AtomicU64,
    max_ns: AtomicU64,
    parse_errors: AtomicU64,
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self {
            requests: AtomicU64::new(0),
            total_ns: AtomicU64::new(0),
            min_ns: AtomicU64::new(u64::MAX),
            max_ns: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
        }
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the time one classification took.
    pub fn record_classify(&self, elapsed: Duration) {
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_ns.fetch_add(ns, Ordering::Relaxed);
        self.min_ns.fetch_min(ns, Ordering::Relaxed);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
    }

    pub fn record_parse_errors(&self, count: u64) {
        self.parse_errors.fetch_add(count, Ordering::Relaxed);
    }

    /// Counters are read one by one, so a snapshot taken during
    /// `record_classify` may be off by the request in flight.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let total = self.total_ns.load(Ordering::Relaxed);
        let min = self.min_ns.load(Ordering::Relaxed);
        MetricsSnapshot {
            requests,
            total_classify_ns: total,
            avg_classify_ns: if requests == 0 { 0 } else { total / requests },
            min_classify_ns: if min == u64::MAX { 0 } else { min },
            max_classify_ns: self.max_ns.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.total_ns.store(0, Ordering::Relaxed);
        self.min_ns.store(u64::MAX, Ordering::Relaxed);
        self.max_ns.store(0, Ordering::Relaxed);
        self.parse_errors.store(0, Ordering::Relaxed);
    }
}
