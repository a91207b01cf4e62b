//! Dispatch counters and inference latency.
//!
//! [`DispatchStats`] is shared by every call on a classifier. Counters are
//! atomics; latencies live in a mutex-guarded sliding window and percentiles
//! are computed on demand from a sorted snapshot.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Default number of latency samples retained.
pub const DEFAULT_LATENCY_WINDOW: usize = 1000;

/// Latency percentiles over the current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencySummary {
    /// Samples in the window.
    pub count: usize,
    /// Median.
    pub p50: Duration,
    /// 95th percentile.
    pub p95: Duration,
    /// 99th percentile.
    pub p99: Duration,
    /// Fastest call.
    pub min: Duration,
    /// Slowest call.
    pub max: Duration,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSnapshot {
    /// Calls that took the batched path.
    pub batched_calls: u64,
    /// Calls that took the per-candidate path.
    pub fallback_calls: u64,
    /// Inference boundary invocations.
    pub inference_calls: u64,
    /// Candidates scored across all calls.
    pub candidates_scored: u64,
    /// `None` until the first inference call.
    pub latency: Option<LatencySummary>,
}

/// Thread-safe dispatch statistics.
pub struct DispatchStats {
    batched_calls: AtomicU64,
    fallback_calls: AtomicU64,
    inference_calls: AtomicU64,
    candidates_scored: AtomicU64,
    latencies: Mutex<VecDeque<Duration>>,
    window: usize,
}

impl DispatchStats {
    /// Create a tracker keeping the last `window` latency samples.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            batched_calls: AtomicU64::new(0),
            fallback_calls: AtomicU64::new(0),
            inference_calls: AtomicU64::new(0),
            candidates_scored: AtomicU64::new(0),
            latencies: Mutex::new(VecDeque::with_capacity(window)),
            window,
        }
    }

    /// Record a finished batched classification over `candidates` items.
    pub fn record_batched(&self, candidates: usize) {
        self.batched_calls.fetch_add(1, Ordering::Relaxed);
        self.candidates_scored
            .fetch_add(candidates as u64, Ordering::Relaxed);
    }

    /// Record a finished fallback classification over `candidates` items.
    pub fn record_fallback(&self, candidates: usize) {
        self.fallback_calls.fetch_add(1, Ordering::Relaxed);
        self.candidates_scored
            .fetch_add(candidates as u64, Ordering::Relaxed);
    }

    /// Record one inference boundary call and its duration.
    pub fn record_inference(&self, elapsed: Duration) {
        self.inference_calls.fetch_add(1, Ordering::Relaxed);
        if self.window == 0 {
            return;
        }
        let mut latencies = self.latencies.lock().unwrap_or_else(|e| e.into_inner());
        if latencies.len() >= self.window {
            latencies.pop_front();
        }
        latencies.push_back(elapsed);
    }

    /// Copy the current counters and latency percentiles.
    #[must_use]
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            batched_calls: self.batched_calls.load(Ordering::Relaxed),
            fallback_calls: self.fallback_calls.load(Ordering::Relaxed),
            inference_calls: self.inference_calls.load(Ordering::Relaxed),
            candidates_scored: self.candidates_scored.load(Ordering::Relaxed),
            latency: self.latency_summary(),
        }
    }

    /// Zero every counter and drop all latency samples.
    pub fn reset(&self) {
        self.batched_calls.store(0, Ordering::Relaxed);
        self.fallback_calls.store(0, Ordering::Relaxed);
        self.inference_calls.store(0, Ordering::Relaxed);
        self.candidates_scored.store(0, Ordering::Relaxed);
        self.latencies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn latency_summary(&self) -> Option<LatencySummary> {
        let mut sorted: Vec<Duration> = {
            let latencies = self.latencies.lock().unwrap_or_else(|e| e.into_inner());
            latencies.iter().copied().collect()
        };
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_unstable();

        Some(LatencySummary {
            count: sorted.len(),
            p50: nearest_rank(&sorted, 0.50),
            p95: nearest_rank(&sorted, 0.95),
            p99: nearest_rank(&sorted, 0.99),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

impl Default for DispatchStats {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY_WINDOW)
    }
}

/// Value at `quantile` (0.0–1.0) of a sorted, non-empty slice.
fn nearest_rank(sorted: &[Duration], quantile: f64) -> Duration {
    let last = sorted.len() - 1;
    let idx = (quantile * last as f64).round() as usize;
    sorted[idx.min(last)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_snapshot_is_zero() {
        let stats = DispatchStats::default();
        let snap = stats.snapshot();
        assert_eq!(snap.batched_calls, 0);
        assert_eq!(snap.fallback_calls, 0);
        assert_eq!(snap.inference_calls, 0);
        assert_eq!(snap.candidates_scored, 0);
        assert!(snap.latency.is_none());
    }

    #[test]
    fn test_counters_accumulate() {
        let stats = DispatchStats::default();
        stats.record_batched(4);
        stats.record_fallback(3);
        stats.record_fallback(5);
        let snap = stats.snapshot();
        assert_eq!(snap.batched_calls, 1);
        assert_eq!(snap.fallback_calls, 2);
        assert_eq!(snap.candidates_scored, 12);
    }

    #[test]
    fn test_latency_percentiles() {
        let stats = DispatchStats::new(100);
        for ms in 1..=10 {
            stats.record_inference(Duration::from_millis(ms));
        }
        let latency = stats.snapshot().latency.unwrap();
        assert_eq!(latency.count, 10);
        assert_eq!(latency.min, Duration::from_millis(1));
        assert_eq!(latency.max, Duration::from_millis(10));
        // round(0.5 * 9) = 5 -> sixth sample
        assert_eq!(latency.p50, Duration::from_millis(6));
        assert_eq!(latency.p99, Duration::from_millis(10));
    }

    #[test]
    fn test_window_evicts_oldest() {
        let stats = DispatchStats::new(2);
        stats.record_inference(Duration::from_millis(100));
        stats.record_inference(Duration::from_millis(200));
        stats.record_inference(Duration::from_millis(300));
        let snap = stats.snapshot();
        assert_eq!(snap.inference_calls, 3);
        let latency = snap.latency.unwrap();
        assert_eq!(latency.count, 2);
        assert_eq!(latency.min, Duration::from_millis(200));
    }

    #[test]
    fn test_zero_window_counts_without_samples() {
        let stats = DispatchStats::new(0);
        stats.record_inference(Duration::from_millis(5));
        let snap = stats.snapshot();
        assert_eq!(snap.inference_calls, 1);
        assert!(snap.latency.is_none());
    }

    #[test]
    fn test_reset() {
        let stats = DispatchStats::default();
        stats.record_batched(2);
        stats.record_inference(Duration::from_millis(1));
        stats.reset();
        assert_eq!(stats.snapshot(), DispatchStats::default().snapshot());
    }

    #[test]
    fn test_concurrent_recording() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(DispatchStats::new(10_000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_inference(Duration::from_micros(50));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let snap = stats.snapshot();
        assert_eq!(snap.inference_calls, 800);
        assert_eq!(snap.latency.unwrap().count, 800);
    }
}
