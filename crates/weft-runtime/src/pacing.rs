//! Latency measurement and yield-rate pacing
//!
//! `LatencyEstimator` keeps a rolling per-yield latency, seeded from the
//! configured hint and folded over an observation from every finished
//! work item. `Pacer` tracks the observed yield rate against the target:
//! workers ask it how long to sleep after a delivered yield, and the
//! dispatcher asks it whether adding a worker would overshoot the target
//! (`workers × (1 / latency) ≤ rate`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Rolling estimate of per-yield worker latency
pub struct LatencyEstimator {
    /// Nanoseconds per yield; 0 means no sample yet
    measured_ns: AtomicU64,
}

impl LatencyEstimator {
    pub fn new(hint: Option<Duration>) -> Self {
        let seed = hint.map_or(0, |d| duration_to_ns(d));
        Self {
            measured_ns: AtomicU64::new(seed),
        }
    }

    /// Fold one observation into the rolling estimate (7/8 old, 1/8 new)
    pub fn record(&self, per_yield: Duration) {
        let sample = duration_to_ns(per_yield).max(1);
        let old = self.measured_ns.load(Ordering::Acquire);
        let updated = if old == 0 {
            sample
        } else {
            old / 8 * 7 + sample / 8
        };
        self.measured_ns.store(updated.max(1), Ordering::Release);
    }

    pub fn current(&self) -> Option<Duration> {
        match self.measured_ns.load(Ordering::Acquire) {
            0 => None,
            ns => Some(Duration::from_nanos(ns)),
        }
    }
}

fn duration_to_ns(d: Duration) -> u64 {
    d.as_nanos().min(u64::MAX as u128) as u64
}

/// Yield-rate pacer for one SVar
pub struct Pacer {
    target_per_sec: f64,

    /// Set at the first yield so idle setup time is not counted
    started: OnceLock<Instant>,

    yields: AtomicU64,
}

impl Pacer {
    pub fn new(target_per_sec: f64) -> Self {
        Self {
            target_per_sec,
            started: OnceLock::new(),
            yields: AtomicU64::new(0),
        }
    }

    /// Record one delivered yield; returns how long the worker should
    /// sleep to hold the observed rate at or below the target. The nth
    /// yield is due at `(n - 1) / rate`, so the first is never delayed.
    pub fn throttle(&self) -> Option<Duration> {
        let start = *self.started.get_or_init(Instant::now);
        let n = self.yields.fetch_add(1, Ordering::AcqRel) + 1;
        let due = (n - 1) as f64 / self.target_per_sec;
        let elapsed = start.elapsed().as_secs_f64();
        if due > elapsed {
            Some(Duration::from_secs_f64(due - elapsed))
        } else {
            None
        }
    }

    /// Would one more worker keep the expected yield rate within target?
    /// The first worker is always admitted so the stream makes progress.
    pub fn allows_dispatch(&self, workers: usize, latency: Option<Duration>) -> bool {
        if workers == 0 {
            return true;
        }
        let Some(latency) = latency else {
            return true;
        };
        let secs = latency.as_secs_f64();
        if secs <= 0.0 {
            return true;
        }
        (workers + 1) as f64 / secs <= self.target_per_sec
    }

    /// Delivered yields per second since the first yield
    pub fn observed_rate(&self) -> Option<f64> {
        let start = self.started.get()?;
        let elapsed = start.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return None;
        }
        Some(self.yields.load(Ordering::Acquire) as f64 / elapsed)
    }
}
