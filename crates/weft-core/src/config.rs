//! Evaluator configuration
//!
//! Knob convention for the caps: `0` resets to the built-in default, a
//! negative value removes the limit entirely, anything else is the cap.
//! The rate target has no "default" sentinel; it is simply unset until
//! `max_rate` is called, and a non-positive target is rejected when the
//! SVar is created.

use std::time::Duration;

use crate::error::ConfigError;

/// Default cap on concurrent workers per SVar
pub const DEFAULT_MAX_WORKERS: usize = 1500;

/// Default cap on buffered yields per SVar
pub const DEFAULT_MAX_BUFFER: usize = 1500;

/// A resource cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Use the built-in default
    Default,

    /// No limit
    Unbounded,

    /// Cap at exactly `n`
    At(usize),
}

impl Limit {
    /// Map the signed knob convention: `0` means default, negative means
    /// unlimited.
    pub fn from_signed(n: isize) -> Self {
        match n {
            0 => Limit::Default,
            n if n < 0 => Limit::Unbounded,
            n => Limit::At(n as usize),
        }
    }

    /// Resolve against a default; `None` means unbounded
    pub fn resolve(self, default: usize) -> Option<usize> {
        match self {
            Limit::Default => Some(default),
            Limit::Unbounded => None,
            Limit::At(n) => Some(n),
        }
    }
}

impl Default for Limit {
    fn default() -> Self {
        Limit::Default
    }
}

/// Configuration applied to one SVar
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Maximum concurrent workers
    pub thread_cap: Limit,

    /// Maximum buffered yields
    pub buffer_cap: Limit,

    /// Remaining-yield budget (`None` = unlimited)
    pub yield_cap: Option<u64>,

    /// Target yields per second (`None` = unlimited)
    pub rate_target: Option<f64>,

    /// Seed estimate of per-yield worker latency
    pub latency_hint: Option<Duration>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            thread_cap: Limit::Default,
            buffer_cap: Limit::Default,
            yield_cap: None,
            rate_target: None,
            latency_hint: None,
        }
    }
}

impl EvalConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of concurrent workers
    pub fn max_threads(mut self, n: isize) -> Self {
        self.thread_cap = Limit::from_signed(n);
        self
    }

    /// Cap the number of buffered yields
    pub fn max_buffer(mut self, n: isize) -> Self {
        self.buffer_cap = Limit::from_signed(n);
        self
    }

    /// Limit the total number of yields produced
    pub fn max_yields(mut self, n: Option<u64>) -> Self {
        self.yield_cap = n;
        self
    }

    /// Target output rate in yields per second
    pub fn max_rate(mut self, per_sec: f64) -> Self {
        self.rate_target = Some(per_sec);
        self
    }

    /// Seed the worker-latency estimate used for the first dispatches
    pub fn serial_latency(mut self, hint: Duration) -> Self {
        self.latency_hint = Some(hint);
        self
    }

    /// Validate configuration; called at SVar creation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(rate) = self.rate_target {
            if !(rate > 0.0) {
                return Err(ConfigError::NonPositiveRate);
            }
        }
        Ok(())
    }
}
