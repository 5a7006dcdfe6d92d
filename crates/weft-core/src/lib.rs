//! # weft-core
//!
//! Platform-agnostic building blocks for the weft stream evaluator.
//!
//! This crate provides:
//! - The lazy stream representation (`Stream`, `Step`)
//! - Evaluation styles (`Style`)
//! - Evaluator configuration (`EvalConfig`, `Limit`)
//! - Error types (`EvalError`, `EvalResult`)
//! - Worker identifiers and the internal spinlock

pub mod config;
pub mod error;
pub mod id;
pub mod spinlock;
pub mod stream;
pub mod style;

pub use config::{EvalConfig, Limit, DEFAULT_MAX_BUFFER, DEFAULT_MAX_WORKERS};
pub use error::{ConfigError, EvalError, EvalResult};
pub use id::WorkerId;
pub use spinlock::SpinLock;
pub use stream::{Step, Stream};
pub use style::Style;
