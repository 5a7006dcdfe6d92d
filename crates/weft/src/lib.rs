//! # weft: concurrent stream evaluation
//!
//! A lazy, composable stream of values and a family of evaluation styles
//! controlling how its producers are scheduled: fully sequential
//! (`Serial`), interleaved sequential (`WSerial`), speculatively ahead
//! with source-order results (`Ahead`), unordered asynchronous (`Async`),
//! interleaved asynchronous (`WAsync`), and strictly parallel
//! (`Parallel`).
//!
//! ## Quick start
//!
//! ```ignore
//! use weft::{combine, Flow, Style};
//!
//! // Source order, evaluated speculatively on worker threads
//! let left = Flow::from_iter(1..=3);
//! let right = Flow::from_iter(4..=6);
//! let values = combine(Style::Ahead, left, right)
//!     .max_threads(8)
//!     .to_vec()?;
//! assert_eq!(values, vec![1, 2, 3, 4, 5, 6]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        User code                            │
//! │        Flow, combine(), concat_map_with(), knobs            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          SVar                               │
//! │     admission, pacing, failure propagation, shutdown        │
//! └─────────────────────────────────────────────────────────────┘
//!          │                   │                   │
//!          ▼                   ▼                   ▼
//!    ┌───────────┐      ┌───────────┐      ┌───────────┐
//!    │   Work    │      │  Ordering │      │  Output   │
//!    │   queue   │      │   heap    │      │  channel  │
//!    └───────────┘      └───────────┘      └───────────┘
//!          │                   │                   ▲
//!          └───────► worker threads ───────────────┘
//! ```
//!
//! Serial and WSerial never touch an SVar; they compose on the pure
//! stream representation. The concurrent styles queue their producers on
//! an SVar created when the flow is first forced, and the consumer pulls
//! an ordinary sequential stream out of it.

pub mod combine;
pub mod flow;

pub use combine::{combine, concat_map_with};
pub use flow::{Flow, FlowIter};

// Re-export core types
pub use weft_core::{
    ConfigError, EvalConfig, EvalError, EvalResult, Limit, Step, Stream, Style, WorkerId,
    DEFAULT_MAX_BUFFER, DEFAULT_MAX_WORKERS,
};

// Re-export the scheduling substrate for direct SVar access
pub use weft_runtime::{SVar, SvarPuller, ValueCell, Work};

use std::sync::Arc;

/// Create an SVar for `style`; rejects an invalid configuration
pub fn create_svar<T: Send + 'static>(
    style: Style,
    config: &EvalConfig,
) -> EvalResult<Arc<SVar<T>>> {
    SVar::new(style, config)
}

/// Submit a producer continuation to an SVar
pub fn push_stream<T: Send + 'static>(svar: &Arc<SVar<T>>, producer: Stream<T>) {
    svar.push_stream(producer);
}

/// Pull the values of an SVar as a sequential flow
pub fn pull_stream<T: Send + 'static>(svar: Arc<SVar<T>>) -> Flow<T> {
    svar.dispatch_initial();
    Flow::from_svar(svar)
}
