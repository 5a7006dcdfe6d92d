//! # weft-runtime
//!
//! The concurrent scheduling substrate shared by every non-trivial
//! evaluation style.
//!
//! This crate provides:
//! - The SVar controller tying buffer, queue, heap and workers together
//! - The bounded output channel delivering value cells to the consumer
//! - Style-specific work queues (LIFO, FIFO, sequence-numbered FIFO)
//! - The ordering heap restoring source order under the Ahead style
//! - Worker loops with admission control and latency-driven pacing
//! - The bridge pulling an SVar as a plain sequential stream

pub mod bridge;
pub mod channel;
pub mod heap;
pub mod pacing;
pub mod queue;
pub mod svar;

mod worker;

pub use bridge::SvarPuller;
pub use channel::{OutputChannel, PushResult, ValueCell};
pub use heap::{HeapEntry, OrderingHeap};
pub use pacing::{LatencyEstimator, Pacer};
pub use queue::{Work, WorkQueue};
pub use svar::SVar;
