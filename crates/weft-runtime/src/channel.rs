//! Bounded output channel delivering value cells to the consumer
//!
//! Producers push value cells; the single consumer drains whatever is
//! present in one lock acquisition, so synchronisation cost is amortised
//! over the batch. `push_yield` never blocks: a cell offered to a full
//! buffer is still accepted, and the caller is answered with the
//! do-not-continue signal `PushResult::Overflow`. Worker `Stop` cells
//! are always admitted and do not count against the cap.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use weft_core::{EvalError, SpinLock, WorkerId};

/// A cell produced by a worker and consumed by the puller
#[derive(Debug)]
pub enum ValueCell<T> {
    /// A produced value
    Yield(T),

    /// A worker finished; carries the failure it observed, if any
    Stop {
        worker: WorkerId,
        error: Option<EvalError>,
    },
}

/// Outcome of pushing a yield cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushResult {
    /// Buffer below capacity: keep producing
    Continue,

    /// Cell accepted but the buffer is now at capacity: do not continue
    Overflow,

    /// The consumer is gone; the cell was dropped
    Closed,
}

/// Bounded MPSC buffer of value cells
pub struct OutputChannel<T> {
    cells: SpinLock<Vec<ValueCell<T>>>,

    /// Buffered yield count (`out_count`); Stop cells are not counted
    yields: AtomicUsize,

    /// Resolved capacity; `None` = unbounded
    cap: Option<usize>,

    /// Consumer dropped the stream
    closed: AtomicBool,

    /// Consumer parking. The flag keeps the producer fast path free of
    /// syscalls; the mutex closes the check-then-wait race.
    doorbell: Mutex<()>,
    available: Condvar,
    consumer_parked: AtomicBool,
}

impl<T> OutputChannel<T> {
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            cells: SpinLock::new(Vec::new()),
            yields: AtomicUsize::new(0),
            cap,
            closed: AtomicBool::new(false),
            doorbell: Mutex::new(()),
            available: Condvar::new(),
            consumer_parked: AtomicBool::new(false),
        }
    }

    /// Offer one produced value. Never blocks; see `PushResult`.
    pub fn push_yield(&self, value: T) -> PushResult {
        if self.closed.load(Ordering::Acquire) {
            return PushResult::Closed;
        }

        let full = {
            let mut cells = self.cells.lock();
            cells.push(ValueCell::Yield(value));
            let buffered = self.yields.fetch_add(1, Ordering::AcqRel) + 1;
            self.cap.is_some_and(|cap| buffered >= cap)
        };

        self.ring();
        if full {
            PushResult::Overflow
        } else {
            PushResult::Continue
        }
    }

    /// Announce a worker exit. Always admitted, even past the cap, so the
    /// puller can account for the worker and observe failures.
    pub fn push_stop(&self, worker: WorkerId, error: Option<EvalError>) {
        self.cells.lock().push(ValueCell::Stop { worker, error });
        self.ring();
    }

    /// Drain every buffered cell in one lock acquisition, in insertion
    /// order.
    pub fn try_drain(&self) -> Vec<ValueCell<T>> {
        let batch = std::mem::take(&mut *self.cells.lock());
        let drained = batch
            .iter()
            .filter(|c| matches!(c, ValueCell::Yield(_)))
            .count();
        if drained > 0 {
            self.yields.fetch_sub(drained, Ordering::AcqRel);
        }
        batch
    }

    /// Park the consumer until a producer rings or the timeout elapses
    pub fn park_consumer(&self, timeout: Duration) {
        let guard = self.doorbell.lock().unwrap();
        self.consumer_parked.store(true, Ordering::Release);
        if self.cells.lock().is_empty() {
            let _ = self.available.wait_timeout(guard, timeout);
        }
        self.consumer_parked.store(false, Ordering::Release);
    }

    fn ring(&self) {
        if self.consumer_parked.load(Ordering::Acquire) {
            let _guard = self.doorbell.lock().unwrap();
            self.available.notify_one();
        }
    }

    /// Mark the consumer gone; later yields are dropped at the door.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        // Wake a parked consumer so it observes the stop
        self.ring();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Current `out_count`
    pub fn buffered_yields(&self) -> usize {
        self.yields.load(Ordering::Acquire)
    }
}
