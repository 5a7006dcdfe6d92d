//! Style-specific work queues
//!
//! Each evaluation style maps to a queue discipline. Async pops the most
//! recently queued continuation (LIFO), so a producer paused by
//! back-pressure resumes ahead of anything newer. WAsync and Parallel
//! drain round robin (FIFO). Ahead couples FIFO order with a sequence
//! number handed out atomically at enqueue; the ordering heap uses it to
//! restore source order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_queue::SegQueue;
use weft_core::{SpinLock, Stream, Style};

/// A queued unit of producer work
pub enum Work<T> {
    /// A producer continuation
    Stream(Stream<T>),

    /// Monadic-bind driver: a stream of inner streams. Stepping it queues
    /// the next inner stream and re-queues the remainder, so at most one
    /// driver item per bind chain is ever pending.
    Expand(Stream<Stream<T>>),
}

/// The pending-work side of an SVar
pub struct WorkQueue<T> {
    kind: QueueKind<T>,

    /// `next_seq_alloc`: sequence numbers handed out at enqueue (Ahead)
    seq_alloc: AtomicU64,
}

enum QueueKind<T> {
    /// Async: newest first
    Lifo(SpinLock<Vec<Work<T>>>),

    /// WAsync and Parallel; also the single-worker degradation of
    /// Serial/WSerial
    Fifo(SegQueue<Work<T>>),

    /// Ahead: FIFO of (work, seq)
    Ordered(SpinLock<VecDeque<(Work<T>, u64)>>),
}

impl<T> WorkQueue<T> {
    pub fn new(style: Style) -> Self {
        let kind = match style {
            Style::Async => QueueKind::Lifo(SpinLock::new(Vec::new())),
            Style::Ahead => QueueKind::Ordered(SpinLock::new(VecDeque::new())),
            _ => QueueKind::Fifo(SegQueue::new()),
        };
        Self {
            kind,
            seq_alloc: AtomicU64::new(0),
        }
    }

    /// Queue a work item; Ahead items receive the next sequence number
    pub fn enqueue(&self, work: Work<T>) {
        match &self.kind {
            QueueKind::Lifo(stack) => stack.lock().push(work),
            QueueKind::Fifo(queue) => queue.push(work),
            QueueKind::Ordered(queue) => {
                let seq = self.seq_alloc.fetch_add(1, Ordering::AcqRel);
                queue.lock().push_back((work, seq));
            }
        }
    }

    /// Take one work item; Ahead items come back with their sequence
    pub fn dequeue(&self) -> Option<(Work<T>, Option<u64>)> {
        match &self.kind {
            QueueKind::Lifo(stack) => stack.lock().pop().map(|w| (w, None)),
            QueueKind::Fifo(queue) => queue.pop().map(|w| (w, None)),
            QueueKind::Ordered(queue) => {
                queue.lock().pop_front().map(|(w, seq)| (w, Some(seq)))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.kind {
            QueueKind::Lifo(stack) => stack.lock().is_empty(),
            QueueKind::Fifo(queue) => queue.is_empty(),
            QueueKind::Ordered(queue) => queue.lock().is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match &self.kind {
            QueueKind::Lifo(stack) => stack.lock().len(),
            QueueKind::Fifo(queue) => queue.len(),
            QueueKind::Ordered(queue) => queue.lock().len(),
        }
    }

    /// Sequence number the next enqueue would receive
    pub fn next_alloc(&self) -> u64 {
        self.seq_alloc.load(Ordering::Acquire)
    }
}
