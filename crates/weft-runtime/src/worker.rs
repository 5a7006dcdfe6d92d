//! Worker loops, one family per evaluation style
//!
//! Workers drain the SVar's queue. Async and Parallel run each
//! continuation depth-first; WAsync re-queues the remainder after every
//! yield for round-robin fairness across branches; Ahead follows the
//! token protocol, publishing directly while it holds the token and
//! parking single-step speculative results on the ordering heap
//! otherwise.
//!
//! A worker that sees the do-not-continue signal parks its remaining
//! work (back on the queue, or on the heap under the current sequence)
//! and exits; the consumer re-dispatches after draining the buffer.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use weft_core::{EvalError, EvalResult, Step, Stream, Style, WorkerId};

use crate::heap::{HeapEntry, OrderingHeap};
use crate::queue::Work;
use crate::svar::{Emit, SVar};

/// Entry point for one worker thread
pub(crate) fn run<T: Send + 'static>(svar: Arc<SVar<T>>, id: WorkerId) {
    let error = match svar.style() {
        Style::Ahead => ahead_loop(&svar),
        _ => drain_loop(&svar),
    };
    svar.retire_worker(id, error);
}

/// Evaluate one step, converting worker-side panics into evaluator errors
fn step_checked<T: Send + 'static>(stream: Stream<T>) -> EvalResult<Step<T>> {
    match panic::catch_unwind(AssertUnwindSafe(move || stream.step())) {
        Ok(result) => result,
        Err(payload) => Err(EvalError::ProducerPanic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "producer panicked".to_string()
    }
}

enum RunOutcome {
    /// Continuation ran to Stop
    Finished,

    /// Finished, but the buffer filled on the last value: exit
    FinishedFull,

    /// Remaining work was parked because of back-pressure: exit
    Parked,

    /// The SVar is stopping (budget, failure or consumer drop): exit
    Halted,

    /// The continuation failed
    Failed(EvalError),
}

/// Async / WAsync / Parallel worker, and the single-worker degradation
/// of Serial / WSerial.
fn drain_loop<T: Send + 'static>(svar: &Arc<SVar<T>>) -> Option<EvalError> {
    let breadth_first = matches!(svar.style(), Style::WAsync | Style::WSerial);
    loop {
        if svar.should_stop() {
            return None;
        }
        let Some((work, _seq)) = svar.queue().dequeue() else {
            return None;
        };
        svar.maybe_scale();

        match work {
            Work::Expand(outer) => {
                if let Err(e) = expand(svar, outer) {
                    return Some(e);
                }
            }
            Work::Stream(stream) => match run_stream(svar, stream, breadth_first) {
                RunOutcome::Finished => {}
                RunOutcome::FinishedFull => return None,
                RunOutcome::Parked => return None,
                RunOutcome::Halted => return None,
                RunOutcome::Failed(e) => return Some(e),
            },
        }
    }
}

/// Drive one continuation, pushing yields into the output channel
fn run_stream<T: Send + 'static>(
    svar: &Arc<SVar<T>>,
    mut stream: Stream<T>,
    breadth_first: bool,
) -> RunOutcome {
    let started = Instant::now();
    let mut yielded = 0u32;

    let outcome = loop {
        if svar.should_stop() {
            break RunOutcome::Halted;
        }
        match step_checked(stream) {
            Err(e) => break RunOutcome::Failed(e),
            Ok(Step::Stop) => break RunOutcome::Finished,
            Ok(Step::Single(v)) => match svar.emit(v) {
                Emit::Halt => break RunOutcome::Halted,
                Emit::Continue => {
                    yielded += 1;
                    svar.pace();
                    break RunOutcome::Finished;
                }
                Emit::Backoff => {
                    yielded += 1;
                    break RunOutcome::FinishedFull;
                }
            },
            Ok(Step::Yield(v, rest)) => match svar.emit(v) {
                Emit::Halt => break RunOutcome::Halted,
                Emit::Continue => {
                    yielded += 1;
                    svar.pace();
                    if breadth_first {
                        // One element per visit; the branch goes to the
                        // back of the queue
                        svar.queue().enqueue(Work::Stream(rest));
                        break RunOutcome::Finished;
                    }
                    stream = rest;
                }
                Emit::Backoff => {
                    yielded += 1;
                    if svar.style() == Style::Parallel {
                        // Strictly parallel producers are never paused;
                        // the buffer is unbounded so this is a formality
                        stream = rest;
                        continue;
                    }
                    svar.queue().enqueue(Work::Stream(rest));
                    break RunOutcome::Parked;
                }
            },
        }
    };

    if yielded > 0 {
        svar.record_latency(started.elapsed() / yielded);
    }
    outcome
}

/// Step the bind driver once: queue the next inner stream and re-queue
/// the remainder. Under the LIFO discipline the driver goes in first so
/// the inner stream is popped next; everywhere else the inner stream
/// goes in first, so it takes the earlier sequence number and later
/// iterations stay behind it.
fn expand<T: Send + 'static>(svar: &Arc<SVar<T>>, outer: Stream<Stream<T>>) -> EvalResult<()> {
    match step_checked(outer)? {
        Step::Yield(inner, rest) => {
            if svar.style() == Style::Async {
                svar.submit(Work::Expand(rest));
                svar.submit(Work::Stream(inner));
            } else {
                svar.submit(Work::Stream(inner));
                svar.submit(Work::Expand(rest));
            }
            svar.maybe_scale();
        }
        Step::Single(inner) => svar.submit(Work::Stream(inner)),
        Step::Stop => {}
    }
    Ok(())
}

/// Ahead worker: the token protocol over the ordering heap.
///
/// Heap first (the token may have been parked there by an earlier
/// worker), then the queue. A dequeued sequence matching the token is
/// streamed straight to the output buffer; anything later gets exactly
/// one head evaluation before being parked, so speculation can never
/// starve the token holder.
fn ahead_loop<T: Send + 'static>(svar: &Arc<SVar<T>>) -> Option<EvalError> {
    let heap = svar.heap().expect("ahead svar carries an ordering heap");
    loop {
        if svar.should_stop() {
            return None;
        }

        if let Some((seq, entry)) = heap.pop_token() {
            match entry {
                HeapEntry::Empty => {
                    heap.advance_token();
                    continue;
                }
                HeapEntry::Value(v) => match svar.emit(v) {
                    Emit::Halt => return None,
                    Emit::Continue => {
                        svar.pace();
                        heap.advance_token();
                        continue;
                    }
                    Emit::Backoff => {
                        heap.advance_token();
                        return None;
                    }
                },
                HeapEntry::Suspended(stream) => {
                    match run_ordered(svar, heap, stream, seq) {
                        OrderedOutcome::Finished => {
                            heap.advance_token();
                            continue;
                        }
                        OrderedOutcome::FinishedFull => {
                            heap.advance_token();
                            return None;
                        }
                        OrderedOutcome::Parked => return None,
                        OrderedOutcome::Halted => return None,
                        OrderedOutcome::Failed(e) => return Some(e),
                    }
                }
            }
        }

        let Some((work, seq)) = svar.queue().dequeue() else {
            return None;
        };
        let seq = seq.expect("ahead queue items carry sequence numbers");
        svar.maybe_scale();
        let holds_token = seq == heap.token();

        match work {
            Work::Expand(outer) => {
                if let Err(e) = expand(svar, outer) {
                    return Some(e);
                }
                // The driver yields nothing itself; retire its sequence
                if holds_token {
                    heap.advance_token();
                } else {
                    heap.insert(seq, HeapEntry::Empty);
                }
            }
            Work::Stream(stream) if holds_token => {
                match run_ordered(svar, heap, stream, seq) {
                    OrderedOutcome::Finished => {
                        heap.advance_token();
                    }
                    OrderedOutcome::FinishedFull => {
                        heap.advance_token();
                        return None;
                    }
                    OrderedOutcome::Parked => return None,
                    OrderedOutcome::Halted => return None,
                    OrderedOutcome::Failed(e) => return Some(e),
                }
            }
            Work::Stream(stream) => {
                // Speculative: at most one head evaluation per visit
                match step_checked(stream) {
                    Err(e) => return Some(e),
                    Ok(Step::Stop) => heap.insert(seq, HeapEntry::Empty),
                    Ok(Step::Single(v)) => heap.insert(seq, HeapEntry::Value(v)),
                    Ok(Step::Yield(v, rest)) => {
                        heap.insert(seq, HeapEntry::Suspended(Stream::cons(v, rest)));
                    }
                }
            }
        }
    }
}

enum OrderedOutcome {
    Finished,
    FinishedFull,
    Parked,
    Halted,
    Failed(EvalError),
}

/// Token holder: stream a continuation straight into the output buffer.
/// On back-pressure the remainder is parked on the heap under `seq`, the
/// token is left in place, and the worker exits.
fn run_ordered<T: Send + 'static>(
    svar: &Arc<SVar<T>>,
    heap: &OrderingHeap<T>,
    mut stream: Stream<T>,
    seq: u64,
) -> OrderedOutcome {
    let started = Instant::now();
    let mut yielded = 0u32;

    let outcome = loop {
        if svar.should_stop() {
            break OrderedOutcome::Halted;
        }
        match step_checked(stream) {
            Err(e) => break OrderedOutcome::Failed(e),
            Ok(Step::Stop) => break OrderedOutcome::Finished,
            Ok(Step::Single(v)) => match svar.emit(v) {
                Emit::Halt => break OrderedOutcome::Halted,
                Emit::Continue => {
                    yielded += 1;
                    svar.pace();
                    break OrderedOutcome::Finished;
                }
                Emit::Backoff => {
                    yielded += 1;
                    break OrderedOutcome::FinishedFull;
                }
            },
            Ok(Step::Yield(v, rest)) => match svar.emit(v) {
                Emit::Halt => break OrderedOutcome::Halted,
                Emit::Continue => {
                    yielded += 1;
                    svar.pace();
                    stream = rest;
                }
                Emit::Backoff => {
                    yielded += 1;
                    heap.insert(seq, HeapEntry::Suspended(rest));
                    break OrderedOutcome::Parked;
                }
            },
        }
    };

    if yielded > 0 {
        svar.record_latency(started.elapsed() / yielded);
    }
    outcome
}
