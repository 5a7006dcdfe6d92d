//! SVar: the per-stream scheduling object
//!
//! One SVar coordinates one concurrent evaluation: it ties together the
//! output channel, the style-specific work queue, the ordering heap
//! (Ahead only) and the worker pool, and owns admission control, failure
//! propagation and shutdown. Every SVar is fully local; there is no
//! global scheduler state.
//!
//! Shutdown is decided from a consistent snapshot: the worker count is
//! read first, and a worker's very last store is the release of its pool
//! slot, so once the count reads zero all queue and heap updates made by
//! workers are visible.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};
use weft_core::{
    EvalConfig, EvalError, EvalResult, Stream, Style, WorkerId, DEFAULT_MAX_BUFFER,
    DEFAULT_MAX_WORKERS,
};

use crate::channel::{OutputChannel, PushResult};
use crate::heap::OrderingHeap;
use crate::pacing::{LatencyEstimator, Pacer};
use crate::queue::{Work, WorkQueue};
use crate::worker;

/// Outcome of offering a value to the output side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Emit {
    /// Delivered; keep producing
    Continue,

    /// Delivered, but the buffer is now full: park remaining work and stop
    Backoff,

    /// Not delivered: the SVar is stopping (budget, failure or drop)
    Halt,
}

/// Per-stream scheduling object
pub struct SVar<T> {
    style: Style,
    out: OutputChannel<T>,
    queue: WorkQueue<T>,
    heap: Option<OrderingHeap<T>>,

    /// Live worker count; `|workers| ≤ thread_cap`
    active: AtomicUsize,

    /// Monotonic worker id allocator
    next_worker: AtomicU32,

    /// Lifetime dispatch count, for diagnostics
    dispatched: AtomicUsize,

    /// Resolved worker cap; `None` = unlimited
    thread_cap: Option<usize>,

    /// Remaining yield budget; goes non-positive once spent
    budget: Option<AtomicI64>,
    budget_spent: AtomicBool,

    pacer: Option<Pacer>,
    latency: LatencyEstimator,

    /// Final shutdown: consumer dropped, or the failure was delivered
    stopped: AtomicBool,

    /// First worker failure observed; write-once
    failure: OnceLock<EvalError>,
}

impl<T: Send + 'static> SVar<T> {
    /// Create an SVar for `style`. Rejects an invalid configuration.
    ///
    /// Serial and WSerial degrade to a single worker over a FIFO queue.
    /// Parallel gets an unbounded buffer: strictly parallel producers are
    /// never paused by back-pressure.
    pub fn new(style: Style, config: &EvalConfig) -> EvalResult<Arc<Self>> {
        config.validate()?;

        let thread_cap = match style {
            Style::Serial | Style::WSerial => Some(1),
            _ => config.thread_cap.resolve(DEFAULT_MAX_WORKERS),
        };
        let buffer_cap = match style {
            Style::Parallel => None,
            _ => config.buffer_cap.resolve(DEFAULT_MAX_BUFFER),
        };

        Ok(Arc::new(Self {
            style,
            out: OutputChannel::new(buffer_cap),
            queue: WorkQueue::new(style),
            heap: matches!(style, Style::Ahead).then(OrderingHeap::new),
            active: AtomicUsize::new(0),
            next_worker: AtomicU32::new(0),
            dispatched: AtomicUsize::new(0),
            thread_cap,
            budget: config
                .yield_cap
                .map(|n| AtomicI64::new(n.min(i64::MAX as u64) as i64)),
            budget_spent: AtomicBool::new(false),
            pacer: config.rate_target.map(Pacer::new),
            latency: LatencyEstimator::new(config.latency_hint),
            stopped: AtomicBool::new(false),
            failure: OnceLock::new(),
        }))
    }

    /// Submit a producer continuation
    pub fn push_stream(self: &Arc<Self>, producer: Stream<T>) {
        self.submit(Work::Stream(producer));
    }

    /// Queue a work item. Parallel fires a worker per item immediately;
    /// the other styles wait for `dispatch_initial` or a pull.
    pub fn submit(self: &Arc<Self>, work: Work<T>) {
        self.queue.enqueue(work);
        if self.style == Style::Parallel {
            self.try_dispatch();
        }
    }

    /// Kick off evaluation: one worker, or one per queued item under
    /// Parallel.
    pub fn dispatch_initial(self: &Arc<Self>) {
        match self.style {
            Style::Parallel => {
                while self.active.load(Ordering::Acquire) < self.queue.len() && self.try_dispatch()
                {
                }
            }
            _ => {
                self.try_dispatch();
            }
        }
    }

    /// Post-pull hook: restart evaluation if every worker parked out
    /// while work remains (full buffer, caps, or races on exit).
    pub fn on_pull(self: &Arc<Self>) {
        if self.should_stop() || self.budget_exhausted() {
            return;
        }
        if self.active.load(Ordering::Acquire) == 0 && self.has_pending_work() {
            self.try_dispatch();
        }
    }

    /// Called by a worker that just dequeued: keep the pool sized to the
    /// backlog.
    pub(crate) fn maybe_scale(self: &Arc<Self>) {
        if !self.queue.is_empty() {
            self.try_dispatch();
        }
    }

    /// Admission-checked worker dispatch: pending work, thread cap,
    /// yield budget and rate gate must all agree.
    fn try_dispatch(self: &Arc<Self>) -> bool {
        if self.should_stop() || self.budget_exhausted() || !self.has_pending_work() {
            return false;
        }

        // Reserve a pool slot
        loop {
            let current = self.active.load(Ordering::Acquire);
            if self.thread_cap.is_some_and(|cap| current >= cap) {
                return false;
            }
            if let Some(pacer) = &self.pacer {
                if !pacer.allows_dispatch(current, self.latency.current()) {
                    trace!(workers = current, "dispatch gated by rate target");
                    return false;
                }
            }
            if self
                .active
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                break;
            }
        }

        let id = WorkerId::new(self.next_worker.fetch_add(1, Ordering::AcqRel));
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let svar = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("weft-worker-{}", id.as_u32()))
            .spawn(move || worker::run(svar, id));

        match spawned {
            Ok(_) => {
                trace!(worker = id.as_u32(), style = %self.style, "worker dispatched");
                true
            }
            Err(e) => {
                self.active.fetch_sub(1, Ordering::AcqRel);
                warn!(error = %e, "failed to spawn worker thread");
                false
            }
        }
    }
}

impl<T> SVar<T> {
    pub fn style(&self) -> Style {
        self.style
    }

    pub(crate) fn out(&self) -> &OutputChannel<T> {
        &self.out
    }

    pub(crate) fn queue(&self) -> &WorkQueue<T> {
        &self.queue
    }

    pub(crate) fn heap(&self) -> Option<&OrderingHeap<T>> {
        self.heap.as_ref()
    }

    /// One yield credit from the budget, if any remains
    pub(crate) fn take_yield_credit(&self) -> bool {
        match &self.budget {
            None => true,
            Some(budget) => {
                if budget.fetch_sub(1, Ordering::AcqRel) > 0 {
                    true
                } else {
                    self.budget_spent.store(true, Ordering::Release);
                    false
                }
            }
        }
    }

    pub(crate) fn budget_exhausted(&self) -> bool {
        self.budget_spent.load(Ordering::Acquire)
    }

    /// Offer one produced value to the consumer side
    pub(crate) fn emit(&self, value: T) -> Emit {
        if self.should_stop() {
            return Emit::Halt;
        }
        if !self.take_yield_credit() {
            return Emit::Halt;
        }
        match self.out.push_yield(value) {
            PushResult::Continue => Emit::Continue,
            PushResult::Overflow => Emit::Backoff,
            PushResult::Closed => Emit::Halt,
        }
    }

    /// Sleep as directed by the pacer after a delivered yield
    pub(crate) fn pace(&self) {
        if let Some(pacer) = &self.pacer {
            if let Some(nap) = pacer.throttle() {
                thread::sleep(nap);
            }
        }
    }

    pub(crate) fn record_latency(&self, per_yield: Duration) {
        self.latency.record(per_yield);
    }

    /// Rolling per-yield latency estimate
    pub fn measured_latency(&self) -> Option<Duration> {
        self.latency.current()
    }

    /// Record the first failure; later failures are dropped
    pub(crate) fn record_failure(&self, error: &EvalError) {
        if self.failure.set(error.clone()).is_ok() {
            debug!(error = %error, "producer failure recorded");
        }
    }

    /// First worker failure observed, if any
    pub fn pending_failure(&self) -> Option<EvalError> {
        self.failure.get().cloned()
    }

    /// Workers poll this between steps and exit promptly when it is set
    pub(crate) fn should_stop(&self) -> bool {
        self.stopped.load(Ordering::Acquire) || self.failure.get().is_some()
    }

    /// The consumer dropped the stream or saw the failure through
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.out.close();
    }

    pub(crate) fn has_pending_work(&self) -> bool {
        !self.queue.is_empty() || self.heap.as_ref().is_some_and(|h| !h.is_empty())
    }

    /// Has the SVar quiesced? The worker count is read first: once it is
    /// zero, nothing re-queues work except the consumer itself, so the
    /// queue/heap reads below cannot miss an in-flight sequence.
    pub fn is_done(&self) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return true;
        }
        if self.active.load(Ordering::Acquire) != 0 {
            return false;
        }
        if self.budget_exhausted() {
            return true;
        }
        !self.has_pending_work()
    }

    /// Worker exit: park state is already written back, so release the
    /// pool slot and then announce through the channel.
    pub(crate) fn retire_worker(&self, id: WorkerId, error: Option<EvalError>) {
        if let Some(e) = &error {
            self.record_failure(e);
        }
        self.active.fetch_sub(1, Ordering::AcqRel);
        self.out.push_stop(id, error);
        trace!(worker = id.as_u32(), "worker retired");
    }

    /// Live worker count
    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Workers dispatched over the SVar's lifetime
    pub fn workers_dispatched(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::SvarPuller;
    use weft_core::ConfigError;

    fn collect<T: Send + 'static>(svar: Arc<SVar<T>>) -> EvalResult<Vec<T>> {
        SvarPuller::new(svar).collect()
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        let config = EvalConfig::new().max_rate(0.0);
        let err = SVar::<u32>::new(Style::Async, &config).err();
        assert_eq!(err, Some(EvalError::Config(ConfigError::NonPositiveRate)));
    }

    #[test]
    fn test_serial_degradation_preserves_order() {
        let config = EvalConfig::default();
        let svar = SVar::new(Style::Serial, &config).unwrap();
        svar.push_stream(Stream::from_iter(vec![1, 2]));
        svar.push_stream(Stream::from_iter(vec![3, 4]));
        svar.dispatch_initial();

        assert_eq!(collect(svar).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_wserial_degradation_interleaves() {
        let config = EvalConfig::default();
        let svar = SVar::new(Style::WSerial, &config).unwrap();
        svar.push_stream(Stream::from_iter(vec![1, 2, 3]));
        svar.push_stream(Stream::from_iter(vec![10, 20, 30]));
        svar.dispatch_initial();

        assert_eq!(collect(svar).unwrap(), vec![1, 10, 2, 20, 3, 30]);
    }

    #[test]
    fn test_yield_budget_is_exact() {
        let config = EvalConfig::new().max_yields(Some(5));
        let svar = SVar::new(Style::Ahead, &config).unwrap();
        let mut n = 0u64;
        svar.push_stream(Stream::from_fn(move || {
            n += 1;
            Some(n)
        }));
        svar.dispatch_initial();

        assert_eq!(collect(svar).unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_failure_is_write_once() {
        let config = EvalConfig::default();
        let svar = SVar::<u32>::new(Style::Async, &config).unwrap();
        svar.record_failure(&EvalError::Producer("first".to_string()));
        svar.record_failure(&EvalError::Producer("second".to_string()));
        assert_eq!(
            svar.pending_failure(),
            Some(EvalError::Producer("first".to_string()))
        );
    }

    #[test]
    fn test_done_only_after_quiescence() {
        let config = EvalConfig::default();
        let svar = SVar::<u32>::new(Style::Async, &config).unwrap();
        assert!(svar.is_done());

        svar.push_stream(Stream::from_iter(vec![1]));
        assert!(!svar.is_done());

        svar.dispatch_initial();
        let values = collect(Arc::clone(&svar)).unwrap();
        assert_eq!(values, vec![1]);
        assert!(svar.is_done());
    }

    #[test]
    fn test_stop_quiesces_workers() {
        let config = EvalConfig::default();
        let svar = SVar::new(Style::Async, &config).unwrap();
        let mut n = 0u64;
        svar.push_stream(Stream::from_fn(move || {
            n += 1;
            std::thread::sleep(Duration::from_millis(1));
            Some(n)
        }));
        svar.dispatch_initial();

        // Let the producer get going, then drop the consumer side
        std::thread::sleep(Duration::from_millis(20));
        svar.stop();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while svar.active_workers() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(svar.active_workers(), 0);
    }
}
