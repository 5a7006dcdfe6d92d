//! The public stream handle
//!
//! A `Flow` is either a pure serial stream or a deferred concurrent
//! evaluation: a style plus the producers queued for its SVar. The SVar
//! itself is materialised the first time the flow is forced, so building
//! a pipeline allocates no threads and no buffers.

use std::sync::Arc;
use std::time::Duration;

use weft_core::{EvalConfig, EvalResult, Step, Stream, Style};
use weft_runtime::{SVar, SvarPuller, Work};

/// A composable stream of values under a chosen evaluation style
pub struct Flow<T> {
    inner: FlowInner<T>,
    config: EvalConfig,
}

enum FlowInner<T> {
    /// Pure serial representation
    Serial(Stream<T>),

    /// Deferred concurrent evaluation; forced on first pull
    Queued { style: Style, jobs: Vec<Work<T>> },
}

impl<T: Send + 'static> Flow<T> {
    /// The empty flow
    pub fn empty() -> Self {
        Self::from_stream(Stream::nil())
    }

    /// A one-element flow
    pub fn once(value: T) -> Self {
        Self::from_stream(Stream::once(value))
    }

    /// Lift an iterator
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::from_stream(Stream::from_iter(iter))
    }

    /// Generate elements until the closure returns `None`
    pub fn from_fn(f: impl FnMut() -> Option<T> + Send + 'static) -> Self {
        Self::from_stream(Stream::from_fn(f))
    }

    /// Wrap a serial stream
    pub fn from_stream(stream: Stream<T>) -> Self {
        Self {
            inner: FlowInner::Serial(stream),
            config: EvalConfig::default(),
        }
    }

    /// Pull an existing SVar as a flow
    pub fn from_svar(svar: Arc<SVar<T>>) -> Self {
        Self::from_stream(stream_from_puller(SvarPuller::new(svar)))
    }

    pub(crate) fn queued(style: Style, jobs: Vec<Work<T>>, config: EvalConfig) -> Self {
        Self {
            inner: FlowInner::Queued { style, jobs },
            config,
        }
    }

    /// Style of the deferred evaluation, if this flow has one
    pub(crate) fn queued_style(&self) -> Option<Style> {
        match &self.inner {
            FlowInner::Queued { style, .. } => Some(*style),
            FlowInner::Serial(_) => None,
        }
    }

    /// Append one more job to a deferred evaluation
    pub(crate) fn push_job(&mut self, job: Work<T>) {
        match &mut self.inner {
            FlowInner::Queued { jobs, .. } => jobs.push(job),
            FlowInner::Serial(_) => unreachable!("push_job on a serial flow"),
        }
    }

    /// A deferred evaluation can absorb further operands only while its
    /// jobs are plain producers. A bind driver allocates sequence numbers
    /// as it expands, so anything appended after it would overtake later
    /// iterations under Ahead.
    pub(crate) fn can_append(&self) -> bool {
        match &self.inner {
            FlowInner::Queued { jobs, .. } => {
                jobs.iter().all(|job| matches!(job, Work::Stream(_)))
            }
            FlowInner::Serial(_) => false,
        }
    }

    pub(crate) fn take_config(&self) -> EvalConfig {
        self.config.clone()
    }

    pub(crate) fn apply_config(mut self, config: EvalConfig) -> Self {
        self.config = config;
        self
    }

    /// Cap the number of concurrent workers: `0` resets to the default,
    /// negative removes the limit
    pub fn max_threads(mut self, n: isize) -> Self {
        self.config = self.config.max_threads(n);
        self
    }

    /// Cap the number of buffered yields: `0` resets to the default,
    /// negative removes the limit
    pub fn max_buffer(mut self, n: isize) -> Self {
        self.config = self.config.max_buffer(n);
        self
    }

    /// Budget the total number of yields; `None` removes the budget.
    /// The budget applies to this flow's SVar only.
    pub fn max_yields(mut self, n: Option<u64>) -> Self {
        self.config = self.config.max_yields(n);
        self
    }

    /// Target output rate in yields per second
    pub fn max_rate(mut self, per_sec: f64) -> Self {
        self.config = self.config.max_rate(per_sec);
        self
    }

    /// Seed the worker-latency estimate used for the first dispatches
    pub fn serial_latency(mut self, hint: Duration) -> Self {
        self.config = self.config.serial_latency(hint);
        self
    }

    /// Lower to the serial stream representation. A deferred concurrent
    /// flow materialises its SVar lazily, on the first step.
    pub fn into_stream(self) -> Stream<T> {
        match self.inner {
            FlowInner::Serial(stream) => stream,
            FlowInner::Queued { style, jobs } => {
                let config = self.config;
                Stream::new(move || {
                    let svar = SVar::new(style, &config)?;
                    for job in jobs {
                        svar.submit(job);
                    }
                    svar.dispatch_initial();
                    stream_from_puller(SvarPuller::new(svar)).step()
                })
            }
        }
    }

    /// Apply `f` to every element
    pub fn map<U: Send + 'static>(self, f: impl FnMut(T) -> U + Send + 'static) -> Flow<U> {
        Flow::from_stream(self.into_stream().map(f))
    }

    /// Keep only elements matching the predicate
    pub fn filter(self, pred: impl Fn(&T) -> bool + Send + 'static) -> Self {
        Self::from_stream(self.into_stream().filter(pred))
    }

    /// Truncate after `n` elements
    pub fn take(self, n: usize) -> Self {
        Self::from_stream(self.into_stream().take(n))
    }

    /// Truncate at the first element failing the predicate
    pub fn take_while(self, pred: impl Fn(&T) -> bool + Send + 'static) -> Self {
        Self::from_stream(self.into_stream().take_while(pred))
    }

    /// Drive the flow to completion, folding every element
    pub fn fold<A>(self, init: A, f: impl FnMut(A, T) -> A) -> EvalResult<A> {
        self.into_stream().fold(init, f)
    }

    /// Collect every element into a vector
    pub fn to_vec(self) -> EvalResult<Vec<T>> {
        self.into_stream().to_vec()
    }

    /// Count the elements
    pub fn count(self) -> EvalResult<usize> {
        self.into_stream().count()
    }

    /// Evaluate for effects only
    pub fn drain(self) -> EvalResult<()> {
        self.into_stream().drain()
    }

    /// Run `f` on every element
    pub fn for_each(self, mut f: impl FnMut(T)) -> EvalResult<()> {
        self.fold((), |(), v| f(v))
    }
}

impl<T: Send + 'static> IntoIterator for Flow<T> {
    type Item = EvalResult<T>;
    type IntoIter = FlowIter<T>;

    fn into_iter(self) -> FlowIter<T> {
        FlowIter {
            cur: Some(self.into_stream()),
        }
    }
}

/// Iterator over a flow's values; errors end the iteration
pub struct FlowIter<T> {
    cur: Option<Stream<T>>,
}

impl<T: Send + 'static> Iterator for FlowIter<T> {
    type Item = EvalResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let stream = self.cur.take()?;
        match stream.step() {
            Ok(Step::Yield(v, rest)) => {
                self.cur = Some(rest);
                Some(Ok(v))
            }
            Ok(Step::Single(v)) => Some(Ok(v)),
            Ok(Step::Stop) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

fn stream_from_puller<T: Send + 'static>(mut puller: SvarPuller<T>) -> Stream<T> {
    Stream::new(move || match puller.next() {
        Some(Ok(v)) => Ok(Step::Yield(v, stream_from_puller(puller))),
        Some(Err(e)) => Err(e),
        None => Ok(Step::Stop),
    })
}
