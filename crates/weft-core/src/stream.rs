//! Lazy stream representation
//!
//! A `Stream` is a producer continuation: a step function that either
//! stops, yields one final value, or yields a value together with the
//! continuation producing the rest. Streams compose without being
//! evaluated; forcing one step at a time is the only way to run them.
//! Producer failure travels through the `Err` arm of the step result, so
//! `?` propagates it through every combinator.

use crate::error::{EvalError, EvalResult};

/// One step of a producer continuation
pub enum Step<T> {
    /// Cons yield: a value and the continuation producing the rest
    Yield(T, Stream<T>),

    /// Final single value; `Yield(v, nil)` without the allocation
    Single(T),

    /// End of stream
    Stop,
}

/// A lazy, re-entrant producer continuation
pub struct Stream<T> {
    step: Box<dyn FnOnce() -> EvalResult<Step<T>> + Send>,
}

impl<T: Send + 'static> Stream<T> {
    /// Wrap a step function
    #[inline]
    pub fn new(step: impl FnOnce() -> EvalResult<Step<T>> + Send + 'static) -> Self {
        Self {
            step: Box::new(step),
        }
    }

    /// Evaluate one step, consuming this continuation
    #[inline]
    pub fn step(self) -> EvalResult<Step<T>> {
        (self.step)()
    }

    /// The empty stream
    pub fn nil() -> Self {
        Stream::new(|| Ok(Step::Stop))
    }

    /// A one-element stream
    pub fn once(value: T) -> Self {
        Stream::new(move || Ok(Step::Single(value)))
    }

    /// Prepend a value to a stream
    pub fn cons(value: T, rest: Stream<T>) -> Self {
        Stream::new(move || Ok(Step::Yield(value, rest)))
    }

    /// A stream that fails when forced
    pub fn fail(error: EvalError) -> Self {
        Stream::new(move || Err(error))
    }

    /// Lift an iterator into a stream
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::from_iter_inner(iter.into_iter())
    }

    fn from_iter_inner<I>(mut it: I) -> Self
    where
        I: Iterator<Item = T> + Send + 'static,
    {
        Stream::new(move || match it.next() {
            Some(v) => Ok(Step::Yield(v, Stream::from_iter_inner(it))),
            None => Ok(Step::Stop),
        })
    }

    /// Generate elements until the closure returns `None`
    pub fn from_fn(mut f: impl FnMut() -> Option<T> + Send + 'static) -> Self {
        Stream::new(move || match f() {
            Some(v) => Ok(Step::Yield(v, Stream::from_fn(f))),
            None => Ok(Step::Stop),
        })
    }

    /// Sequential composition: all of `self`, then all of `other`
    pub fn append(self, other: Stream<T>) -> Self {
        Stream::new(move || match self.step()? {
            Step::Yield(v, rest) => Ok(Step::Yield(v, rest.append(other))),
            Step::Single(v) => Ok(Step::Yield(v, other)),
            Step::Stop => other.step(),
        })
    }

    /// Fair composition: one element from each side in turn
    pub fn interleave(self, other: Stream<T>) -> Self {
        Stream::new(move || match self.step()? {
            Step::Yield(v, rest) => Ok(Step::Yield(v, other.interleave(rest))),
            Step::Single(v) => Ok(Step::Yield(v, other)),
            Step::Stop => other.step(),
        })
    }

    /// Apply `f` to every element
    pub fn map<U: Send + 'static>(self, mut f: impl FnMut(T) -> U + Send + 'static) -> Stream<U> {
        Stream::new(move || match self.step()? {
            Step::Yield(v, rest) => {
                let mapped = f(v);
                Ok(Step::Yield(mapped, rest.map(f)))
            }
            Step::Single(v) => Ok(Step::Single(f(v))),
            Step::Stop => Ok(Step::Stop),
        })
    }

    /// Keep only elements matching the predicate
    pub fn filter(self, pred: impl Fn(&T) -> bool + Send + 'static) -> Self {
        Stream::new(move || {
            let mut cur = self;
            loop {
                match cur.step()? {
                    Step::Yield(v, rest) => {
                        if pred(&v) {
                            return Ok(Step::Yield(v, rest.filter(pred)));
                        }
                        cur = rest;
                    }
                    Step::Single(v) => {
                        return Ok(if pred(&v) { Step::Single(v) } else { Step::Stop });
                    }
                    Step::Stop => return Ok(Step::Stop),
                }
            }
        })
    }

    /// Truncate after `n` elements
    pub fn take(self, n: usize) -> Self {
        Stream::new(move || {
            if n == 0 {
                return Ok(Step::Stop);
            }
            match self.step()? {
                Step::Yield(v, rest) => {
                    if n == 1 {
                        Ok(Step::Single(v))
                    } else {
                        Ok(Step::Yield(v, rest.take(n - 1)))
                    }
                }
                Step::Single(v) => Ok(Step::Single(v)),
                Step::Stop => Ok(Step::Stop),
            }
        })
    }

    /// Truncate at the first element failing the predicate
    pub fn take_while(self, pred: impl Fn(&T) -> bool + Send + 'static) -> Self {
        Stream::new(move || match self.step()? {
            Step::Yield(v, rest) => {
                if pred(&v) {
                    Ok(Step::Yield(v, rest.take_while(pred)))
                } else {
                    Ok(Step::Stop)
                }
            }
            Step::Single(v) => {
                if pred(&v) {
                    Ok(Step::Single(v))
                } else {
                    Ok(Step::Stop)
                }
            }
            Step::Stop => Ok(Step::Stop),
        })
    }

    /// Sequential monadic bind: expand each element into a stream
    pub fn concat_map<U: Send + 'static>(
        self,
        f: impl Fn(T) -> Stream<U> + Send + 'static,
    ) -> Stream<U> {
        Stream::new(move || match self.step()? {
            Step::Yield(v, rest) => {
                let head = f(v);
                head.append(rest.concat_map(f)).step()
            }
            Step::Single(v) => f(v).step(),
            Step::Stop => Ok(Step::Stop),
        })
    }

    /// Drive the stream to completion, folding every element
    pub fn fold<A>(self, init: A, mut f: impl FnMut(A, T) -> A) -> EvalResult<A> {
        let mut acc = init;
        let mut cur = self;
        loop {
            match cur.step()? {
                Step::Yield(v, rest) => {
                    acc = f(acc, v);
                    cur = rest;
                }
                Step::Single(v) => return Ok(f(acc, v)),
                Step::Stop => return Ok(acc),
            }
        }
    }

    /// Collect every element into a vector
    pub fn to_vec(self) -> EvalResult<Vec<T>> {
        self.fold(Vec::new(), |mut acc, v| {
            acc.push(v);
            acc
        })
    }

    /// Count the elements
    pub fn count(self) -> EvalResult<usize> {
        self.fold(0, |n, _| n + 1)
    }

    /// Evaluate for effects only
    pub fn drain(self) -> EvalResult<()> {
        self.fold((), |(), _| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_source_order() {
        let s = Stream::from_iter(vec![1, 2]).append(Stream::from_iter(vec![3, 4]));
        assert_eq!(s.to_vec().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_interleave_alternates() {
        let s = Stream::from_iter(vec![1, 2, 3]).interleave(Stream::from_iter(vec![10, 20, 30]));
        assert_eq!(s.to_vec().unwrap(), vec![1, 10, 2, 20, 3, 30]);
    }

    #[test]
    fn test_interleave_uneven() {
        let s = Stream::from_iter(vec![1]).interleave(Stream::from_iter(vec![10, 20, 30]));
        assert_eq!(s.to_vec().unwrap(), vec![1, 10, 20, 30]);
    }

    #[test]
    fn test_map_filter_take() {
        let s = Stream::from_iter(0..100)
            .map(|v| v * 2)
            .filter(|v| v % 3 == 0)
            .take(4);
        assert_eq!(s.to_vec().unwrap(), vec![0, 6, 12, 18]);
    }

    #[test]
    fn test_from_fn_infinite_take() {
        let mut n = 0u64;
        let s = Stream::from_fn(move || {
            n += 1;
            Some(n)
        })
        .take(5);
        assert_eq!(s.to_vec().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_take_while() {
        let s = Stream::from_iter(vec![1, 2, 3, 10, 4]).take_while(|v| *v < 5);
        assert_eq!(s.to_vec().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_concat_map() {
        let s = Stream::from_iter(vec![1, 2, 3]).concat_map(|v| Stream::from_iter(vec![v, v * 10]));
        assert_eq!(s.to_vec().unwrap(), vec![1, 10, 2, 20, 3, 30]);
    }

    #[test]
    fn test_fold_and_count() {
        let sum = Stream::from_iter(1..=10).fold(0, |a, v| a + v).unwrap();
        assert_eq!(sum, 55);
        assert_eq!(Stream::from_iter(1..=10).count().unwrap(), 10);
    }

    #[test]
    fn test_failure_stops_fold() {
        let s = Stream::from_iter(vec![1, 2])
            .append(Stream::fail(EvalError::Producer("third".to_string())));
        let collected = s.to_vec();
        assert_eq!(collected, Err(EvalError::Producer("third".to_string())));
    }

    #[test]
    fn test_single_then_append() {
        let s = Stream::once(1).append(Stream::once(2));
        assert_eq!(s.to_vec().unwrap(), vec![1, 2]);
    }
}
