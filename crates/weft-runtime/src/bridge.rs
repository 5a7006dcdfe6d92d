//! From SVar to stream: the consumer-side puller
//!
//! Repeatedly drains cell batches from the output channel, hands yields
//! to the consumer in insertion order, accounts for worker stops, and
//! raises the first failure. Cells buffered before the failing cell are
//! delivered; everything after it is discarded. Dropping the puller
//! stops the SVar; workers observe the closed channel and quiesce.

use std::sync::Arc;
use std::time::Duration;

use tracing::trace;
use weft_core::EvalResult;

use crate::channel::ValueCell;
use crate::svar::SVar;

/// How long the consumer parks before re-checking for quiescence
const PARK_TIMEOUT: Duration = Duration::from_millis(2);

/// Iterator over the values an SVar produces
pub struct SvarPuller<T> {
    svar: Arc<SVar<T>>,
    batch: std::vec::IntoIter<ValueCell<T>>,
    finished: bool,
}

impl<T> SvarPuller<T> {
    pub fn new(svar: Arc<SVar<T>>) -> Self {
        Self {
            svar,
            batch: Vec::new().into_iter(),
            finished: false,
        }
    }
}

impl<T: Send + 'static> Iterator for SvarPuller<T> {
    type Item = EvalResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            while let Some(cell) = self.batch.next() {
                match cell {
                    ValueCell::Yield(v) => return Some(Ok(v)),
                    ValueCell::Stop {
                        worker,
                        error: Some(e),
                    } => {
                        trace!(worker = worker.as_u32(), "failure cell pulled");
                        self.finished = true;
                        self.svar.stop();
                        return Some(Err(e));
                    }
                    ValueCell::Stop { worker, error: None } => {
                        trace!(worker = worker.as_u32(), "worker stop cell pulled");
                    }
                }
            }

            let cells = self.svar.out().try_drain();
            if !cells.is_empty() {
                self.batch = cells.into_iter();
                // Post-process: the drained buffer may unblock workers
                self.svar.on_pull();
                continue;
            }

            if self.svar.is_done() {
                self.finished = true;
                return None;
            }

            self.svar.on_pull();
            self.svar.out().park_consumer(PARK_TIMEOUT);
        }
    }
}

impl<T> Drop for SvarPuller<T> {
    fn drop(&mut self) {
        self.svar.stop();
    }
}
