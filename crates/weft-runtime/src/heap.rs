//! Ordering heap for the Ahead style
//!
//! Min-heap keyed by sequence number, holding results that were produced
//! speculatively out of order. The token (`next_seq`, the sequence
//! currently allowed to publish) lives under the same lock as the heap,
//! so every observer sees a consistent (heap, token) pair.
//!
//! The heap owns a parked continuation; popping a slot transfers
//! ownership to the extracting worker.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;

use weft_core::{SpinLock, Stream};

/// An out-of-order result parked until the token reaches its sequence
pub enum HeapEntry<T> {
    /// A single value ready to publish
    Value(T),

    /// A partially evaluated continuation; the token holder resumes it
    Suspended(Stream<T>),

    /// The sequence produced nothing; the token passes straight through
    Empty,
}

struct Slot<T> {
    seq: u64,
    entry: HeapEntry<T>,
}

impl<T> PartialEq for Slot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T> Eq for Slot<T> {}

impl<T> PartialOrd for Slot<T> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Slot<T> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reverse ordering for a min-heap (smallest sequence first).
        // Sequences are unique, so this is a total order over live slots.
        other.seq.cmp(&self.seq)
    }
}

struct HeapState<T> {
    heap: BinaryHeap<Slot<T>>,
    next_seq: u64,
}

/// The heap plus the publication token, updated as one unit
pub struct OrderingHeap<T> {
    state: SpinLock<HeapState<T>>,
}

impl<T> OrderingHeap<T> {
    pub fn new() -> Self {
        Self {
            state: SpinLock::new(HeapState {
                heap: BinaryHeap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Park an out-of-order entry. A sequence number is assigned exactly
    /// once at enqueue, so no two live slots share one.
    pub fn insert(&self, seq: u64, entry: HeapEntry<T>) {
        let mut state = self.state.lock();
        debug_assert!(seq >= state.next_seq);
        state.heap.push(Slot { seq, entry });
    }

    /// Pop the entry owning the token, if it is parked here
    pub fn pop_token(&self) -> Option<(u64, HeapEntry<T>)> {
        let mut state = self.state.lock();
        if state
            .heap
            .peek()
            .is_some_and(|slot| slot.seq == state.next_seq)
        {
            let slot = state.heap.pop().unwrap();
            Some((slot.seq, slot.entry))
        } else {
            None
        }
    }

    /// The sequence currently allowed to publish
    pub fn token(&self) -> u64 {
        self.state.lock().next_seq
    }

    /// The current holder finished its sequence; move the token forward
    pub fn advance_token(&self) -> u64 {
        let mut state = self.state.lock();
        state.next_seq += 1;
        state.next_seq
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }
}

impl<T> Default for OrderingHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::Step;

    #[test]
    fn test_token_walk_in_sequence_order() {
        let heap = OrderingHeap::new();

        // Insert out of order
        heap.insert(2, HeapEntry::Value(20));
        heap.insert(0, HeapEntry::Value(0));
        heap.insert(1, HeapEntry::Value(10));
        assert_eq!(heap.len(), 3);

        let mut seen = Vec::new();
        while let Some((seq, entry)) = heap.pop_token() {
            match entry {
                HeapEntry::Value(v) => seen.push((seq, v)),
                _ => panic!("expected values"),
            }
            heap.advance_token();
        }
        assert_eq!(seen, vec![(0, 0), (1, 10), (2, 20)]);
        assert!(heap.is_empty());
    }

    #[test]
    fn test_pop_only_at_token() {
        let heap: OrderingHeap<u32> = OrderingHeap::new();
        heap.insert(1, HeapEntry::Value(10));

        // Token is 0; sequence 1 stays parked
        assert!(heap.pop_token().is_none());
        assert_eq!(heap.token(), 0);

        assert_eq!(heap.advance_token(), 1);
        assert!(heap.pop_token().is_some());
    }

    #[test]
    fn test_empty_entry_passes_token_through() {
        let heap: OrderingHeap<u32> = OrderingHeap::new();
        heap.insert(0, HeapEntry::Empty);
        heap.insert(1, HeapEntry::Value(10));

        match heap.pop_token() {
            Some((0, HeapEntry::Empty)) => {
                heap.advance_token();
            }
            _ => panic!("expected the empty slot first"),
        }
        assert!(matches!(heap.pop_token(), Some((1, HeapEntry::Value(10)))));
    }

    #[test]
    fn test_suspended_entry_resumes() {
        let heap = OrderingHeap::new();
        heap.insert(0, HeapEntry::Suspended(Stream::from_iter(vec![1, 2, 3])));

        let Some((_, HeapEntry::Suspended(stream))) = heap.pop_token() else {
            panic!("expected a suspended continuation");
        };
        match stream.step().unwrap() {
            Step::Yield(v, rest) => {
                assert_eq!(v, 1);
                assert_eq!(rest.to_vec().unwrap(), vec![2, 3]);
            }
            _ => panic!("expected a yield"),
        }
    }
}
