//! MpmcRingBuffer - lock-free multi-producer, multi-consumer (bounded).
//!
//! Every slot carries a sequence number that hands ownership back and forth
//! between producers and consumers without a lock. For a claimed position
//! `pos` and its slot's sequence `seq`:
//!
//! | `seq`            | meaning                                   |
//! |------------------|-------------------------------------------|
//! | `pos`            | free, ready for the producer at `pos`     |
//! | `pos + 1`        | published, ready for the consumer at `pos`|
//! | `pos + capacity` | consumed, free again one lap later        |
//!
//! A producer wins a position with CAS on `tail`, writes the value, then
//! releases it to consumers by storing `pos + 1`. A consumer wins a position
//! with CAS on `head`, moves the value out, then hands the slot to the next
//! lap's producer by storing `pos + capacity`.
//!
//! Full rings reject: `put` returns the value inside [`Full`].

use std::cmp;
use std::fmt;

use crate::capacity;
use crate::error::{Full, Result, RingError};
use crate::padding::CachePadded;
use crate::ring::slot::{self, Slot};
use crate::ring::{OverflowPolicy, Put, Ring};
use crate::sync::atomic::{AtomicU64, Ordering};
use crate::sync::Backoff;

/// Smallest ring the protocol supports: with one slot, `pos + 1` (published)
/// and `pos + capacity` (free for the next lap) are the same value.
const MIN_CAPACITY: usize = 2;

pub struct MpmcRingBuffer<T> {
    slots: Box<[Slot<T>]>,
    mask: usize,
    head: CachePadded<AtomicU64>,
    tail: CachePadded<AtomicU64>,
}

// SAFETY: a cell is only touched by the single thread that won its position
// via CAS; values move between threads, so `T: Send` is required and enough.
unsafe impl<T: Send> Send for MpmcRingBuffer<T> {}
unsafe impl<T: Send> Sync for MpmcRingBuffer<T> {}

impl<T> MpmcRingBuffer<T> {
    /// Ring with `capacity` rounded up to a power of two (at least 2).
    pub fn new(capacity: usize) -> Result<Self> {
        match capacity::normalize(capacity) {
            Ok(effective) => Ok(Self::build(capacity, effective.max(MIN_CAPACITY))),
            Err(err) => {
                trace_warn!(capacity, "mpmc ring rejected capacity");
                Err(err)
            }
        }
    }

    /// Ring with exactly `capacity` slots; fails unless it is a power of two
    /// and at least 2.
    pub fn with_exact_capacity(capacity: usize) -> Result<Self> {
        let checked = capacity::require_power_of_two(capacity).and_then(|c| {
            if c < MIN_CAPACITY {
                Err(RingError::config(format!(
                    "mpmc capacity must be at least {MIN_CAPACITY}"
                )))
            } else {
                Ok(c)
            }
        });
        match checked {
            Ok(effective) => Ok(Self::build(capacity, effective)),
            Err(err) => {
                trace_warn!(capacity, "mpmc ring rejected capacity");
                Err(err)
            }
        }
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn build(requested: usize, capacity: usize) -> Self {
        trace_debug!(requested, capacity, "mpmc ring created");
        Self {
            slots: slot::allocate(capacity, |i| i as u64),
            mask: capacity - 1,
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Store `value`, or hand it back in [`Full`] if every slot is occupied.
    ///
    /// Never blocks. Under contention it retries, yielding between attempts.
    pub fn put(&self, value: T) -> std::result::Result<(), Full<T>> {
        let mut backoff = Backoff::new();
        let mut pos = self.tail.load(Ordering::Relaxed);

        let slot = loop {
            let slot = self.slot(pos);
            let seq = slot.sequence.load(Ordering::Acquire);

            match (seq.wrapping_sub(pos) as i64).cmp(&0) {
                cmp::Ordering::Equal => {
                    match self.tail.compare_exchange_weak(
                        pos,
                        pos + 1,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => break slot,
                        Err(actual) => pos = actual,
                    }
                }
                // Slot still holds last lap's value: full.
                cmp::Ordering::Less => return Err(Full(value)),
                // Another producer already took `pos`.
                cmp::Ordering::Greater => pos = self.tail.load(Ordering::Relaxed),
            }
            backoff.snooze();
        };

        // SAFETY: winning the CAS on `tail` at `pos` while `seq == pos` makes
        // us the only thread allowed into this slot until we publish.
        let stale = unsafe { slot.replace(value) };
        debug_assert!(stale.is_none(), "free slot still held a value");
        slot.sequence.store(pos + 1, Ordering::Release);
        Ok(())
    }

    /// Take the oldest published value, or `None` if there is none.
    ///
    /// Never blocks. Under contention it retries, yielding between attempts.
    pub fn get(&self) -> Option<T> {
        let capacity = self.slots.len() as u64;
        let mut backoff = Backoff::new();
        let mut pos = self.head.load(Ordering::Relaxed);

        let slot = loop {
            let slot = self.slot(pos);
            let seq = slot.sequence.load(Ordering::Acquire);

            match (seq.wrapping_sub(pos + 1) as i64).cmp(&0) {
                cmp::Ordering::Equal => {
                    match self.head.compare_exchange_weak(
                        pos,
                        pos + 1,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => break slot,
                        Err(actual) => pos = actual,
                    }
                }
                // Nothing published at `pos` yet: empty.
                cmp::Ordering::Less => return None,
                // Another consumer already took `pos`.
                cmp::Ordering::Greater => pos = self.head.load(Ordering::Relaxed),
            }
            backoff.snooze();
        };

        // SAFETY: winning the CAS on `head` at `pos` while `seq == pos + 1`
        // makes us the only reader of this slot until we free it.
        let value = unsafe { slot.take() };
        debug_assert!(value.is_some(), "published slot was empty");
        slot.sequence.store(pos + capacity, Ordering::Release);
        value
    }

    /// Occupied slots at some recent instant. Exact only when quiescent.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (tail.saturating_sub(head) as usize).min(self.slots.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn policy(&self) -> OverflowPolicy {
        OverflowPolicy::RejectNew
    }

    pub fn producer_cursor(&self) -> u64 {
        self.tail.load(Ordering::Relaxed)
    }

    pub fn consumer_cursor(&self) -> u64 {
        self.head.load(Ordering::Relaxed)
    }

    #[inline]
    fn slot(&self, position: u64) -> &Slot<T> {
        &self.slots[(position as usize) & self.mask]
    }
}

impl<T> Ring<T> for MpmcRingBuffer<T> {
    fn put(&mut self, value: T) -> Put<T> {
        match MpmcRingBuffer::put(self, value) {
            Ok(()) => Put::Stored,
            Err(Full(value)) => Put::Rejected(value),
        }
    }

    fn get(&mut self) -> Option<T> {
        MpmcRingBuffer::get(self)
    }

    fn len(&self) -> usize {
        MpmcRingBuffer::len(self)
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn policy(&self) -> OverflowPolicy {
        OverflowPolicy::RejectNew
    }
}

impl<T> fmt::Debug for MpmcRingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpmcRingBuffer")
            .field("capacity", &self.slots.len())
            .field("head", &self.consumer_cursor())
            .field("tail", &self.producer_cursor())
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_mpmc_basic() {
        let ring = MpmcRingBuffer::new(1024).unwrap();
        assert!(ring.put(42u64).is_ok());
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.get(), Some(42));
        assert_eq!(ring.get(), None);
    }

    #[test]
    fn test_mpmc_reject_on_full() {
        let ring = MpmcRingBuffer::new(4).unwrap();
        for i in 0..4 {
            assert!(ring.put(i).is_ok());
        }
        assert!(ring.is_full());

        let rejected = ring.put(4).unwrap_err();
        assert_eq!(rejected.into_inner(), 4);
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.producer_cursor(), 4);

        assert_eq!(ring.get(), Some(0));
        assert!(ring.put(4).is_ok());

        let drained: Vec<_> = std::iter::from_fn(|| ring.get()).collect();
        assert_eq!(drained, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_mpmc_capacity() {
        assert_eq!(MpmcRingBuffer::<u8>::new(5).unwrap().capacity(), 8);
        assert_eq!(MpmcRingBuffer::<u8>::new(8).unwrap().capacity(), 8);
        assert_eq!(MpmcRingBuffer::<u8>::new(1).unwrap().capacity(), 2);
        assert!(matches!(
            MpmcRingBuffer::<u8>::new(0),
            Err(RingError::Config(_))
        ));
        assert!(MpmcRingBuffer::<u8>::with_exact_capacity(6).is_err());
        assert!(MpmcRingBuffer::<u8>::with_exact_capacity(1).is_err());
        assert_eq!(
            MpmcRingBuffer::<u8>::with_exact_capacity(16).unwrap().capacity(),
            16
        );
    }

    #[test]
    fn test_mpmc_sequences_after_lap() {
        let ring = MpmcRingBuffer::new(4).unwrap();
        for lap in 0..3u64 {
            for i in 0..4 {
                ring.put(lap * 4 + i).unwrap();
            }
            for i in 0..4 {
                assert_eq!(ring.get(), Some(lap * 4 + i));
            }
        }
        // Consumed slot i of lap 3 waits for position 12 + i.
        let seqs: Vec<_> = ring
            .slots
            .iter()
            .map(|s| s.sequence.load(Ordering::Relaxed))
            .collect();
        assert_eq!(seqs, vec![12, 13, 14, 15]);
    }

    #[test]
    fn test_mpmc_idempotent_drain() {
        let ring = MpmcRingBuffer::new(2).unwrap();
        ring.put('a').unwrap();
        assert_eq!(ring.get(), Some('a'));
        for _ in 0..5 {
            assert_eq!(ring.get(), None);
        }
        assert_eq!((ring.consumer_cursor(), ring.producer_cursor()), (1, 1));
    }

    #[test]
    fn test_mpmc_get_releases_value() {
        let tracked = Arc::new(());
        let ring = MpmcRingBuffer::new(2).unwrap();
        ring.put(tracked.clone()).unwrap();
        drop(ring.get());
        assert_eq!(Arc::strong_count(&tracked), 1);

        ring.put(tracked.clone()).unwrap();
        drop(ring);
        assert_eq!(Arc::strong_count(&tracked), 1);
    }

    #[test]
    fn test_mpmc_ring_trait() {
        let mut ring = MpmcRingBuffer::new(2).unwrap();
        assert_eq!(Ring::put(&mut ring, 1), Put::Stored);
        assert_eq!(Ring::put(&mut ring, 2), Put::Stored);
        assert_eq!(Ring::put(&mut ring, 3), Put::Rejected(3));
        assert_eq!(Ring::policy(&ring), OverflowPolicy::RejectNew);
        assert_eq!(Ring::get(&mut ring), Some(1));
    }

    #[test]
    fn test_mpmc_multi_threaded() {
        let ring = Arc::new(MpmcRingBuffer::new(64).unwrap());
        let producers = 4u64;
        let consumers = 4;
        let per_producer = 5_000u64;
        let total = producers * per_producer;

        let handles: Vec<_> = (0..producers)
            .map(|p| {
                let ring = ring.clone();
                thread::spawn(move || {
                    for i in 0..per_producer {
                        let mut value = p * per_producer + i;
                        while let Err(Full(back)) = ring.put(value) {
                            value = back;
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        let received = Arc::new(AtomicU64::new(0));
        let readers: Vec<_> = (0..consumers)
            .map(|_| {
                let ring = ring.clone();
                let received = received.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while received.load(Ordering::Relaxed) < total {
                        match ring.get() {
                            Some(v) => {
                                seen.push(v);
                                received.fetch_add(1, Ordering::Relaxed);
                            }
                            None => thread::yield_now(),
                        }
                    }
                    seen
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        let mut all = HashSet::new();
        for r in readers {
            for v in r.join().unwrap() {
                assert!(all.insert(v), "duplicate value {v}");
            }
        }
        assert_eq!(all.len() as u64, total);
        assert!(ring.is_empty());
    }
}
