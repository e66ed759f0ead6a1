//! SpscRingBuffer - lock-free single producer, single consumer.
//!
//! No CAS on the write path except for eviction: the producer owns `tail`
//! outright. On a full ring the producer evicts the oldest element by moving
//! `head` forward, so both sides advance `head` and settle it with CAS.
//!
//! Slot sequence protocol:
//! - even: at rest
//! - odd: a thread holds the cell (producer writing, or consumer moving out)
//!
//! The producer bumps the sequence to odd before writing and to the next even
//! value after. A consumer that finds an odd sequence backs off; one that
//! finds `head` moved while it held the cell releases it untouched.
//!
//! ```rust
//! use ringcache::ring::SpscRingBuffer;
//!
//! let (mut tx, mut rx) = SpscRingBuffer::new(4).unwrap();
//! for i in 0..6 {
//!     tx.put(i);
//! }
//! let drained: Vec<_> = std::iter::from_fn(|| rx.get()).collect();
//! assert_eq!(drained, vec![2, 3, 4, 5]);
//! ```

use std::fmt;

use crate::capacity;
use crate::error::Result;
use crate::padding::CachePadded;
use crate::ring::slot::{self, Slot};
use crate::ring::OverflowPolicy;
use crate::sync::atomic::{AtomicU64, Ordering};
use crate::sync::{Arc, Backoff};

pub struct SpscRingBuffer<T> {
    slots: Box<[Slot<T>]>,
    mask: usize,
    head: CachePadded<AtomicU64>,
    tail: CachePadded<AtomicU64>,
}

// SAFETY: cell access is serialized by the slot sequence protocol; values move
// between threads, so `T: Send` is all that is needed.
unsafe impl<T: Send> Send for SpscRingBuffer<T> {}
unsafe impl<T: Send> Sync for SpscRingBuffer<T> {}

impl<T: Send> SpscRingBuffer<T> {
    /// Ring with `capacity` rounded up to a power of two, split into its two ends.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(capacity: usize) -> Result<(SpscProducer<T>, SpscConsumer<T>)> {
        match capacity::normalize(capacity) {
            Ok(effective) => Ok(Self::split(capacity, effective)),
            Err(err) => {
                trace_warn!(capacity, "spsc ring rejected capacity");
                Err(err)
            }
        }
    }

    /// Ring with exactly `capacity` slots; fails unless it is a power of two.
    pub fn with_exact_capacity(capacity: usize) -> Result<(SpscProducer<T>, SpscConsumer<T>)> {
        match capacity::require_power_of_two(capacity) {
            Ok(effective) => Ok(Self::split(capacity, effective)),
            Err(err) => {
                trace_warn!(capacity, "spsc ring rejected capacity");
                Err(err)
            }
        }
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn split(requested: usize, capacity: usize) -> (SpscProducer<T>, SpscConsumer<T>) {
        trace_debug!(requested, capacity, "spsc ring created");

        let ring = Arc::new(Self {
            slots: slot::allocate(capacity, |_| 0),
            mask: capacity - 1,
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
        });
        (
            SpscProducer { ring: ring.clone() },
            SpscConsumer { ring },
        )
    }
}

impl<T> SpscRingBuffer<T> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        (tail.saturating_sub(head) as usize).min(self.slots.len())
    }

    #[inline]
    fn slot(&self, position: u64) -> &Slot<T> {
        &self.slots[(position as usize) & self.mask]
    }
}

/// Writing end of an SPSC ring.
pub struct SpscProducer<T> {
    ring: Arc<SpscRingBuffer<T>>,
}

impl<T> SpscProducer<T> {
    /// Publish `value`. Never fails: a full ring evicts its oldest element.
    ///
    /// Returns `true` if an unread element was evicted to make room.
    pub fn put(&mut self, value: T) -> bool {
        let ring = &*self.ring;
        let tail = ring.tail.load(Ordering::Relaxed);
        let head = ring.head.load(Ordering::Acquire);

        // If the CAS loses, the consumer just took `head` and there is room.
        let evicted = tail.wrapping_sub(head) >= ring.capacity() as u64
            && ring
                .head
                .compare_exchange(head, head + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();

        let slot = ring.slot(tail);
        let mut backoff = Backoff::new();
        let seq = loop {
            let seq = slot.sequence.load(Ordering::Relaxed);
            // Odd: the consumer is still moving the previous lap's value out.
            if seq & 1 == 0
                && slot
                    .sequence
                    .compare_exchange_weak(seq, seq + 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                break seq;
            }
            backoff.snooze();
        };

        // SAFETY: odd sequence held by us; no other thread touches the cell.
        let stale = unsafe { slot.replace(value) };
        slot.sequence.store(seq + 2, Ordering::Release);
        ring.tail.store(tail + 1, Ordering::Release);

        // An evicted value is dropped outside the slot claim.
        drop(stale);
        evicted
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A put on a full ring evicts.
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn policy(&self) -> OverflowPolicy {
        OverflowPolicy::OverwriteOldest
    }
}

/// Reading end of an SPSC ring.
pub struct SpscConsumer<T> {
    ring: Arc<SpscRingBuffer<T>>,
}

impl<T> SpscConsumer<T> {
    /// Take the oldest element, or `None` if the ring is empty.
    pub fn get(&mut self) -> Option<T> {
        let ring = &*self.ring;
        let mut backoff = Backoff::new();

        loop {
            let head = ring.head.load(Ordering::Acquire);
            let tail = ring.tail.load(Ordering::Acquire);
            if head == tail {
                return None;
            }

            let slot = ring.slot(head);
            let seq = slot.sequence.load(Ordering::Acquire);
            // Odd: write in flight on this slot.
            if seq & 1 == 1
                || slot
                    .sequence
                    .compare_exchange(seq, seq + 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_err()
            {
                backoff.snooze();
                continue;
            }

            // Holding the cell; the value is ours only if `head` was not
            // moved past it by an eviction.
            if ring
                .head
                .compare_exchange(head, head + 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                // SAFETY: odd sequence held by us.
                let value = unsafe { slot.take() };
                slot.sequence.store(seq + 2, Ordering::Release);
                debug_assert!(value.is_some(), "published slot was empty");
                return value;
            }

            slot.sequence.store(seq, Ordering::Release);
            backoff.snooze();
        }
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl<T> fmt::Debug for SpscProducer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpscProducer")
            .field("capacity", &self.ring.capacity())
            .field("len", &self.ring.len())
            .finish()
    }
}

impl<T> fmt::Debug for SpscConsumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpscConsumer")
            .field("capacity", &self.ring.capacity())
            .field("len", &self.ring.len())
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_spsc_basic() {
        let (mut tx, mut rx) = SpscRingBuffer::new(8).unwrap();
        assert!(rx.get().is_none());
        assert!(!tx.put(42));
        assert_eq!(tx.len(), 1);
        assert_eq!(rx.get(), Some(42));
        assert!(rx.is_empty());
    }

    #[test]
    fn test_spsc_capacity_normalized() {
        let (tx, rx) = SpscRingBuffer::<u8>::new(5).unwrap();
        assert_eq!(tx.capacity(), 8);
        assert_eq!(rx.capacity(), 8);
        assert!(SpscRingBuffer::<u8>::new(0).is_err());
        assert!(SpscRingBuffer::<u8>::with_exact_capacity(5).is_err());
        assert_eq!(SpscRingBuffer::<u8>::with_exact_capacity(8).unwrap().0.capacity(), 8);
    }

    #[test]
    fn test_spsc_overwrite_oldest() {
        let (mut tx, mut rx) = SpscRingBuffer::new(4).unwrap();
        let evictions: Vec<bool> = (0..6).map(|i| tx.put(i)).collect();
        assert_eq!(evictions, vec![false, false, false, false, true, true]);
        assert_eq!(tx.len(), 4);
        assert!(tx.is_full() && rx.is_full());

        let drained: Vec<_> = std::iter::from_fn(|| rx.get()).collect();
        assert_eq!(drained, vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_spsc_wraps_many_laps() {
        let (mut tx, mut rx) = SpscRingBuffer::new(2).unwrap();
        for i in 0..1000u32 {
            tx.put(i);
            assert_eq!(rx.get(), Some(i));
        }
        assert_eq!(rx.get(), None);
        assert_eq!(rx.get(), None);
    }

    #[test]
    fn test_spsc_drops_evicted() {
        let tracked = Arc::new(());
        let (mut tx, mut rx) = SpscRingBuffer::new(1).unwrap();
        tx.put(tracked.clone());
        tx.put(tracked.clone());
        assert_eq!(Arc::strong_count(&tracked), 2);
        drop(rx.get());
        assert_eq!(Arc::strong_count(&tracked), 1);
    }

    #[test]
    fn test_spsc_multi_threaded_in_order() {
        // Large enough that nothing is evicted; the consumer must see 0..N in order.
        const N: u64 = 10_000;
        let (mut tx, mut rx) = SpscRingBuffer::new(N as usize).unwrap();

        let producer = thread::spawn(move || {
            for i in 0..N {
                tx.put(i);
            }
        });

        let mut expected = 0;
        while expected < N {
            if let Some(v) = rx.get() {
                assert_eq!(v, expected);
                expected += 1;
            } else {
                std::hint::spin_loop();
            }
        }
        producer.join().unwrap();
    }

    #[test]
    fn test_spsc_concurrent_overwrite_is_ordered() {
        // Small ring, heavy eviction: whatever survives must still be increasing
        // and nothing may be seen twice.
        const N: u64 = 50_000;
        let (mut tx, mut rx) = SpscRingBuffer::new(4).unwrap();

        let producer = thread::spawn(move || {
            let mut evicted = 0u64;
            for i in 0..N {
                if tx.put(i) {
                    evicted += 1;
                }
            }
            evicted
        });

        let mut received = Vec::new();
        loop {
            match rx.get() {
                Some(v) => received.push(v),
                None if producer.is_finished() => {
                    received.extend(std::iter::from_fn(|| rx.get()));
                    break;
                }
                None => std::hint::spin_loop(),
            }
        }
        let evicted = producer.join().unwrap();

        assert!(received.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(received.last(), Some(&(N - 1)));
        assert_eq!(received.len() as u64 + evicted, N);
    }
}
