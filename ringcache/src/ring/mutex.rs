//! MutexRingBuffer - the local ring behind one lock.
//!
//! Same contract as `LocalRingBuffer`, callable from any number of threads.
//! Every call holds the lock for its whole duration, so it doubles as the
//! reference behavior when checking the lock-free tiers.

use std::fmt;

use parking_lot::Mutex;

use crate::error::Result;
use crate::padding::CachePadded;
use crate::ring::{LocalRingBuffer, OverflowPolicy, Put, Ring, RingConfig};

pub struct MutexRingBuffer<T> {
    // Lock word, head, tail and size share one padded block, away from
    // whatever the owner allocates next to the ring.
    inner: CachePadded<Mutex<LocalRingBuffer<T>>>,
    capacity: usize,
    policy: OverflowPolicy,
}

impl<T> MutexRingBuffer<T> {
    /// Overwrite-oldest ring with exactly `capacity` slots.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::from_config(RingConfig::new(capacity)?)
    }

    pub fn with_policy(capacity: usize, policy: OverflowPolicy) -> Result<Self> {
        Self::from_config(RingConfig::new(capacity)?.with_policy(policy))
    }

    pub fn from_config(config: RingConfig) -> Result<Self> {
        let ring = LocalRingBuffer::from_config(config)?;
        Ok(Self {
            capacity: ring.capacity(),
            policy: ring.policy(),
            inner: CachePadded::new(Mutex::new(ring)),
        })
    }

    pub fn put(&self, value: T) -> Put<T> {
        self.inner.lock().put(value)
    }

    pub fn get(&self) -> Option<T> {
        self.inner.lock().get()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Move every stored value into `out` under a single lock acquisition.
    /// Returns how many values were moved.
    pub fn drain_into(&self, out: &mut Vec<T>) -> usize {
        let mut ring = self.inner.lock();
        let count = ring.len();
        out.extend(ring.drain());
        count
    }

    pub fn into_inner(self) -> LocalRingBuffer<T> {
        self.inner.into_inner().into_inner()
    }
}

impl<T> Ring<T> for MutexRingBuffer<T> {
    // Exclusive access already excludes other callers; skip the lock.
    fn put(&mut self, value: T) -> Put<T> {
        self.inner.get_mut().put(value)
    }

    fn get(&mut self) -> Option<T> {
        self.inner.get_mut().get()
    }

    fn len(&self) -> usize {
        MutexRingBuffer::len(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}

impl<T> fmt::Debug for MutexRingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexRingBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_overwrite_reports_evicted() {
        let ring = MutexRingBuffer::new(4).unwrap();
        let evicted: Vec<_> = (0..6).filter_map(|i| ring.put(i).evicted()).collect();
        assert_eq!(evicted, vec![0, 1]);

        let mut drained = Vec::new();
        assert_eq!(ring.drain_into(&mut drained), 4);
        assert_eq!(drained, vec![2, 3, 4, 5]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_reject_new() {
        let ring = MutexRingBuffer::with_policy(1, OverflowPolicy::RejectNew).unwrap();
        assert_eq!(ring.put(1), Put::Stored);
        assert!(ring.is_full());
        assert_eq!(ring.put(2), Put::Rejected(2));
        assert_eq!(ring.get(), Some(1));
        assert_eq!(ring.get(), None);
    }

    #[test]
    fn test_ring_trait_without_lock() {
        fn fill<R: Ring<u32>>(ring: &mut R, n: u32) -> usize {
            (0..n).filter(|&i| ring.put(i).is_dropped()).count()
        }

        let mut ring = MutexRingBuffer::new(3).unwrap();
        assert_eq!(fill(&mut ring, 5), 2);
        assert_eq!(Ring::len(&ring), 3);
        assert_eq!(Ring::get(&mut ring), Some(2));
        assert_eq!(ring.into_inner().drain().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_clear() {
        let ring = MutexRingBuffer::new(5).unwrap();
        let _ = ring.put("a");
        ring.clear();
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.get(), None);
    }

    #[test]
    fn test_mutex_multi_threaded() {
        let ring = Arc::new(MutexRingBuffer::with_policy(64, OverflowPolicy::RejectNew).unwrap());
        let num_producers = 4u64;
        let per_producer = 1000u64;

        let producers: Vec<_> = (0..num_producers)
            .map(|p| {
                let ring = ring.clone();
                thread::spawn(move || {
                    for i in 0..per_producer {
                        let mut value = p * per_producer + i + 1;
                        while let Put::Rejected(back) = ring.put(value) {
                            value = back;
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        let total = num_producers * per_producer;
        let mut sum = 0u64;
        let mut count = 0u64;
        while count < total {
            match ring.get() {
                Some(v) => {
                    sum += v;
                    count += 1;
                }
                None => thread::yield_now(),
            }
        }
        for producer in producers {
            producer.join().unwrap();
        }

        assert_eq!(sum, total * (total + 1) / 2);
        assert!(ring.is_empty());
    }
}
