//! LocalRingBuffer - single-owner ring, no synchronization.
//!
//! Ground truth for the other tiers: FIFO order, and on a full ring either
//! overwrite-oldest (default) or reject-new. Indices wrap with modulo, so any
//! non-zero capacity works as-is.

use std::fmt;
use std::iter::FusedIterator;

use crate::capacity;
use crate::error::Result;
use crate::ring::{OverflowPolicy, Put, Ring, RingConfig};

pub struct LocalRingBuffer<T> {
    items: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    size: usize,
    policy: OverflowPolicy,
}

impl<T> LocalRingBuffer<T> {
    /// Overwrite-oldest ring with exactly `capacity` slots.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::from_config(RingConfig::new(capacity)?)
    }

    pub fn with_policy(capacity: usize, policy: OverflowPolicy) -> Result<Self> {
        Self::from_config(RingConfig::new(capacity)?.with_policy(policy))
    }

    pub fn from_config(config: RingConfig) -> Result<Self> {
        let capacity = match capacity::require_positive(config.capacity) {
            Ok(capacity) => capacity,
            Err(err) => {
                trace_warn!(capacity = config.capacity, "local ring rejected capacity");
                return Err(err);
            }
        };
        trace_debug!(capacity, policy = ?config.policy, "local ring created");

        Ok(Self {
            items: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            size: 0,
            policy: config.policy,
        })
    }

    /// Store `value` at the tail. On a full ring the policy decides.
    pub fn put(&mut self, value: T) -> Put<T> {
        let capacity = self.items.len();
        if self.size >= capacity {
            return match self.policy {
                OverflowPolicy::RejectNew => Put::Rejected(value),
                OverflowPolicy::OverwriteOldest => {
                    // Full means head == tail: the new value lands on the oldest.
                    let old = self.items[self.head].replace(value);
                    self.head = (self.head + 1) % capacity;
                    self.tail = (self.tail + 1) % capacity;
                    match old {
                        Some(old) => Put::Evicted(old),
                        None => Put::Stored,
                    }
                }
            };
        }

        self.items[self.tail] = Some(value);
        self.tail = (self.tail + 1) % capacity;
        self.size += 1;
        Put::Stored
    }

    /// Move the oldest value out.
    pub fn get(&mut self) -> Option<T> {
        if self.size == 0 {
            return None;
        }
        let value = self.items[self.head].take();
        self.head = (self.head + 1) % self.items.len();
        self.size -= 1;
        value
    }

    /// Oldest value, left in place.
    pub fn peek(&self) -> Option<&T> {
        if self.size == 0 {
            return None;
        }
        self.items[self.head].as_ref()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.size == self.items.len()
    }

    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Drop every stored value. Positions restart at slot 0.
    pub fn clear(&mut self) {
        self.items.iter_mut().for_each(|item| *item = None);
        self.head = 0;
        self.tail = 0;
        self.size = 0;
    }

    /// Remove values oldest-first. Values not yet yielded when the iterator is
    /// dropped stay in the ring.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { ring: self }
    }
}

impl<T> Ring<T> for LocalRingBuffer<T> {
    fn put(&mut self, value: T) -> Put<T> {
        LocalRingBuffer::put(self, value)
    }

    fn get(&mut self) -> Option<T> {
        LocalRingBuffer::get(self)
    }

    fn len(&self) -> usize {
        self.size
    }

    fn capacity(&self) -> usize {
        self.items.len()
    }

    fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}

impl<T> fmt::Debug for LocalRingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRingBuffer")
            .field("capacity", &self.items.len())
            .field("len", &self.size)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Iterator returned by [`LocalRingBuffer::drain`].
pub struct Drain<'a, T> {
    ring: &'a mut LocalRingBuffer<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.ring.get()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.ring.size, Some(self.ring.size))
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

impl<T> FusedIterator for Drain<'_, T> {}
