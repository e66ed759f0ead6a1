//! Bounded ring buffers, one per concurrency tier.
//!
//! - `LocalRingBuffer<T>` - single owner, no synchronization (baseline)
//! - `MutexRingBuffer<T>` - any number of threads, one lock per call
//! - `SpscRingBuffer<T>` - lock-free, one producer handle + one consumer handle
//! - `MpmcRingBuffer<T>` - lock-free, any number of producers and consumers
//!
//! Overflow policy differs per tier: the local and mutex rings overwrite the
//! oldest element by default (configurable), SPSC always overwrites, MPMC
//! always rejects.

mod local;
mod mpmc;
mod mutex;
mod slot;
mod spsc;

pub use local::{Drain, LocalRingBuffer};
pub use mpmc::MpmcRingBuffer;
pub use mutex::MutexRingBuffer;
pub use spsc::{SpscConsumer, SpscProducer, SpscRingBuffer};

use crate::capacity;
use crate::error::Result;

/// Default ring capacity
pub const DEFAULT_CAPACITY: usize = 1024;

/// What `put` does when every slot is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Evict the oldest unread element to make room.
    #[default]
    OverwriteOldest,
    /// Refuse the new element; contents stay unchanged.
    RejectNew,
}

/// Outcome of a `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a rejected or evicted value is dropped if ignored"]
pub enum Put<T> {
    /// Stored without displacing anything.
    Stored,
    /// Stored; the oldest element was evicted and is returned.
    Evicted(T),
    /// Not stored (`RejectNew` on a full ring); the value is returned.
    Rejected(T),
}

impl<T> Put<T> {
    /// True if the new value is now in the ring.
    pub fn is_stored(&self) -> bool {
        !matches!(self, Put::Rejected(_))
    }

    /// True if some value (old or new) left the ring unread.
    pub fn is_dropped(&self) -> bool {
        !matches!(self, Put::Stored)
    }

    pub fn evicted(self) -> Option<T> {
        match self {
            Put::Evicted(old) => Some(old),
            _ => None,
        }
    }

    pub fn rejected(self) -> Option<T> {
        match self {
            Put::Rejected(value) => Some(value),
            _ => None,
        }
    }
}

/// Common call surface of the tiers that a single owner drives.
///
/// `MpmcRingBuffer` and `MutexRingBuffer` also offer the same operations on
/// `&self` for sharing across threads.
pub trait Ring<T> {
    fn put(&mut self, value: T) -> Put<T>;

    fn get(&mut self) -> Option<T>;

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn policy(&self) -> OverflowPolicy;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }
}

/// Construction parameters shared by the tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingConfig {
    /// Number of slots
    pub capacity: usize,
    /// Full-buffer behavior (local and mutex tiers)
    pub policy: OverflowPolicy,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            policy: OverflowPolicy::default(),
        }
    }
}

impl RingConfig {
    /// Create a configuration with the given capacity
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = capacity::require_positive(capacity)?;
        Ok(Self {
            capacity,
            ..Default::default()
        })
    }

    pub fn with_policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Round the capacity up to a power of two.
    pub fn normalized(mut self) -> Result<Self> {
        self.capacity = capacity::normalize(self.capacity)?;
        Ok(self)
    }
}
