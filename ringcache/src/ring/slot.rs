//! One storage cell of a lock-free ring plus its sequence counter.

use crate::sync::atomic::AtomicU64;
use crate::sync::UnsafeCell;

pub(crate) struct Slot<T> {
    /// Ownership token. MPMC: generation-relative position. SPSC: odd while a
    /// thread holds the cell, even at rest.
    pub(crate) sequence: AtomicU64,
    value: UnsafeCell<Option<T>>,
}

impl<T> Slot<T> {
    pub(crate) fn new(sequence: u64) -> Self {
        Self {
            sequence: AtomicU64::new(sequence),
            value: UnsafeCell::new(None),
        }
    }

    /// Store `value`, returning whatever the cell held.
    ///
    /// # Safety
    ///
    /// The caller must own the slot through the sequence protocol: no other
    /// thread may access the cell until the sequence is published.
    #[inline]
    pub(crate) unsafe fn replace(&self, value: T) -> Option<T> {
        self.value.with_mut(|cell| (*cell).replace(value))
    }

    /// Move the value out, leaving the cell empty.
    ///
    /// # Safety
    ///
    /// Same as [`Slot::replace`].
    #[inline]
    pub(crate) unsafe fn take(&self) -> Option<T> {
        self.value.with_mut(|cell| (*cell).take())
    }
}

/// Allocate `capacity` slots, sequence `i` for slot `i`.
pub(crate) fn allocate<T>(capacity: usize, sequence: impl Fn(usize) -> u64) -> Box<[Slot<T>]> {
    (0..capacity)
        .map(|i| Slot::new(sequence(i)))
        .collect::<Vec<_>>()
        .into_boxed_slice()
}
