//! Cache-line padded cells (prevents false sharing).
//!
//! Producers hammer `tail`, consumers hammer `head`. Each counter gets a full
//! 128-byte block: two 64-byte lines, because the adjacent-line prefetcher on
//! x86 pulls lines in pairs.

use std::fmt;
use std::ops::{Deref, DerefMut};

/// Bytes reserved per padded value.
pub const CACHE_LINE_PAD: usize = 128;

#[repr(align(128))]
#[derive(Default)]
pub struct CachePadded<T>(T);

impl<T> CachePadded<T> {
    pub const fn new(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    #[inline(always)]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for CachePadded<T> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for CachePadded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    struct Counters {
        head: CachePadded<AtomicU64>,
        tail: CachePadded<AtomicU64>,
    }

    #[test]
    fn test_padded_layout() {
        assert_eq!(std::mem::align_of::<CachePadded<u8>>(), CACHE_LINE_PAD);
        assert_eq!(std::mem::size_of::<CachePadded<AtomicU64>>(), CACHE_LINE_PAD);

        let counters = Counters {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
        };
        let head = &*counters.head as *const AtomicU64 as usize;
        let tail = &*counters.tail as *const AtomicU64 as usize;
        assert!(head.abs_diff(tail) >= CACHE_LINE_PAD);
    }

    #[test]
    fn test_deref() {
        let mut padded = CachePadded::new(7u32);
        *padded += 1;
        assert_eq!(*padded, 8);
        assert_eq!(padded.into_inner(), 8);
    }
}
