//! std/loom switch for the lock-free tiers.
//!
//! Built with `RUSTFLAGS="--cfg loom"` the atomics, `Arc`, `UnsafeCell` and
//! thread yield come from loom so the model checker sees every access.

#[cfg(not(loom))]
pub(crate) mod atomic {
    pub(crate) use std::sync::atomic::{AtomicU64, Ordering};
}

#[cfg(loom)]
pub(crate) mod atomic {
    pub(crate) use loom::sync::atomic::{AtomicU64, Ordering};
}

#[cfg(not(loom))]
pub(crate) use std::sync::Arc;

#[cfg(loom)]
pub(crate) use loom::sync::Arc;

#[cfg(loom)]
pub(crate) use loom::cell::UnsafeCell;

/// `std::cell::UnsafeCell` behind loom's closure API.
#[cfg(not(loom))]
#[derive(Debug)]
pub(crate) struct UnsafeCell<T>(std::cell::UnsafeCell<T>);

#[cfg(not(loom))]
impl<T> UnsafeCell<T> {
    pub(crate) fn new(value: T) -> Self {
        Self(std::cell::UnsafeCell::new(value))
    }

    #[inline(always)]
    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
        f(self.0.get())
    }
}

/// Retry pacing for CAS loops: a few rounds of `spin_loop`, then yield the
/// processor to whoever holds the contended position.
pub(crate) struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;

    pub(crate) fn new() -> Self {
        Self { step: 0 }
    }

    #[cfg(not(loom))]
    #[inline]
    pub(crate) fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..1u32 << self.step {
                std::hint::spin_loop();
            }
            self.step += 1;
        } else {
            std::thread::yield_now();
        }
    }

    // Loom explores every interleaving; a spin would never let the other thread run.
    #[cfg(loom)]
    #[inline]
    pub(crate) fn snooze(&mut self) {
        self.step = self.step.saturating_add(1);
        loom::thread::yield_now();
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_unsafe_cell_with_mut() {
        let cell = UnsafeCell::new(Some(3u32));
        let taken = cell.with_mut(|p| unsafe { (*p).take() });
        assert_eq!(taken, Some(3));
        assert_eq!(cell.with_mut(|p| unsafe { *p }), None);
    }

    #[test]
    fn test_backoff_escalates() {
        let mut backoff = Backoff::new();
        for _ in 0..Backoff::SPIN_LIMIT + 3 {
            backoff.snooze();
        }
        assert_eq!(backoff.step, Backoff::SPIN_LIMIT + 1);
    }
}
