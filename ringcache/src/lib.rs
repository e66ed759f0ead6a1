//! ringcache - bounded ring buffers in four concurrency tiers.
//!
//! | Tier                | Threads                | Full ring          |
//! |---------------------|------------------------|--------------------|
//! | `LocalRingBuffer`   | one owner              | overwrite (config) |
//! | `MutexRingBuffer`   | any, one lock per call | overwrite (config) |
//! | `SpscRingBuffer`    | 1 producer, 1 consumer | overwrite oldest   |
//! | `MpmcRingBuffer`    | any, lock-free         | reject new         |
//!
//! ```rust
//! use ringcache::{MpmcRingBuffer, MutexRingBuffer};
//!
//! let ring = MutexRingBuffer::new(4).unwrap();
//! for i in 0..6 {
//!     let _ = ring.put(i);
//! }
//! assert_eq!(ring.get(), Some(2));
//!
//! let ring = MpmcRingBuffer::new(5).unwrap(); // rounded up to 8
//! assert_eq!(ring.capacity(), 8);
//! ring.put("job").unwrap();
//! assert_eq!(ring.get(), Some("job"));
//! ```

// Tracing macros - no-op when feature disabled
#[cfg(feature = "tracing")]
macro_rules! trace_debug { ($($arg:tt)*) => { tracing::debug!($($arg)*) } }
#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug { ($($arg:tt)*) => {} }

#[cfg(feature = "tracing")]
macro_rules! trace_warn { ($($arg:tt)*) => { tracing::warn!($($arg)*) } }
#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn { ($($arg:tt)*) => {} }

pub mod capacity;
pub mod error;
pub mod padding;
pub mod ring;
mod sync;

// Re-export main components
pub use error::{Full, Result, RingError};
pub use ring::{
    LocalRingBuffer, MpmcRingBuffer, MutexRingBuffer, OverflowPolicy, Put, Ring, RingConfig,
    SpscConsumer, SpscProducer, SpscRingBuffer,
};
