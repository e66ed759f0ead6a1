//! Test helpers for ringcache: delivery verification and scheduling jitter.

pub mod chaos;
pub mod verify;

pub use chaos::{Jitter, JitterEvent};
pub use verify::{tag, untag, DeliveryReport, DeliveryVerifier};
