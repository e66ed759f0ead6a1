//! Error types for ringcache.

use std::fmt;

/// Result type for ringcache constructors.
pub type Result<T> = std::result::Result<T, RingError>;

/// Errors raised while building a ring buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// The requested capacity cannot back a ring of this tier.
    #[error("invalid ring configuration: {0}")]
    Config(String),
}

impl RingError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// A value refused by a reject-on-full ring.
///
/// The buffer never keeps a value it did not accept, so the caller gets it back
/// and decides whether to retry, drop it or push back upstream.
#[derive(Clone, PartialEq, Eq, thiserror::Error)]
#[error("ring buffer is full")]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Take back the rejected value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

// Manual impl so `Full<T>` is debuggable for any `T`.
impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Full").finish_non_exhaustive()
    }
}
