//! Capacity normalization.
//!
//! The lock-free rings index with `position & mask`, which only works when the
//! slot count is a power of two. `normalize` rounds a request up; callers that
//! must not be silently resized use `require_power_of_two` instead.

use crate::error::{RingError, Result};

/// Smallest power of two `>= requested`.
pub fn normalize(requested: usize) -> Result<usize> {
    if requested == 0 {
        return Err(RingError::config("capacity must be greater than 0"));
    }
    requested.checked_next_power_of_two().ok_or_else(|| {
        RingError::config(format!(
            "capacity {requested} cannot be rounded up to a power of 2"
        ))
    })
}

/// Accept `capacity` only if it already is a power of two.
pub fn require_power_of_two(capacity: usize) -> Result<usize> {
    if capacity == 0 {
        return Err(RingError::config("capacity must be greater than 0"));
    }
    if !capacity.is_power_of_two() {
        return Err(RingError::config(format!(
            "capacity {capacity} must be a power of 2"
        )));
    }
    Ok(capacity)
}

/// Accept any non-zero capacity (modulo-indexed tiers).
pub(crate) fn require_positive(capacity: usize) -> Result<usize> {
    if capacity == 0 {
        return Err(RingError::config("capacity must be greater than 0"));
    }
    Ok(capacity)
}
