//! Delivery verification: every value sent is received exactly once.
//!
//! Values are `u64` tags carrying the producer id in the high bits and a
//! per-producer sequence in the low bits, so the verifier can also check that
//! each consumer saw any single producer's values in publish order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

const SEQ_BITS: u32 = 40;
const SEQ_MASK: u64 = (1 << SEQ_BITS) - 1;

/// Pack a producer id and its sequence number into one value.
pub fn tag(producer: u32, seq: u64) -> u64 {
    debug_assert!(seq <= SEQ_MASK, "sequence {seq} does not fit in a tag");
    ((producer as u64) << SEQ_BITS) | (seq & SEQ_MASK)
}

/// Inverse of [`tag`].
pub fn untag(value: u64) -> (u32, u64) {
    ((value >> SEQ_BITS) as u32, value & SEQ_MASK)
}

/// Collects what was sent and what each consumer received.
pub struct DeliveryVerifier {
    /// Tags handed to the ring
    expected: Mutex<HashSet<u64>>,
    /// Receive count per tag
    received: Mutex<HashMap<u64, u32>>,
    /// Per-consumer order violations
    out_of_order: AtomicU64,
}

impl Default for DeliveryVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryVerifier {
    pub fn new() -> Self {
        Self {
            expected: Mutex::new(HashSet::new()),
            received: Mutex::new(HashMap::new()),
            out_of_order: AtomicU64::new(0),
        }
    }

    /// Register a value that was successfully put.
    pub fn expect(&self, value: u64) {
        self.expected.lock().insert(value);
    }

    /// Register `count` values `tag(producer, 0..count)`.
    pub fn expect_range(&self, producer: u32, count: u64) {
        let mut expected = self.expected.lock();
        expected.extend((0..count).map(|seq| tag(producer, seq)));
    }

    /// Record everything one consumer received, in the order it got it.
    pub fn record_consumer(&self, values: &[u64]) {
        let mut last_seen: BTreeMap<u32, u64> = BTreeMap::new();
        for &value in values {
            let (producer, seq) = untag(value);
            if let Some(prev) = last_seen.insert(producer, seq) {
                if seq <= prev {
                    self.out_of_order.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let mut received = self.received.lock();
        for &value in values {
            *received.entry(value).or_insert(0) += 1;
        }
    }

    pub fn report(&self) -> DeliveryReport {
        let expected = self.expected.lock();
        let received = self.received.lock();

        let missing = expected
            .iter()
            .filter(|v| !received.contains_key(*v))
            .count() as u64;
        let duplicates = received
            .values()
            .map(|&count| u64::from(count.saturating_sub(1)))
            .sum();
        let unexpected = received.keys().filter(|v| !expected.contains(*v)).count() as u64;

        DeliveryReport {
            sent: expected.len() as u64,
            received: received.values().map(|&c| u64::from(c)).sum(),
            missing,
            duplicates,
            unexpected,
            out_of_order: self.out_of_order.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: u64,
    pub received: u64,
    pub missing: u64,
    pub duplicates: u64,
    pub unexpected: u64,
    pub out_of_order: u64,
}

impl DeliveryReport {
    /// Received multiset equals sent set, in per-producer order.
    pub fn is_exact(&self) -> bool {
        self.sent == self.received
            && self.missing == 0
            && self.duplicates == 0
            && self.unexpected == 0
            && self.out_of_order == 0
    }
}
