//! Scheduling jitter for concurrency tests.
//!
//! Lock-free bugs hide in rare interleavings. `Jitter` randomly spins, yields
//! or sleeps between ring operations so producers and consumers get preempted
//! at different points on every run.

use rand::Rng;
use std::time::Duration;

/// What a call to [`Jitter::maybe_stall`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterEvent {
    None,
    Spin(u32),
    Yield,
    Sleep(Duration),
}

/// Random stalls between operations.
///
/// ```
/// use ringcache_test_support::chaos::Jitter;
///
/// let mut jitter = Jitter::mild();
/// for _ in 0..10 {
///     jitter.maybe_stall();
/// }
/// ```
pub struct Jitter {
    spin_probability: f64,
    yield_probability: f64,
    sleep_probability: f64,
    max_spins: u32,
    max_sleep_us: u64,
    rng: rand::rngs::ThreadRng,
    events_triggered: usize,
}

impl Default for Jitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Jitter {
    /// No stalls until probabilities are set.
    pub fn new() -> Self {
        Self {
            spin_probability: 0.0,
            yield_probability: 0.0,
            sleep_probability: 0.0,
            max_spins: 256,
            max_sleep_us: 50,
            rng: rand::thread_rng(),
            events_triggered: 0,
        }
    }

    pub fn mild() -> Self {
        Self::new()
            .with_spin_probability(0.05)
            .with_yield_probability(0.01)
    }

    pub fn aggressive() -> Self {
        Self::new()
            .with_spin_probability(0.2)
            .with_yield_probability(0.1)
            .with_sleep_probability(0.001)
    }

    pub fn with_spin_probability(mut self, prob: f64) -> Self {
        self.spin_probability = prob.clamp(0.0, 1.0);
        self
    }

    pub fn with_yield_probability(mut self, prob: f64) -> Self {
        self.yield_probability = prob.clamp(0.0, 1.0);
        self
    }

    pub fn with_sleep_probability(mut self, prob: f64) -> Self {
        self.sleep_probability = prob.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_sleep(mut self, max: Duration) -> Self {
        self.max_sleep_us = max.as_micros().max(1) as u64;
        self
    }

    /// Maybe stall the current thread. At most one kind of stall per call.
    pub fn maybe_stall(&mut self) -> JitterEvent {
        let roll = self.rng.gen::<f64>();
        let event = if roll < self.sleep_probability {
            let us = self.rng.gen_range(1..=self.max_sleep_us);
            let pause = Duration::from_micros(us);
            std::thread::sleep(pause);
            JitterEvent::Sleep(pause)
        } else if roll < self.sleep_probability + self.yield_probability {
            std::thread::yield_now();
            JitterEvent::Yield
        } else if roll < self.sleep_probability + self.yield_probability + self.spin_probability {
            let spins = self.rng.gen_range(1..=self.max_spins);
            for _ in 0..spins {
                std::hint::spin_loop();
            }
            JitterEvent::Spin(spins)
        } else {
            JitterEvent::None
        };

        if event != JitterEvent::None {
            self.events_triggered += 1;
        }
        event
    }

    pub fn events_triggered(&self) -> usize {
        self.events_triggered
    }
}
