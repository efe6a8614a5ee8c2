//! Atomic helpers for statistics and counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing event counter.
#[derive(Debug, Default)]
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create a new counter.
    pub const fn new(initial: u64) -> Self {
        Self(AtomicU64::new(initial))
    }

    /// Increment the counter.
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge that can go up or down and remembers its high-water mark.
#[derive(Debug, Default)]
pub struct PeakGauge {
    current: AtomicU64,
    peak: AtomicU64,
}

impl PeakGauge {
    /// Create a new gauge at zero.
    pub const fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
            peak: AtomicU64::new(0),
        }
    }

    /// Add to the gauge, returning the new value.
    pub fn add(&self, value: u64) -> u64 {
        let now = self.current.fetch_add(value, Ordering::AcqRel) + value;
        self.peak.fetch_max(now, Ordering::Relaxed);
        now
    }

    /// Subtract from the gauge, returning the new value.
    pub fn sub(&self, value: u64) -> u64 {
        let prev = self.current.fetch_sub(value, Ordering::AcqRel);
        debug_assert!(prev >= value, "gauge underflow: {} - {}", prev, value);
        prev - value
    }

    /// Get the current value.
    pub fn get(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Get the high-water mark.
    pub fn peak(&self) -> u64 {
        self.peak.load(Ordering::Relaxed)
    }
}
