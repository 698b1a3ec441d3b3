//! Memory Tracking and Monitoring
//!
//! Byte budget with live-byte and live-block counters. Every block a queue
//! obtains is charged here and every release is credited back, so a queue
//! that has been destroyed must leave both counters at zero.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Memory usage tracker for queue allocations
#[derive(Debug)]
pub struct MemoryTracker {
    allocated_bytes: AtomicUsize,
    allocated_blocks: AtomicUsize,
    peak_bytes: AtomicUsize,
    max_bytes: usize,
}

impl MemoryTracker {
    /// Create a new memory tracker with specified limit
    pub fn new(max_bytes: usize) -> Self {
        Self {
            allocated_bytes: AtomicUsize::new(0),
            allocated_blocks: AtomicUsize::new(0),
            peak_bytes: AtomicUsize::new(0),
            max_bytes,
        }
    }

    /// Create a tracker that only counts and never refuses
    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    /// Track allocation of one block of the specified size
    pub fn allocate(&self, bytes: usize) -> bool {
        let granted = self
            .allocated_bytes
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current
                    .checked_add(bytes)
                    .filter(|total| *total <= self.max_bytes)
            });

        match granted {
            Ok(previous) => {
                self.allocated_blocks.fetch_add(1, Ordering::Relaxed);
                self.peak_bytes.fetch_max(previous + bytes, Ordering::Relaxed);
                true
            }
            Err(_) => false, // Would exceed limit
        }
    }

    /// Track release of one block of the specified size
    pub fn deallocate(&self, bytes: usize) {
        let _ = self
            .allocated_bytes
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(bytes))
            });
        let _ = self
            .allocated_blocks
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(1))
            });
    }

    /// Get current allocated bytes
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes.load(Ordering::Relaxed)
    }

    /// Get number of blocks currently live
    pub fn allocated_blocks(&self) -> usize {
        self.allocated_blocks.load(Ordering::Relaxed)
    }

    /// Highest byte count seen since creation
    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes.load(Ordering::Relaxed)
    }

    /// Configured byte budget
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Whether a byte budget is being enforced
    pub fn is_bounded(&self) -> bool {
        self.max_bytes != usize::MAX
    }

    /// Get memory usage as percentage
    pub fn usage_percent(&self) -> f64 {
        (self.allocated_bytes() as f64 / self.max_bytes as f64) * 100.0
    }

    /// Check if memory usage exceeds threshold
    pub fn exceeds_threshold(&self, threshold_percent: f64) -> bool {
        self.usage_percent() > threshold_percent
    }
}
