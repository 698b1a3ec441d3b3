//! Allocation Accounting
//!
//! Every node, value copy and queue container is requested from an
//! [`Allocator`] before it is built. Refusal surfaces as
//! [`QueueError::AllocationFailed`](crate::queue::QueueError) at the call
//! site, which lets tests drive the failure paths deterministically.

use std::sync::atomic::{AtomicU8, Ordering};

use log::trace;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::queue::memory_tracker::MemoryTracker;

/// Storage accounting seam used by [`Queue`](crate::queue::Queue)
pub trait Allocator: Send + Sync {
    /// Request one block of `bytes`; `false` means the block is refused
    fn allocate(&self, bytes: usize) -> bool;

    /// Return one previously granted block of `bytes`
    fn deallocate(&self, bytes: usize);
}

/// Allocator that grants every request without bookkeeping
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn allocate(&self, _bytes: usize) -> bool {
        true
    }

    fn deallocate(&self, _bytes: usize) {}
}

impl Allocator for MemoryTracker {
    fn allocate(&self, bytes: usize) -> bool {
        MemoryTracker::allocate(self, bytes)
    }

    fn deallocate(&self, bytes: usize) {
        MemoryTracker::deallocate(self, bytes)
    }
}

/// Tracked allocator that randomly refuses a percentage of requests
#[derive(Debug)]
pub struct FaultInjector {
    tracker: MemoryTracker,
    failure_percent: AtomicU8,
    rng: Mutex<StdRng>,
}

impl FaultInjector {
    /// Create an injector over a byte budget, seeded for reproducible runs
    pub fn new(memory_limit: usize, failure_percent: u8, seed: u64) -> Self {
        Self {
            tracker: MemoryTracker::new(memory_limit),
            failure_percent: AtomicU8::new(failure_percent.min(100)),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Create an injector that never refuses, used for leak accounting only
    pub fn tracking_only() -> Self {
        Self::new(usize::MAX, 0, 0)
    }

    /// Underlying byte and block counters
    pub fn tracker(&self) -> &MemoryTracker {
        &self.tracker
    }

    /// Current probability, in percent, that a request is refused
    pub fn failure_percent(&self) -> u8 {
        self.failure_percent.load(Ordering::Relaxed)
    }

    /// Change the refusal probability; values above 100 are clamped
    pub fn set_failure_percent(&self, percent: u8) {
        self.failure_percent.store(percent.min(100), Ordering::Relaxed);
    }

    fn should_fail(&self) -> bool {
        match self.failure_percent() {
            0 => false,
            100.. => true,
            percent => self.rng.lock().gen_range(0..100u8) < percent,
        }
    }
}

impl Allocator for FaultInjector {
    fn allocate(&self, bytes: usize) -> bool {
        if self.should_fail() {
            trace!("Injected allocation failure for {} bytes", bytes);
            return false;
        }
        self.tracker.allocate(bytes)
    }

    fn deallocate(&self, bytes: usize) {
        self.tracker.deallocate(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_allocator_always_grants() {
        let allocator = SystemAllocator;
        assert!(allocator.allocate(usize::MAX));
        allocator.deallocate(usize::MAX);
    }

    #[test]
    fn test_fault_injector_extremes() {
        let never = FaultInjector::new(1024, 0, 7);
        assert!((0..100).all(|_| {
            let granted = Allocator::allocate(&never, 1);
            Allocator::deallocate(&never, 1);
            granted
        }));

        let always = FaultInjector::new(1024, 100, 7);
        assert!((0..100).all(|_| !Allocator::allocate(&always, 1)));
        assert_eq!(always.tracker().allocated_blocks(), 0);
    }

    #[test]
    fn test_fault_injector_is_reproducible() {
        let run = |seed| {
            let injector = FaultInjector::new(usize::MAX, 50, seed);
            (0..64)
                .map(|_| Allocator::allocate(&injector, 8))
                .collect::<Vec<_>>()
        };

        let first = run(42);
        assert_eq!(first, run(42));
        assert!(first.iter().any(|granted| *granted));
        assert!(first.iter().any(|granted| !*granted));
    }

    #[test]
    fn test_fault_injector_respects_memory_limit() {
        let injector = FaultInjector::new(16, 0, 1);
        assert!(Allocator::allocate(&injector, 16));
        assert!(!Allocator::allocate(&injector, 1));

        injector.set_failure_percent(250);
        assert_eq!(injector.failure_percent(), 100);
    }
}
