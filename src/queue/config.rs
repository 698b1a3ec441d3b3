//! Allocator Configuration Module
//!
//! Provides configuration structures and presets for the allocator that
//! backs interpreter queues. Values are read from TOML by the
//! [`ConfigManager`](crate::config::ConfigManager).

use crate::queue::allocator::FaultInjector;

/// Main allocator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AllocatorConfig {
    /// Byte budget shared by every queue on the allocator (unbounded if unset)
    pub memory_limit: Option<usize>,

    /// Percentage of allocation requests to refuse (0-100)
    pub fail_percent: u8,

    /// Seed for the refusal RNG
    pub seed: u64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            memory_limit: None,
            fail_percent: 0,
            seed: 0x5eed,
        }
    }
}

impl AllocatorConfig {
    /// Build the fault injector described by this configuration
    pub fn build(&self) -> FaultInjector {
        FaultInjector::new(
            self.memory_limit.unwrap_or(usize::MAX),
            self.fail_percent,
            self.seed,
        )
    }
}

/// Allocator configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocatorPreset {
    /// Never refuses, only counts
    Unlimited,
    /// Small byte budget, no random refusals
    Constrained,
    /// Refuses a share of requests at random
    FaultInjecting,
}

impl AllocatorPreset {
    /// Get allocator configuration for this preset
    pub fn config(self) -> AllocatorConfig {
        match self {
            AllocatorPreset::Unlimited => AllocatorConfig::default(),

            AllocatorPreset::Constrained => AllocatorConfig {
                memory_limit: Some(64 * 1024), // 64KB
                ..Default::default()
            },

            AllocatorPreset::FaultInjecting => AllocatorConfig {
                fail_percent: 10,
                ..Default::default()
            },
        }
    }
}

impl std::str::FromStr for AllocatorPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unlimited" => Ok(AllocatorPreset::Unlimited),
            "constrained" => Ok(AllocatorPreset::Constrained),
            "fault-injecting" | "faulty" => Ok(AllocatorPreset::FaultInjecting),
            _ => Err(format!(
                "Invalid allocator preset: {}. Valid options: unlimited, constrained, fault-injecting",
                s
            )),
        }
    }
}
