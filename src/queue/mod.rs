//! Linked Text Queue
//!
//! A singly-linked queue of owned text values with insertion at both ends,
//! removal from the head, in-place reversal and an in-place stable merge
//! sort that only relinks existing nodes.
//!
//! # Architecture
//!
//! - **Queue**: owns the chain through raw links to its head and tail nodes
//! - **Node**: owns one value and links to the next node
//! - **Allocator**: accounting seam charged for every node, value and
//!   container, so refused storage is reported as an error instead of an
//!   abort
//! - **handle**: the same operations over an optional queue, where `None`
//!   stands for an absent handle
//!
//! # Usage
//!
//! ```rust
//! use textq::queue::{handle, Queue};
//!
//! let mut queue = Queue::new();
//! queue.insert_tail("banana").unwrap();
//! queue.insert_tail("apple").unwrap();
//! queue.insert_head("cherry").unwrap();
//!
//! queue.sort();
//! assert_eq!(queue.values(), ["apple", "banana", "cherry"]);
//!
//! let mut buffer = [0u8; 4];
//! queue.remove_head(Some(&mut buffer)).unwrap();
//! assert_eq!(handle::buffer_text(&buffer), "app");
//! assert_eq!(queue.size(), 2);
//! ```

pub mod allocator;
pub mod config;
pub mod error;
pub mod handle;
pub mod list;
pub mod memory_tracker;
mod node;
mod sort;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use allocator::{Allocator, FaultInjector, SystemAllocator};
pub use config::{AllocatorConfig, AllocatorPreset};
pub use error::{QueueError, QueueResult};
pub use list::Queue;
pub use memory_tracker::MemoryTracker;
