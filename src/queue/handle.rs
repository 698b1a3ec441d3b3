//! Handle-level operations
//!
//! Free functions over an optional queue. `None` stands for an absent queue
//! handle: mutating operations report [`QueueError::InvalidHandle`], queries
//! answer as if the queue were empty, and destroy does nothing.

use std::borrow::Cow;
use std::sync::Arc;

use crate::queue::allocator::Allocator;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::list::Queue;

/// Create an empty queue charged to `allocator`
pub fn create(allocator: Arc<dyn Allocator>) -> QueueResult<Queue> {
    Queue::with_allocator(allocator)
}

/// Release every node, its value, and finally the queue itself
pub fn destroy(queue: Option<Queue>) {
    drop(queue);
}

pub fn insert_head(queue: Option<&mut Queue>, text: &str) -> QueueResult<()> {
    queue.ok_or(QueueError::InvalidHandle)?.insert_head(text)
}

pub fn insert_tail(queue: Option<&mut Queue>, text: &str) -> QueueResult<()> {
    queue.ok_or(QueueError::InvalidHandle)?.insert_tail(text)
}

/// Remove the head into `buffer`; see [`Queue::remove_head`]
pub fn remove_head(queue: Option<&mut Queue>, buffer: Option<&mut [u8]>) -> QueueResult<()> {
    queue.ok_or(QueueError::InvalidHandle)?.remove_head(buffer)
}

pub fn size(queue: Option<&Queue>) -> usize {
    queue.map_or(0, Queue::size)
}

pub fn reverse(queue: Option<&mut Queue>) {
    if let Some(queue) = queue {
        queue.reverse();
    }
}

pub fn sort(queue: Option<&mut Queue>) {
    if let Some(queue) = queue {
        queue.sort();
    }
}

/// Text written into a removal buffer, up to its NUL terminator
pub fn buffer_text(buffer: &[u8]) -> Cow<'_, str> {
    let end = buffer.iter().position(|byte| *byte == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end])
}
