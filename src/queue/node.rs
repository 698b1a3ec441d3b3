//! Chain links
//!
//! A [`Node`] owns its text value and links to the rest of the chain through
//! a raw `next` pointer. Once linked, a node is owned by the chain rather
//! than a `Box`; nodes are boxed only while being built or reclaimed. Nodes are only
//! created and released by the queue so that every block is accounted for
//! with its [`Allocator`].

use std::mem;
use std::ptr::NonNull;

use crate::queue::allocator::Allocator;
use crate::queue::error::{QueueError, QueueResult};

/// Link to the next node, `None` at the end of the chain
pub(crate) type Link = Option<NonNull<Node>>;

/// Bytes charged for the node block itself
pub(crate) const NODE_BLOCK: usize = mem::size_of::<Node>();

/// Single element of the chain
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) value: String,
    pub(crate) next: Link,
}

impl Node {
    /// Build a detached node holding an independent copy of `text`.
    ///
    /// The node block and the value block are requested separately; if the
    /// value is refused the node block is handed back before failing.
    pub(crate) fn allocate(text: &str, allocator: &dyn Allocator) -> QueueResult<Box<Node>> {
        if !allocator.allocate(NODE_BLOCK) {
            return Err(QueueError::allocation_failed(NODE_BLOCK));
        }

        let value = match copy_text(text, allocator) {
            Ok(value) => value,
            Err(error) => {
                allocator.deallocate(NODE_BLOCK);
                return Err(error);
            }
        };

        Ok(Box::new(Node { value, next: None }))
    }

    /// Give up the box; the node is now owned by whichever chain links it
    pub(crate) fn into_link(self: Box<Self>) -> NonNull<Node> {
        // SAFETY: `Box::into_raw` never returns null.
        unsafe { NonNull::new_unchecked(Box::into_raw(self)) }
    }

    /// Take back ownership of a node handed out by [`Node::into_link`].
    ///
    /// # Safety
    ///
    /// `node` must come from `into_link`, must not have been reclaimed
    /// already, and no other pointer to it may be used afterwards.
    pub(crate) unsafe fn from_link(node: NonNull<Node>) -> Box<Node> {
        Box::from_raw(node.as_ptr())
    }

    /// Release this node's value and then the node itself.
    ///
    /// The caller must already have detached `next`.
    pub(crate) fn release(self: Box<Self>, allocator: &dyn Allocator) {
        drop(self.into_value(allocator));
    }

    /// Release the node and hand its value to the caller. The value block is
    /// credited back to the allocator since the queue no longer owns it.
    pub(crate) fn into_value(self: Box<Self>, allocator: &dyn Allocator) -> String {
        let Node { value, next } = *self;
        debug_assert!(next.is_none());
        allocator.deallocate(value_block(&value));
        allocator.deallocate(NODE_BLOCK);
        value
    }

    /// Stored text
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Bytes charged for a value: the text plus its terminator
fn value_block(value: &str) -> usize {
    value.len() + 1
}

fn copy_text(text: &str, allocator: &dyn Allocator) -> QueueResult<String> {
    let bytes = value_block(text);
    if !allocator.allocate(bytes) {
        return Err(QueueError::allocation_failed(bytes));
    }

    let mut value = String::new();
    if value.try_reserve_exact(text.len()).is_err() {
        allocator.deallocate(bytes);
        return Err(QueueError::allocation_failed(bytes));
    }
    value.push_str(text);
    Ok(value)
}
