//! Linked Queue Implementation
//!
//! Singly-linked queue of owned text values. The chain is held through raw
//! links from `head` to `tail`, so both ends accept inserts in constant time.
//! A node is boxed only while it is being built or reclaimed; while linked,
//! the queue owns it and no `Box` to it exists.

use std::fmt;
use std::iter;
use std::marker::PhantomData;
use std::mem;
use std::ptr;
use std::sync::Arc;

use log::{debug, trace};

use crate::queue::allocator::{Allocator, SystemAllocator};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::node::{Link, Node};
use crate::queue::sort::merge_sort;

/// Bytes charged for the queue container
const CONTAINER_BLOCK: usize = mem::size_of::<Queue>();

/// Singly-linked queue of text values
///
/// Invariants: every node reachable from `head` was produced by
/// `Node::into_link` and belongs to this queue alone, `tail` is the last of
/// them, and `size` counts them.
pub struct Queue {
    head: Link,
    tail: Link,
    size: usize,
    allocator: Arc<dyn Allocator>,
    _owns: PhantomData<Box<Node>>,
}

impl Queue {
    /// Create an empty queue backed by the system allocator
    pub fn new() -> Self {
        Self::unaccounted(Arc::new(SystemAllocator))
    }

    /// Create an empty queue whose storage is charged to `allocator`
    pub fn with_allocator(allocator: Arc<dyn Allocator>) -> QueueResult<Self> {
        if !allocator.allocate(CONTAINER_BLOCK) {
            debug!("Queue container allocation refused");
            return Err(QueueError::allocation_failed(CONTAINER_BLOCK));
        }
        Ok(Self::unaccounted(allocator))
    }

    // No container charge is made here.
    fn unaccounted(allocator: Arc<dyn Allocator>) -> Self {
        Self {
            head: None,
            tail: None,
            size: 0,
            allocator,
            _owns: PhantomData,
        }
    }

    /// Insert a copy of `text` at the front
    pub fn insert_head(&mut self, text: &str) -> QueueResult<()> {
        let mut node = self.allocate_node(text)?;
        node.next = self.head;

        let node = node.into_link();
        if self.tail.is_none() {
            self.tail = Some(node);
        }
        self.head = Some(node);
        self.size += 1;

        trace!("Inserted {} bytes at head (size {})", text.len(), self.size);
        Ok(())
    }

    /// Insert a copy of `text` at the back
    pub fn insert_tail(&mut self, text: &str) -> QueueResult<()> {
        let node = self.allocate_node(text)?.into_link();

        match self.tail {
            // SAFETY: `tail` is the last node of this queue's chain and
            // `&mut self` rules out any outstanding borrow of it.
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
        self.size += 1;

        trace!("Inserted {} bytes at tail (size {})", text.len(), self.size);
        Ok(())
    }

    /// Remove the head, copying its value into `buffer`.
    ///
    /// At most `buffer.len() - 1` bytes are copied and the rest of the buffer
    /// is zeroed, so the result is always NUL-terminated. Truncation is
    /// silent. An empty queue is reported before a missing buffer, and
    /// nothing is written or removed on failure.
    pub fn remove_head(&mut self, buffer: Option<&mut [u8]>) -> QueueResult<()> {
        if self.head.is_none() {
            return Err(QueueError::EmptyQueue);
        }
        let buffer = match buffer {
            Some(buffer) if !buffer.is_empty() => buffer,
            _ => return Err(QueueError::MissingBuffer),
        };
        let node = self.unlink_head()?;

        let bytes = node.value.as_bytes();
        let copied = bytes.len().min(buffer.len() - 1);
        buffer[..copied].copy_from_slice(&bytes[..copied]);
        buffer[copied..].fill(0);

        node.release(self.allocator.as_ref());
        Ok(())
    }

    /// Remove the head and hand back its value
    pub fn pop_head(&mut self) -> QueueResult<String> {
        let node = self.unlink_head()?;
        Ok(node.into_value(self.allocator.as_ref()))
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the queue holds no elements
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Value at the front, if any
    pub fn peek_head(&self) -> Option<&str> {
        self.nodes().next().map(Node::value)
    }

    /// Value at the back, if any
    pub fn peek_tail(&self) -> Option<&str> {
        // SAFETY: `tail` is a live node of this queue's chain and the
        // returned borrow is tied to `&self`.
        self.tail.map(|tail| unsafe { tail.as_ref() }.value())
    }

    /// Snapshot of the values from head to tail
    pub fn values(&self) -> Vec<&str> {
        let mut values = Vec::with_capacity(self.size);
        values.extend(self.nodes().map(Node::value));
        values
    }

    /// Reverse the chain in place
    pub fn reverse(&mut self) {
        let mut previous: Link = None;
        let mut current = self.head;

        while let Some(node) = current {
            // SAFETY: each node belongs to this queue's chain and `&mut self`
            // rules out any outstanding borrow of it.
            unsafe {
                current = (*node.as_ptr()).next;
                (*node.as_ptr()).next = previous;
            }
            previous = Some(node);
        }

        // The old head ends up last.
        self.tail = self.head;
        self.head = previous;

        trace!("Reversed {} elements", self.size);
    }

    /// Stable ascending sort by byte-wise comparison, relinking in place
    pub fn sort(&mut self) {
        if self.size < 2 {
            return;
        }

        // SAFETY: the chain from `head` is owned by this queue alone, and
        // `&mut self` rules out any outstanding borrow of its nodes.
        unsafe {
            self.head = merge_sort(self.head.take());
            self.tail = last_node(self.head);
        }

        trace!("Sorted {} elements", self.size);
    }

    /// Walk the chain and report the first broken structural invariant
    pub fn check_invariants(&self) -> QueueResult<()> {
        let mut reachable = 0usize;
        let mut last: Option<&Node> = None;

        for node in self.nodes() {
            reachable += 1;
            if reachable > self.size {
                return Err(QueueError::invariant_violation(format!(
                    "more than {} nodes reachable from head",
                    self.size
                )));
            }
            last = Some(node);
        }

        if reachable != self.size {
            return Err(QueueError::invariant_violation(format!(
                "size is {} but {} nodes are reachable",
                self.size, reachable
            )));
        }

        let tail = self.tail.map(|tail| tail.as_ptr() as *const Node);
        match (last, tail) {
            (None, None) => Ok(()),
            (Some(last), Some(tail)) if ptr::eq(last, tail) => Ok(()),
            (None, Some(_)) => Err(QueueError::invariant_violation("tail set on empty queue")),
            (Some(_), None) => Err(QueueError::invariant_violation("tail missing on non-empty queue")),
            (Some(_), Some(_)) => Err(QueueError::invariant_violation("tail is not the last node")),
        }
    }

    /// Nodes from head to tail
    fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        // SAFETY: every link reachable from `head` points at a live node of
        // this queue, and `&self` keeps the chain unchanged while borrowed.
        let first = self.head.map(|node| unsafe { node.as_ref() });
        iter::successors(first, |node| node.next.map(|next| unsafe { next.as_ref() }))
    }

    fn allocate_node(&self, text: &str) -> QueueResult<Box<Node>> {
        Node::allocate(text, self.allocator.as_ref()).map_err(|error| {
            debug!("Insert of {} bytes failed: {}", text.len(), error);
            error
        })
    }

    fn unlink_head(&mut self) -> QueueResult<Box<Node>> {
        let head = self.head.ok_or(QueueError::EmptyQueue)?;

        // SAFETY: `head` came from `into_link` and is still linked here; it
        // is detached below and neither `head` nor `tail` keeps pointing at it.
        let mut node = unsafe { Node::from_link(head) };
        self.head = node.next.take();
        if self.head.is_none() {
            self.tail = None;
        }
        self.size -= 1;
        Ok(node)
    }
}

/// Last node of a chain
///
/// # Safety
///
/// Every node reachable from `link` must be live and not mutably borrowed.
unsafe fn last_node(mut link: Link) -> Link {
    let mut last = None;
    while let Some(node) = link {
        last = Some(node);
        link = (*node.as_ptr()).next;
    }
    last
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        let released = self.size;

        // Unlink one node at a time so long chains never recurse.
        while let Ok(node) = self.unlink_head() {
            node.release(self.allocator.as_ref());
        }

        self.allocator.deallocate(CONTAINER_BLOCK);
        trace!("Released queue with {} elements", released);
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("size", &self.size)
            .field("values", &self.values())
            .finish()
    }
}
