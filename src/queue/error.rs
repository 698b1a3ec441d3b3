//! Queue Error Types
//!
//! Defines error types specific to the queue operations. Every variant is
//! recoverable and every failing operation leaves the queue unmodified.

use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur during queue operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Operation was invoked without a live queue
    #[error("Queue handle is absent")]
    InvalidHandle,

    /// Removal from a queue that holds no elements
    #[error("Queue is empty")]
    EmptyQueue,

    /// Node, value or container storage could not be obtained
    #[error("Allocation of {bytes} bytes failed")]
    AllocationFailed { bytes: usize },

    /// Removal was asked to copy the value out but no usable buffer was given
    #[error("No output buffer supplied for removed value")]
    MissingBuffer,

    /// Structural check found a broken head/tail/size relationship
    #[error("Queue invariant violated: {message}")]
    InvariantViolation { message: String },
}

impl QueueError {
    /// Create an allocation failure error
    pub fn allocation_failed(bytes: usize) -> Self {
        Self::AllocationFailed { bytes }
    }

    /// Create an invariant violation error
    pub fn invariant_violation(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Whether this error came from the allocator refusing storage
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }
}
