/*!
 * IPC Types
 * Common types for message queues and shared memory
 */

use crate::memory::MemoryError;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// IPC operation result
pub type IpcResult<T> = Result<T, IpcError>;

/// Unified IPC error type with miette diagnostics
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum IpcError {
    /// Resource not found
    #[error("IPC resource not found: {0}")]
    #[diagnostic(
        code(ipc::not_found),
        help("The queue or segment does not exist or has already been closed.")
    )]
    NotFound(String),

    /// Named resource already exists
    #[error("IPC resource already exists: {0}")]
    #[diagnostic(code(ipc::already_exists))]
    AlreadyExists(String),

    /// Invalid operation or argument
    #[error("Invalid IPC operation: {0}")]
    #[diagnostic(code(ipc::invalid_operation))]
    InvalidOperation(String),

    /// Resource limit exceeded
    #[error("IPC resource limit exceeded: {0}")]
    #[diagnostic(code(ipc::limit_exceeded))]
    LimitExceeded(String),

    /// Queue has no room for another message
    #[error("Queue {queue} full ({capacity} messages)")]
    #[diagnostic(
        code(ipc::queue_full),
        help("The receiver is not keeping up. Retry later or create the queue with more capacity.")
    )]
    QueueFull { queue: QueueId, capacity: usize },

    /// Resource closed
    #[error("IPC resource closed: {0}")]
    #[diagnostic(code(ipc::closed))]
    Closed(String),

    /// Operation timed out
    #[error("IPC operation timed out after {elapsed_ms}ms (timeout: {timeout_ms}ms)")]
    #[diagnostic(code(ipc::timeout))]
    Timeout { elapsed_ms: u64, timeout_ms: u64 },

    /// Invalid segment size
    #[error("Invalid size: {0}")]
    #[diagnostic(code(ipc::invalid_size))]
    InvalidSize(String),

    /// Invalid offset or size range
    #[error("Invalid offset or size: offset {offset}, size {size}, segment size {segment_size}")]
    #[diagnostic(code(ipc::invalid_range))]
    InvalidRange {
        offset: usize,
        size: usize,
        segment_size: usize,
    },

    /// Message storage could not be obtained from the block allocator
    #[error(transparent)]
    #[diagnostic(transparent)]
    Memory(#[from] MemoryError),
}

/// Queue identifier
pub type QueueId = u32;

/// Shared memory segment identifier
pub type ShmId = u32;
