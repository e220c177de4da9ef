/*!
 * Queue Types
 * Message metadata and queue statistics
 */

use crate::ipc::types::QueueId;
use crate::memory::BlockHandle;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Queued message; the payload lives in an allocator block
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub id: u64,
    pub len: usize,
    pub(crate) block: BlockHandle,
    pub enqueued_at: Instant,
}

/// Queue statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub id: QueueId,
    pub name: String,
    pub capacity: usize,
    pub max_length: usize,
    pub length: usize,
    pub sent: u64,
    pub received: u64,
}
