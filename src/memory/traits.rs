/*!
 * Memory Traits
 * Allocator abstractions
 */

use super::types::*;
use crate::core::types::Size;

/// Block allocator interface
pub trait BlockAllocate: Send + Sync {
    /// Allocate a block of at least `size` bytes
    fn allocate(&self, size: Size) -> MemoryResult<BlockHandle>;

    /// Return a block
    fn deallocate(&self, handle: BlockHandle) -> MemoryResult<()>;

    /// Check if a handle refers to a live block
    fn is_valid(&self, handle: BlockHandle) -> bool;

    /// Payload size of a live block
    fn block_size(&self, handle: BlockHandle) -> Option<Size>;
}

/// Usage and statistics provider
pub trait UsageInfo: Send + Sync {
    /// Allocated/free bytes and per-class free counts
    fn usage(&self) -> MemoryResult<MemoryUsage>;

    /// Cumulative counters
    fn stats(&self) -> MemoryResult<AllocatorStats>;

    /// Get memory pressure level
    fn pressure(&self) -> MemoryResult<MemoryPressure>;
}
