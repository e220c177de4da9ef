/*!
 * VOS Memory Library
 * Block-segregated region allocator with message queues and shared memory
 */

pub mod core;
pub mod ipc;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use crate::core::{AllocatorConfig, ConfigError};
pub use ipc::{IpcError, IpcResult, QueueId, QueueManager, QueueStats};
#[cfg(feature = "shm")]
pub use ipc::{ShmHandle, ShmManager, ShmStats};
pub use memory::{
    AllocatorStats, BlockAllocate, BlockAllocator, BlockGuard, BlockHandle, ErrorKind, InitError,
    MemoryError, MemoryPressure, MemoryResult, MemoryUsage, PreallocationPlan, RegionId,
    SizeClass, UsageInfo,
};
pub use monitoring::{init_tracing, span_operation};
