/*!
 * IPC Module
 * Named message queues and shared memory segments alongside the block allocator
 */

pub mod queue;
#[cfg(feature = "shm")]
pub mod shm;
pub mod types;

// Re-export for convenience
pub use queue::{QueueManager, QueueStats};
#[cfg(feature = "shm")]
pub use shm::{ShmHandle, ShmManager, ShmStats};
pub use types::*;
