/*!
 * Queue Module
 * Bounded FIFO message queues with payloads stored in allocator blocks
 */

mod fifo;
pub mod manager;
pub mod types;

// Re-export public API
pub use manager::QueueManager;
pub use types::{QueueMessage, QueueStats};
