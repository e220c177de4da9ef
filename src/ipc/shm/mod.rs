/*!
 * Shared Memory Module
 * Named byte segments shared between handles of one process
 */

pub mod manager;
mod segment;
pub mod types;

// Re-export public API
pub use manager::ShmManager;
pub use types::{ShmHandle, ShmStats};
