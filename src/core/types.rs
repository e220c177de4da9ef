/*!
 * Core Types
 * Common types used across the allocator and its IPC siblings
 */

/// Byte offset inside a managed region
pub type Offset = usize;

/// Size type for memory operations
pub type Size = usize;
