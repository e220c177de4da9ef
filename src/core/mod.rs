/*!
 * Core Module
 * Fundamental types, limits and configuration
 */

pub mod config;
pub mod limits;
pub mod serde;
pub mod types;

// Re-export for convenience
pub use config::{AllocatorConfig, ConfigError};
pub use types::*;
