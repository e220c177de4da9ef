/*!
 * Memory Module
 * Block-segregated allocation over a single fixed region
 */

pub mod guard;
pub mod manager;
pub mod plan;
pub mod size_class;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use guard::BlockGuard;
pub use manager::BlockAllocator;
pub use plan::PreallocationPlan;
pub use size_class::SizeClass;
pub use traits::*;
pub use types::*;
