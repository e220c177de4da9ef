/*!
 * Accounting
 * Read-only usage, statistics and pressure queries
 */

use super::{BlockAllocator, RegionState};
use crate::core::limits::NUM_SIZE_CLASSES;
use crate::memory::size_class::SizeClass;
use crate::memory::types::{AllocatorStats, MemoryError, MemoryPressure, MemoryResult, MemoryUsage};

impl BlockAllocator {
    /// Consistent snapshot of allocated and free bytes
    ///
    /// Taken under the allocator lock, so it never observes half of a split.
    pub fn usage(&self) -> MemoryResult<MemoryUsage> {
        let state = self.state.lock();
        let RegionState::Active(arena) = &*state else {
            return Err(MemoryError::NotInitialized);
        };

        let mut free_blocks = [0usize; NUM_SIZE_CLASSES];
        let mut carved_blocks = [0usize; NUM_SIZE_CLASSES];
        for class in SizeClass::all() {
            let entry = arena.lists.class(class);
            free_blocks[class.index()] = entry.free;
            carved_blocks[class.index()] = entry.carved;
        }

        Ok(MemoryUsage {
            allocated_bytes: arena.allocated_bytes(),
            free_bytes: arena.free_bytes(),
            free_blocks,
            carved_blocks,
            remainder_bytes: arena.remainder_bytes(),
            overhead_bytes: arena.overhead,
            total_bytes: arena.memory.len(),
        })
    }

    /// Cumulative counters since init
    pub fn stats(&self) -> MemoryResult<AllocatorStats> {
        match &*self.state.lock() {
            RegionState::Active(arena) => Ok(arena.stats.clone()),
            _ => Err(MemoryError::NotInitialized),
        }
    }

    /// Current memory pressure level
    pub fn pressure(&self) -> MemoryResult<MemoryPressure> {
        let usage = self.usage()?;
        Ok(self
            .check_memory_pressure(usage.allocated_bytes, usage.usable_bytes())
            .unwrap_or(MemoryPressure::Low))
    }
}
