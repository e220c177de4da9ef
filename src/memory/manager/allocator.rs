/*!
 * Block Allocator Implementation
 * Allocation, splitting and deallocation logic
 */

use super::free_list::SlotState;
use super::{Arena, BlockAllocator, RegionState};
use crate::core::limits::{MIN_BLOCK_SIZE, PRESSURE_MEDIUM_THRESHOLD};
use crate::core::types::Size;
use crate::memory::size_class::SizeClass;
use crate::memory::types::{BlockHandle, MemoryError, MemoryPressure, MemoryResult};
use log::{debug, error, trace, warn};

/// Where an allocation was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    FreeList,
    Remainder,
    Split(SizeClass),
}

impl BlockAllocator {
    /// Allocate a block of at least `size` bytes
    ///
    /// Blocks are not zeroed. Requests of 0 or above 512KB are refused.
    pub fn allocate(&self, size: Size) -> MemoryResult<BlockHandle> {
        let class = SizeClass::for_size(size).ok_or(MemoryError::InvalidSize(size))?;

        let mut state = self.state.lock();
        let arena = match &mut *state {
            RegionState::Active(arena) => arena,
            _ => return Err(MemoryError::NotInitialized),
        };

        let Some((index, source)) = arena.take_block(class) else {
            arena.stats.oom_count += 1;
            let free_bytes = arena.free_bytes();
            error!(
                "OOM: requested {} bytes ({} class), {} bytes free in {}",
                size, class, free_bytes, arena.id
            );
            return Err(MemoryError::OutOfMemory {
                requested: size,
                class_size: class.size(),
                free_bytes,
            });
        };

        let generation = arena.lists.mark_allocated(index, class);
        arena.stats.allocations += 1;
        let allocated = arena.allocated_bytes();
        arena.stats.update_peak(allocated);

        let handle = BlockHandle {
            region: arena.id,
            offset: index,
            class,
            generation,
        };

        let usable = arena.memory.len() - arena.overhead;
        drop(state);

        match source {
            Source::FreeList => trace!("Allocated {} from free list", handle),
            Source::Remainder => debug!("Allocated {} from remainder", handle),
            Source::Split(from) => debug!("Allocated {} by splitting a {} block", handle, from),
        }

        if let Some(level) = self.check_memory_pressure(allocated, usable) {
            if level >= MemoryPressure::High {
                warn!(
                    "Memory pressure {}: {:.1}% of {} usable bytes allocated",
                    level,
                    (allocated as f64 / usable as f64) * 100.0,
                    usable
                );
            }
        }

        Ok(handle)
    }

    /// Return a block to its class free list
    ///
    /// The handle is fully validated before any list is touched; a foreign, stale or
    /// already-freed handle leaves the region unchanged.
    pub fn deallocate(&self, handle: BlockHandle) -> MemoryResult<()> {
        let mut state = self.state.lock();
        let arena = match &mut *state {
            RegionState::Active(arena) => arena,
            _ => return Err(MemoryError::NotInitialized),
        };

        if let Err(e) = arena.check_allocated(&handle) {
            arena.stats.rejected_frees += 1;
            warn!("Rejected deallocation: {}", e);
            return Err(e);
        }

        arena.lists.push(handle.offset, handle.class);
        arena.stats.deallocations += 1;
        trace!("Deallocated {}", handle);
        Ok(())
    }

    /// Check if a handle refers to a currently allocated block
    pub fn is_valid(&self, handle: BlockHandle) -> bool {
        match &*self.state.lock() {
            RegionState::Active(arena) => arena.check_allocated(&handle).is_ok(),
            _ => false,
        }
    }

    /// Payload size of a live block
    pub fn block_size(&self, handle: BlockHandle) -> Option<Size> {
        self.is_valid(handle).then(|| handle.size())
    }

    /// Check memory pressure level
    pub(super) fn check_memory_pressure(&self, used: Size, usable: Size) -> Option<MemoryPressure> {
        if usable == 0 {
            return None;
        }
        let usage_ratio = used as f64 / usable as f64;

        if usage_ratio >= self.critical_threshold {
            Some(MemoryPressure::Critical)
        } else if usage_ratio >= self.warning_threshold {
            Some(MemoryPressure::High)
        } else if usage_ratio >= PRESSURE_MEDIUM_THRESHOLD {
            Some(MemoryPressure::Medium)
        } else {
            None
        }
    }
}

impl Arena {
    /// Find a free block of `class`, carving or splitting as needed
    ///
    /// The returned slot has been removed from every list; the caller marks it allocated.
    fn take_block(&mut self, class: SizeClass) -> Option<(u32, Source)> {
        if let Some(index) = self.lists.pop(class) {
            return Some((index, Source::FreeList));
        }

        if let Some(index) = self.carve_remainder(class) {
            self.stats.remainder_carves += 1;
            return Some((index, Source::Remainder));
        }

        let source = self.lists.first_populated_above(class)?;
        let index = self.lists.pop(source)?;
        self.split(index, source, class);
        self.stats.splits += 1;
        Some((index, Source::Split(source)))
    }

    fn carve_remainder(&mut self, class: SizeClass) -> Option<u32> {
        let step = (class.size() / MIN_BLOCK_SIZE) as u32;
        let end = self.remainder.checked_add(step)?;
        if end as usize > self.lists.granules() {
            return None;
        }
        let index = self.remainder;
        self.remainder = end;
        self.lists.enroll(class);
        Some(index)
    }

    /// Cut the block at `index` from `from` down to `target`
    ///
    /// The block keeps its start as a `target` block; the upper pieces become one free
    /// block each of `target`, `target + 1`, ..., `from - 1`. Sizes add up because every
    /// class is twice the one below it.
    fn split(&mut self, index: u32, from: SizeClass, target: SizeClass) {
        self.lists.retire(from);

        let mut class = target;
        while class < from {
            let piece = index + (class.size() / MIN_BLOCK_SIZE) as u32;
            self.lists.carve_free(piece, class);
            match class.larger() {
                Some(next) => class = next,
                None => break,
            }
        }

        self.lists.enroll(target);
    }

    /// Validate a handle against the slot table without mutating anything
    pub(super) fn check_allocated(&self, handle: &BlockHandle) -> MemoryResult<()> {
        if handle.region != self.id {
            return Err(MemoryError::ForeignBlock(*handle));
        }
        let slot = self
            .lists
            .slot(handle.offset)
            .ok_or(MemoryError::InvalidBlock(*handle))?;

        match slot.state {
            SlotState::Allocated(class)
                if class == handle.class && slot.generation == handle.generation =>
            {
                Ok(())
            }
            SlotState::Free(class) if class == handle.class => {
                Err(MemoryError::DoubleFree(*handle))
            }
            _ => Err(MemoryError::InvalidBlock(*handle)),
        }
    }

    pub(super) fn allocated_bytes(&self) -> Size {
        SizeClass::all()
            .map(|class| {
                let entry = self.lists.class(class);
                (entry.carved - entry.free) * class.size()
            })
            .sum()
    }

    pub(super) fn free_bytes(&self) -> Size {
        let listed: Size = SizeClass::all()
            .map(|class| self.lists.class(class).free * class.size())
            .sum();
        listed + self.remainder_bytes()
    }
}
