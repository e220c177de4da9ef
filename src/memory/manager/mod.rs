/*!
 * Block Allocator
 *
 * Bounded-latency allocator over a single caller-supplied region.
 *
 * ## Layout
 *
 * The region is carved into power-of-two blocks from a fixed ladder of 15 size classes
 * (32B to 512KB). At init the preallocation plan is honored largest class first from the
 * start of the region; whatever is left stays as an unclassified remainder:
 *
 * ```text
 * +----------+----------+-------+-------+------------------------------+----+
 * | 128K     | 128K     |  64K  |  32K  |  remainder (carved lazily)   |slack|
 * +----------+----------+-------+-------+------------------------------+----+
 * ```
 *
 * ## Allocation
 *
 * - **Exact class** non-empty: pop the head, O(1)
 * - **Remainder**: carve a block of the requested class off the front
 * - **Split**: take the first populated larger class and cut it into one block of the
 *   requested class plus one free block of every class in between
 * - Otherwise `OutOfMemory`; the region never grows
 *
 * Freed blocks go back on their own class list. They are never coalesced, which keeps
 * every free O(1).
 *
 * ## Bookkeeping
 *
 * Block tags live in a slot table outside the region, one slot per 32-byte granule, so
 * every byte of the region is payload. Handles carry the region id, block offset, class
 * and a generation; deallocation checks all of them before touching a list.
 */

mod access;
mod accounting;
mod allocator;
mod free_list;
mod layout;

use super::traits::{BlockAllocate, UsageInfo};
use super::types::{
    AllocatorStats, BlockHandle, MemoryPressure, MemoryResult, MemoryUsage, RegionId,
};
use crate::core::limits::{PRESSURE_CRITICAL_THRESHOLD, PRESSURE_WARNING_THRESHOLD};
use crate::core::types::Size;
use free_list::SegregatedFreeList;
use parking_lot::Mutex;
use std::sync::Arc;

/// Live state of an initialized region
#[derive(Debug)]
pub(super) struct Arena {
    pub id: RegionId,
    pub memory: Box<[u8]>,
    pub lists: SegregatedFreeList,
    /// First granule of the unclassified remainder
    pub remainder: u32,
    pub overhead: Size,
    pub stats: AllocatorStats,
}

impl Arena {
    #[inline]
    pub fn remainder_bytes(&self) -> Size {
        (self.lists.granules() - self.remainder as usize) * crate::core::limits::MIN_BLOCK_SIZE
    }
}

#[derive(Debug)]
pub(super) enum RegionState {
    Uninitialized,
    Active(Arena),
    TornDown,
}

/// Block allocator over one managed region
///
/// Cheap to clone; clones share the same region. All mutable state sits behind a single
/// mutex, held for at most one split chain per call.
#[derive(Clone)]
pub struct BlockAllocator {
    pub(super) state: Arc<Mutex<RegionState>>,
    // Memory pressure thresholds (fraction of usable bytes)
    pub(super) warning_threshold: f64,  // 80%
    pub(super) critical_threshold: f64, // 95%
}

impl BlockAllocator {
    /// Uninitialized allocator; call [`init`](Self::init) before use
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RegionState::Uninitialized)),
            warning_threshold: PRESSURE_WARNING_THRESHOLD,
            critical_threshold: PRESSURE_CRITICAL_THRESHOLD,
        }
    }

    /// Override the pressure thresholds used for warnings
    pub fn with_thresholds(mut self, warning: f64, critical: f64) -> Self {
        self.warning_threshold = warning;
        self.critical_threshold = critical;
        self
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.state.lock(), RegionState::Active(_))
    }

    /// Id of the active region
    pub fn region_id(&self) -> Option<RegionId> {
        match &*self.state.lock() {
            RegionState::Active(arena) => Some(arena.id),
            _ => None,
        }
    }
}

impl Default for BlockAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BlockAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        let mut dbg = f.debug_struct("BlockAllocator");
        match &*state {
            RegionState::Uninitialized => dbg.field("state", &"uninitialized"),
            RegionState::TornDown => dbg.field("state", &"torn_down"),
            RegionState::Active(arena) => dbg
                .field("region", &arena.id)
                .field("total_bytes", &arena.memory.len())
                .field("remainder_bytes", &arena.remainder_bytes()),
        };
        dbg.finish()
    }
}

// Implement trait interfaces
impl BlockAllocate for BlockAllocator {
    fn allocate(&self, size: Size) -> MemoryResult<BlockHandle> {
        BlockAllocator::allocate(self, size)
    }

    fn deallocate(&self, handle: BlockHandle) -> MemoryResult<()> {
        BlockAllocator::deallocate(self, handle)
    }

    fn is_valid(&self, handle: BlockHandle) -> bool {
        BlockAllocator::is_valid(self, handle)
    }

    fn block_size(&self, handle: BlockHandle) -> Option<Size> {
        BlockAllocator::block_size(self, handle)
    }
}

impl UsageInfo for BlockAllocator {
    fn usage(&self) -> MemoryResult<MemoryUsage> {
        BlockAllocator::usage(self)
    }

    fn stats(&self) -> MemoryResult<AllocatorStats> {
        BlockAllocator::stats(self)
    }

    fn pressure(&self) -> MemoryResult<MemoryPressure> {
        BlockAllocator::pressure(self)
    }
}
