/*!
 * Region Layout
 * Init and teardown of the managed region
 */

use super::free_list::{SegregatedFreeList, NIL};
use super::{Arena, BlockAllocator, RegionState};
use crate::core::limits::{MAX_REGION_SIZE, MIN_BLOCK_SIZE};
use crate::memory::plan::PreallocationPlan;
use crate::memory::size_class::SizeClass;
use crate::memory::types::{AllocatorStats, InitError, MemoryError, MemoryResult, RegionId};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(1);

impl BlockAllocator {
    /// Take over `region` and carve it according to `plan`
    ///
    /// `None` carves nothing up front. The region is handed back inside the error if init
    /// fails, and by [`teardown`](Self::teardown) once the allocator is done with it.
    pub fn init(
        &self,
        region: Box<[u8]>,
        plan: Option<&PreallocationPlan>,
    ) -> Result<RegionId, InitError> {
        let mut state = self.state.lock();

        if let RegionState::Active(arena) = &*state {
            warn!("Refusing init: {} is still active", arena.id);
            return Err(InitError::new(MemoryError::AlreadyInitialized, region));
        }

        let plan = plan.copied().unwrap_or_else(PreallocationPlan::empty);
        if let Err(e) = validate(&region, &plan) {
            warn!("Region init rejected: {}", e);
            return Err(InitError::new(e, region));
        }

        let arena = build_arena(region, &plan);
        let id = arena.id;

        info!(
            "Initialized {} with {} bytes ({} carved by plan [{}], {} bytes remainder, {} bytes slack)",
            id,
            arena.memory.len(),
            plan.required_bytes(),
            plan,
            arena.remainder_bytes(),
            arena.overhead
        );

        *state = RegionState::Active(arena);
        Ok(id)
    }

    /// Convenience constructor: a new allocator with `region` already initialized
    pub fn with_region(
        region: Box<[u8]>,
        plan: Option<&PreallocationPlan>,
    ) -> Result<Self, InitError> {
        let allocator = Self::new();
        allocator.init(region, plan)?;
        Ok(allocator)
    }

    /// Release the region and give its memory back
    ///
    /// Every outstanding handle becomes invalid. The allocator may be initialized again
    /// afterwards.
    pub fn teardown(&self, region: RegionId) -> MemoryResult<Box<[u8]>> {
        let mut state = self.state.lock();

        let active = match &*state {
            RegionState::Active(arena) => arena.id,
            _ => return Err(MemoryError::NotInitialized),
        };
        if active != region {
            warn!("Teardown of {} refused: active region is {}", region, active);
            return Err(MemoryError::RegionMismatch {
                expected: active,
                actual: region,
            });
        }

        match std::mem::replace(&mut *state, RegionState::TornDown) {
            RegionState::Active(arena) => {
                let outstanding: usize = arena
                    .lists
                    .classes()
                    .iter()
                    .map(|entry| entry.carved - entry.free)
                    .sum();
                if outstanding > 0 {
                    warn!(
                        "Tearing down {} with {} blocks still allocated",
                        arena.id, outstanding
                    );
                }
                info!(
                    "Tore down {} ({} allocations, {} deallocations, peak {} bytes)",
                    arena.id,
                    arena.stats.allocations,
                    arena.stats.deallocations,
                    arena.stats.peak_allocated_bytes
                );
                Ok(arena.memory)
            }
            // Checked above while holding the lock
            other => {
                *state = other;
                Err(MemoryError::NotInitialized)
            }
        }
    }
}

fn validate(region: &[u8], plan: &PreallocationPlan) -> MemoryResult<()> {
    if region.is_empty() {
        return Err(MemoryError::InvalidRegion("region is empty".into()));
    }
    if region.len() < MIN_BLOCK_SIZE {
        return Err(MemoryError::InvalidRegion(format!(
            "{} bytes cannot hold a single {} byte block",
            region.len(),
            MIN_BLOCK_SIZE
        )));
    }
    if region.len() > MAX_REGION_SIZE {
        return Err(MemoryError::InvalidRegion(format!(
            "{} bytes exceeds the largest supported region ({} bytes)",
            region.len(),
            MAX_REGION_SIZE
        )));
    }

    plan.validate()?;

    let usable = region.len() - region.len() % MIN_BLOCK_SIZE;
    let required = plan.required_bytes();
    if required > usable {
        return Err(MemoryError::PlanExceedsRegion {
            required,
            available: usable,
        });
    }
    Ok(())
}

/// Carve the plan largest class first; the rest stays as remainder
fn build_arena(memory: Box<[u8]>, plan: &PreallocationPlan) -> Arena {
    let granules = memory.len() / MIN_BLOCK_SIZE;
    let overhead = memory.len() % MIN_BLOCK_SIZE;
    debug_assert!(granules < NIL as usize);

    let mut lists = SegregatedFreeList::new(granules);
    let mut cursor: u32 = 0;

    for class in SizeClass::all().rev() {
        let step = (class.size() / MIN_BLOCK_SIZE) as u32;
        for _ in 0..plan.count(class) {
            lists.carve_free(cursor, class);
            cursor += step;
        }
        if plan.count(class) > 0 {
            debug!("Preallocated {} blocks of {}", plan.count(class), class);
        }
    }

    Arena {
        id: RegionId(NEXT_REGION_ID.fetch_add(1, Ordering::Relaxed)),
        memory,
        lists,
        remainder: cursor,
        overhead,
        stats: AllocatorStats::default(),
    }
}
