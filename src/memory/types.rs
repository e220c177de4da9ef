/*!
 * Memory Types
 * Errors, handles and reports for the block allocator
 */

use super::size_class::SizeClass;
use crate::core::limits::NUM_SIZE_CLASSES;
use crate::core::serde::{is_zero_u64, is_zero_usize};
use crate::core::types::{Offset, Size};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Broad failure category every [`MemoryError`] falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Operation attempted before init or after teardown
    NotInitialized,
    /// Bad argument: size, plan, handle or region
    InvalidParameter,
    /// No block at or above the requested class could be found or split
    OutOfMemory,
}

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum MemoryError {
    #[error("Region not initialized")]
    #[diagnostic(
        code(memory::not_initialized),
        help("Call init() before using the allocator, and do not use it after teardown().")
    )]
    NotInitialized,

    #[error("Region already initialized")]
    #[diagnostic(
        code(memory::already_initialized),
        help("Tear the active region down before initializing a new one.")
    )]
    AlreadyInitialized,

    #[error("Invalid region: {0}")]
    #[diagnostic(code(memory::invalid_region))]
    InvalidRegion(String),

    #[error("Invalid preallocation plan: {0}")]
    #[diagnostic(code(memory::invalid_plan))]
    InvalidPlan(String),

    #[error("Preallocation plan needs {required} bytes, region provides {available} usable bytes")]
    #[diagnostic(
        code(memory::plan_exceeds_region),
        help("Lower the preallocation counts or supply a larger region.")
    )]
    PlanExceedsRegion { required: Size, available: Size },

    #[error("Invalid allocation size: {0} bytes (must be 1..=524288)")]
    #[diagnostic(code(memory::invalid_size))]
    InvalidSize(Size),

    #[error("Out of memory: requested {requested} bytes ({class_size} byte class), {free_bytes} bytes free")]
    #[diagnostic(
        code(memory::out_of_memory),
        help("No block at or above the requested class is free. Free blocks or preallocate more at init.")
    )]
    OutOfMemory {
        requested: Size,
        class_size: Size,
        free_bytes: Size,
    },

    #[error("Block belongs to another region: {0}")]
    #[diagnostic(code(memory::foreign_block))]
    ForeignBlock(BlockHandle),

    #[error("Unknown block: {0}")]
    #[diagnostic(code(memory::invalid_block))]
    InvalidBlock(BlockHandle),

    #[error("Block already free: {0}")]
    #[diagnostic(
        code(memory::double_free),
        help("Each block may be returned exactly once.")
    )]
    DoubleFree(BlockHandle),

    #[error("Region mismatch: expected {expected}, got {actual}")]
    #[diagnostic(code(memory::region_mismatch))]
    RegionMismatch { expected: RegionId, actual: RegionId },

    #[error("Access out of bounds: offset {offset} + len {len} exceeds block size {block_size}")]
    #[diagnostic(code(memory::out_of_bounds))]
    OutOfBounds {
        offset: Size,
        len: Size,
        block_size: Size,
    },
}

impl MemoryError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MemoryError::NotInitialized => ErrorKind::NotInitialized,
            MemoryError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            MemoryError::AlreadyInitialized
            | MemoryError::InvalidRegion(_)
            | MemoryError::InvalidPlan(_)
            | MemoryError::PlanExceedsRegion { .. }
            | MemoryError::InvalidSize(_)
            | MemoryError::ForeignBlock(_)
            | MemoryError::InvalidBlock(_)
            | MemoryError::DoubleFree(_)
            | MemoryError::RegionMismatch { .. }
            | MemoryError::OutOfBounds { .. } => ErrorKind::InvalidParameter,
        }
    }
}

/// A failed [`init`](super::BlockAllocator::init), carrying the caller's memory back
#[derive(Error)]
#[error("{error}")]
pub struct InitError {
    pub error: MemoryError,
    region: Box<[u8]>,
}

impl InitError {
    pub(crate) fn new(error: MemoryError, region: Box<[u8]>) -> Self {
        Self { error, region }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Reclaim the backing memory that was handed to init
    pub fn into_region(self) -> Box<[u8]> {
        self.region
    }
}

impl fmt::Debug for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitError")
            .field("error", &self.error)
            .field("region_len", &self.region.len())
            .finish()
    }
}

impl From<InitError> for MemoryError {
    fn from(err: InitError) -> Self {
        err.error
    }
}

/// Identity of one init/teardown lifetime of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub(crate) u64);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// Handle to an allocated block
///
/// Blocks are addressed by offset into the region rather than by pointer. The generation
/// changes every time the block is handed out, so a handle kept past its free is rejected
/// even if the same block has been allocated again since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHandle {
    pub(crate) region: RegionId,
    pub(crate) offset: u32,
    pub(crate) class: SizeClass,
    pub(crate) generation: u32,
}

impl BlockHandle {
    /// Byte offset of the block inside its region
    #[inline]
    pub fn offset(&self) -> Offset {
        self.offset as Offset * crate::core::limits::MIN_BLOCK_SIZE
    }

    #[inline]
    pub fn class(&self) -> SizeClass {
        self.class
    }

    /// Usable payload size (the class size, not the requested size)
    #[inline]
    pub fn size(&self) -> Size {
        self.class.size()
    }

    #[inline]
    pub fn region(&self) -> RegionId {
        self.region
    }

    /// Byte range this block covers inside the region
    #[inline]
    pub fn range(&self) -> std::ops::Range<Offset> {
        self.offset()..self.offset() + self.size()
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}+0x{:x} ({}, gen {})",
            self.region,
            self.offset(),
            self.class,
            self.generation
        )
    }
}

/// Snapshot of region usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    /// Bytes in blocks currently handed out
    pub allocated_bytes: Size,
    /// Bytes in free blocks plus the unclassified remainder
    pub free_bytes: Size,
    /// Free blocks per class
    pub free_blocks: [usize; NUM_SIZE_CLASSES],
    /// Blocks currently living in each class, free or allocated
    pub carved_blocks: [usize; NUM_SIZE_CLASSES],
    /// Region bytes not yet carved into any class
    pub remainder_bytes: Size,
    /// Region bytes that can never hold a block
    #[serde(skip_serializing_if = "is_zero_usize", default)]
    pub overhead_bytes: Size,
    /// Size of the backing memory
    pub total_bytes: Size,
}

impl MemoryUsage {
    /// Bytes that can ever be handed out
    pub fn usable_bytes(&self) -> Size {
        self.total_bytes - self.overhead_bytes
    }

    pub fn usage_percentage(&self) -> f64 {
        if self.usable_bytes() == 0 {
            return 0.0;
        }
        (self.allocated_bytes as f64 / self.usable_bytes() as f64) * 100.0
    }

    /// Free blocks of `class`
    pub fn free_in(&self, class: SizeClass) -> usize {
        self.free_blocks[class.index()]
    }
}

/// Cumulative allocator counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorStats {
    #[serde(skip_serializing_if = "is_zero_u64", default)]
    pub allocations: u64,
    #[serde(skip_serializing_if = "is_zero_u64", default)]
    pub deallocations: u64,
    /// Allocations served by splitting a larger free block
    #[serde(skip_serializing_if = "is_zero_u64", default)]
    pub splits: u64,
    /// Allocations served from the unclassified remainder
    #[serde(skip_serializing_if = "is_zero_u64", default)]
    pub remainder_carves: u64,
    #[serde(skip_serializing_if = "is_zero_u64", default)]
    pub oom_count: u64,
    /// Deallocations refused because the handle was foreign, stale or already free
    #[serde(skip_serializing_if = "is_zero_u64", default)]
    pub rejected_frees: u64,
    pub peak_allocated_bytes: Size,
}

impl AllocatorStats {
    pub(crate) fn update_peak(&mut self, allocated: Size) {
        if allocated > self.peak_allocated_bytes {
            self.peak_allocated_bytes = allocated;
        }
    }
}

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MemoryPressure::Low => write!(f, "LOW"),
            MemoryPressure::Medium => write!(f, "MEDIUM"),
            MemoryPressure::High => write!(f, "HIGH"),
            MemoryPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}
