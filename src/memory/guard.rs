/*!
 * Block Guards
 *
 * RAII guards for scoped block allocations with automatic cleanup
 */

use super::manager::BlockAllocator;
use super::types::{BlockHandle, MemoryResult};
use crate::core::types::Size;
use log::error;

/// Scoped block with automatic deallocation
///
/// # Example
///
/// ```
/// use vos_mem::memory::BlockAllocator;
///
/// let allocator = BlockAllocator::with_region(vec![0u8; 4096].into_boxed_slice(), None).unwrap();
/// {
///     let guard = allocator.allocate_guard(100).unwrap();
///     guard.write(0, b"frame").unwrap();
///     assert_eq!(allocator.usage().unwrap().allocated_bytes, 128);
/// }
/// assert_eq!(allocator.usage().unwrap().allocated_bytes, 0);
/// ```
pub struct BlockGuard {
    handle: BlockHandle,
    allocator: BlockAllocator,
    active: bool,
}

impl BlockGuard {
    fn new(handle: BlockHandle, allocator: BlockAllocator) -> Self {
        Self {
            handle,
            allocator,
            active: true,
        }
    }

    #[inline]
    pub fn handle(&self) -> BlockHandle {
        self.handle
    }

    /// Usable payload size
    #[inline]
    pub fn size(&self) -> Size {
        self.handle.size()
    }

    pub fn write(&self, offset: Size, data: &[u8]) -> MemoryResult<()> {
        self.allocator.write(self.handle, offset, data)
    }

    pub fn read(&self, offset: Size, len: Size) -> MemoryResult<Vec<u8>> {
        self.allocator.read(self.handle, offset, len)
    }

    pub fn read_into(&self, offset: Size, buf: &mut [u8]) -> MemoryResult<()> {
        self.allocator.read_into(self.handle, offset, buf)
    }

    /// Free the block now and report the outcome
    pub fn release(mut self) -> MemoryResult<()> {
        self.active = false;
        self.allocator.deallocate(self.handle)
    }

    /// Give up automatic cleanup; the caller must deallocate the handle
    pub fn into_handle(mut self) -> BlockHandle {
        self.active = false;
        self.handle
    }
}

impl Drop for BlockGuard {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.allocator.deallocate(self.handle) {
                error!("Failed to release guarded block {}: {}", self.handle, e);
            }
        }
    }
}

impl std::fmt::Debug for BlockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockGuard")
            .field("handle", &self.handle)
            .field("active", &self.active)
            .finish()
    }
}

impl BlockAllocator {
    /// Allocate a block that is returned when the guard drops
    pub fn allocate_guard(&self, size: Size) -> MemoryResult<BlockGuard> {
        let handle = self.allocate(size)?;
        Ok(BlockGuard::new(handle, self.clone()))
    }
}
