/*!
 * Payload Access
 * Reading and writing block contents through handles
 */

use super::{BlockAllocator, RegionState};
use crate::core::types::Size;
use crate::memory::types::{BlockHandle, MemoryError, MemoryResult};

impl BlockAllocator {
    /// Copy `data` into a block at `offset`
    pub fn write(&self, handle: BlockHandle, offset: Size, data: &[u8]) -> MemoryResult<()> {
        check_bounds(&handle, offset, data.len())?;
        let mut state = self.state.lock();
        let block = live_block(&mut state, &handle)?;
        block[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Copy `len` bytes out of a block starting at `offset`
    pub fn read(&self, handle: BlockHandle, offset: Size, len: Size) -> MemoryResult<Vec<u8>> {
        check_bounds(&handle, offset, len)?;
        let mut state = self.state.lock();
        let block = live_block(&mut state, &handle)?;
        Ok(block[offset..offset + len].to_vec())
    }

    /// Fill `buf` from a block starting at `offset`, without allocating
    pub fn read_into(&self, handle: BlockHandle, offset: Size, buf: &mut [u8]) -> MemoryResult<()> {
        check_bounds(&handle, offset, buf.len())?;
        let mut state = self.state.lock();
        let block = live_block(&mut state, &handle)?;
        buf.copy_from_slice(&block[offset..offset + buf.len()]);
        Ok(())
    }
}

/// Payload of a live block; the handle is validated before the region is sliced
fn live_block<'a>(state: &'a mut RegionState, handle: &BlockHandle) -> MemoryResult<&'a mut [u8]> {
    let RegionState::Active(arena) = state else {
        return Err(MemoryError::NotInitialized);
    };
    arena.check_allocated(handle).map_err(|e| match e {
        // Freed blocks are simply unknown to a reader
        MemoryError::DoubleFree(h) => MemoryError::InvalidBlock(h),
        other => other,
    })?;
    Ok(&mut arena.memory[handle.range()])
}

fn check_bounds(handle: &BlockHandle, offset: Size, len: Size) -> MemoryResult<()> {
    let block_size = handle.size();
    match offset.checked_add(len) {
        Some(end) if end <= block_size => Ok(()),
        _ => Err(MemoryError::OutOfBounds {
            offset,
            len,
            block_size,
        }),
    }
}
