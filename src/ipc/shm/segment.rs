/*!
 * Shared Memory Segment
 * Individual shared memory segment implementation
 */

use crate::core::types::Size;
use crate::ipc::types::{IpcError, IpcResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared memory segment
///
/// Storage is released when the last `Arc` to the segment drops.
pub(super) struct SharedSegment {
    pub name: String,
    pub size: Size,
    data: RwLock<Box<[u8]>>,
    attached: AtomicUsize,
}

impl SharedSegment {
    pub fn new(name: String, size: Size) -> Self {
        Self {
            name,
            size,
            data: RwLock::new(vec![0u8; size].into_boxed_slice()),
            attached: AtomicUsize::new(0),
        }
    }

    pub fn attach(&self) -> usize {
        self.attached.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn detach(&self) -> usize {
        self.attached.fetch_sub(1, Ordering::AcqRel).saturating_sub(1)
    }

    pub fn attached(&self) -> usize {
        self.attached.load(Ordering::Acquire)
    }

    pub fn write(&self, offset: Size, data: &[u8]) -> IpcResult<()> {
        let end = self.check_range(offset, data.len())?;
        self.data.write()[offset..end].copy_from_slice(data);
        Ok(())
    }

    pub fn read(&self, offset: Size, len: Size) -> IpcResult<Vec<u8>> {
        let end = self.check_range(offset, len)?;
        Ok(self.data.read()[offset..end].to_vec())
    }

    fn check_range(&self, offset: Size, len: Size) -> IpcResult<Size> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(end),
            _ => Err(IpcError::InvalidRange {
                offset,
                size: len,
                segment_size: self.size,
            }),
        }
    }
}
