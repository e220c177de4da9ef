/*!
 * Shared Memory Manager
 * Create-or-attach by name, with the creator owning the name
 */

use super::segment::SharedSegment;
use super::types::{ShmHandle, ShmStats};
use crate::core::limits::MAX_SEGMENT_SIZE;
use crate::core::types::Size;
use crate::ipc::types::{IpcError, IpcResult, ShmId};
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

struct Attachment {
    segment: Arc<SharedSegment>,
    creator: bool,
}

/// Shared memory manager
pub struct ShmManager {
    segments: Arc<DashMap<String, Arc<SharedSegment>, RandomState>>,
    handles: Arc<DashMap<ShmId, Attachment, RandomState>>,
    next_id: Arc<AtomicU32>,
}

impl ShmManager {
    pub fn new() -> Self {
        info!(
            "Shared memory manager initialized (segment limit: {} bytes)",
            MAX_SEGMENT_SIZE
        );
        Self {
            segments: Arc::new(DashMap::with_hasher(RandomState::new())),
            handles: Arc::new(DashMap::with_hasher(RandomState::new())),
            next_id: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Attach to the segment called `name`, creating it with `size` bytes if absent
    ///
    /// Returns the handle and the segment's actual size, which differs from
    /// `size` when attaching to a segment someone else created.
    pub fn open(&self, name: &str, size: Size) -> IpcResult<(ShmHandle, Size)> {
        if name.is_empty() {
            return Err(IpcError::InvalidOperation("Segment name is empty".into()));
        }

        let (segment, creator) = match self.segments.entry(name.to_string()) {
            Entry::Occupied(existing) => (Arc::clone(existing.get()), false),
            Entry::Vacant(slot) => {
                if size == 0 {
                    return Err(IpcError::InvalidSize(format!(
                        "segment '{}' cannot be created empty",
                        name
                    )));
                }
                if size > MAX_SEGMENT_SIZE {
                    return Err(IpcError::LimitExceeded(format!(
                        "segment size {} exceeds {}",
                        size, MAX_SEGMENT_SIZE
                    )));
                }
                let segment = Arc::new(SharedSegment::new(name.to_string(), size));
                slot.insert(Arc::clone(&segment));
                (segment, true)
            }
        };

        let attached = segment.attach();
        let actual = segment.size;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handles.insert(id, Attachment { segment, creator });
        let handle = ShmHandle(id);

        if creator {
            info!("Created shared memory segment '{}' ({} bytes) as {}", name, actual, handle);
        } else {
            debug!(
                "Attached {} to segment '{}' ({} handles attached)",
                handle, name, attached
            );
        }
        Ok((handle, actual))
    }

    /// Detach a handle; the creator's close also unlinks the name
    pub fn close(&self, handle: ShmHandle) -> IpcResult<()> {
        let (_, attachment) = self
            .handles
            .remove(&handle.0)
            .ok_or_else(|| IpcError::NotFound(format!("Shared memory handle {}", handle)))?;
        let segment = attachment.segment;
        let remaining = segment.detach();

        if attachment.creator {
            self.segments
                .remove_if(&segment.name, |_, linked| Arc::ptr_eq(linked, &segment));
            info!(
                "Unlinked shared memory segment '{}' ({} handles still attached)",
                segment.name, remaining
            );
        } else {
            debug!("Detached {} from segment '{}'", handle, segment.name);
        }
        Ok(())
    }

    pub fn write(&self, handle: ShmHandle, offset: Size, data: &[u8]) -> IpcResult<()> {
        self.segment(handle)?.write(offset, data)
    }

    pub fn read(&self, handle: ShmHandle, offset: Size, len: Size) -> IpcResult<Vec<u8>> {
        self.segment(handle)?.read(offset, len)
    }

    pub fn stats(&self, handle: ShmHandle) -> IpcResult<ShmStats> {
        let entry = self
            .handles
            .get(&handle.0)
            .ok_or_else(|| IpcError::NotFound(format!("Shared memory handle {}", handle)))?;
        let segment = &entry.segment;
        let linked = self
            .segments
            .get(&segment.name)
            .map(|s| Arc::ptr_eq(s.value(), segment))
            .unwrap_or(false);
        Ok(ShmStats {
            handle,
            name: segment.name.clone(),
            size: segment.size,
            attached: segment.attached(),
            creator: entry.creator,
            linked,
        })
    }

    /// Names currently resolvable by `open` without creating
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn segment(&self, handle: ShmHandle) -> IpcResult<Arc<SharedSegment>> {
        self.handles
            .get(&handle.0)
            .map(|a| Arc::clone(&a.segment))
            .ok_or_else(|| IpcError::NotFound(format!("Shared memory handle {}", handle)))
    }
}

impl Default for ShmManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ShmManager {
    fn clone(&self) -> Self {
        Self {
            segments: Arc::clone(&self.segments),
            handles: Arc::clone(&self.handles),
            next_id: Arc::clone(&self.next_id),
        }
    }
}
