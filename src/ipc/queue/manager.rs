/*!
 * Queue Manager
 * Named FIFO queues whose payloads are stored in allocator blocks
 */

use super::fifo::FifoQueue;
use super::types::{QueueMessage, QueueStats};
use crate::core::limits::{MAX_BLOCK_SIZE, MAX_QUEUE_CAPACITY};
use crate::ipc::types::{IpcError, IpcResult, QueueId};
use crate::memory::{BlockAllocator, BlockHandle};
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Queue manager
///
/// Cloning shares the registry; every clone sees the same queues.
pub struct QueueManager {
    queues: Arc<DashMap<QueueId, Arc<FifoQueue>, RandomState>>,
    names: Arc<DashMap<String, QueueId, RandomState>>,
    next_id: Arc<AtomicU32>,
    next_msg_id: Arc<AtomicU64>,
    allocator: BlockAllocator,
}

impl QueueManager {
    pub fn new(allocator: BlockAllocator) -> Self {
        info!(
            "Queue manager initialized (capacity limit: {})",
            MAX_QUEUE_CAPACITY
        );
        Self {
            queues: Arc::new(DashMap::with_hasher(RandomState::new())),
            names: Arc::new(DashMap::with_hasher(RandomState::new())),
            next_id: Arc::new(AtomicU32::new(1)),
            next_msg_id: Arc::new(AtomicU64::new(1)),
            allocator,
        }
    }

    /// Create a named queue holding at most `max_messages` of `max_length` bytes each
    pub fn create(&self, name: &str, max_messages: usize, max_length: usize) -> IpcResult<QueueId> {
        if name.is_empty() {
            return Err(IpcError::InvalidOperation("Queue name is empty".into()));
        }
        if max_messages == 0 || max_length == 0 {
            return Err(IpcError::InvalidOperation(format!(
                "Queue {} needs non-zero capacity and message length",
                name
            )));
        }
        if max_messages > MAX_QUEUE_CAPACITY {
            return Err(IpcError::LimitExceeded(format!(
                "capacity {} exceeds {}",
                max_messages, MAX_QUEUE_CAPACITY
            )));
        }
        if max_length > MAX_BLOCK_SIZE {
            return Err(IpcError::LimitExceeded(format!(
                "message length {} exceeds largest block {}",
                max_length, MAX_BLOCK_SIZE
            )));
        }

        let id = match self.names.entry(name.to_string()) {
            Entry::Occupied(_) => return Err(IpcError::AlreadyExists(name.to_string())),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let queue = FifoQueue::new(id, name.to_string(), max_messages, max_length);
                self.queues.insert(id, Arc::new(queue));
                slot.insert(id);
                id
            }
        };

        info!(
            "Created queue {} '{}' (capacity {}, max length {})",
            id, name, max_messages, max_length
        );
        Ok(id)
    }

    /// Look up an existing queue by name
    pub fn open(&self, name: &str) -> IpcResult<QueueId> {
        self.names
            .get(name)
            .map(|id| *id)
            .ok_or_else(|| IpcError::NotFound(format!("Queue '{}'", name)))
    }

    /// Remove a queue, waking blocked receivers and freeing undelivered payloads
    pub fn destroy(&self, id: QueueId) -> IpcResult<()> {
        let (_, queue) = self
            .queues
            .remove(&id)
            .ok_or_else(|| IpcError::NotFound(format!("Queue {}", id)))?;
        self.names.remove(&queue.name);

        let pending = queue.close();
        let dropped = pending.len();
        for message in pending {
            self.release(message.block);
        }

        if dropped > 0 {
            warn!("Destroyed queue {} with {} undelivered messages", id, dropped);
        } else {
            info!("Destroyed queue {}", id);
        }
        Ok(())
    }

    /// Enqueue a copy of `payload`
    pub fn send(&self, id: QueueId, payload: &[u8]) -> IpcResult<()> {
        let queue = self.queue(id)?;
        if payload.len() > queue.max_length {
            return Err(IpcError::InvalidOperation(format!(
                "message of {} bytes exceeds queue limit {}",
                payload.len(),
                queue.max_length
            )));
        }
        queue.ensure_room()?;

        // Empty payloads still occupy the smallest block
        let block = self.allocator.allocate(payload.len().max(1))?;
        if let Err(e) = self.allocator.write(block, 0, payload) {
            self.release(block);
            return Err(e.into());
        }

        let message = QueueMessage {
            id: self.next_msg_id.fetch_add(1, Ordering::Relaxed),
            len: payload.len(),
            block,
            enqueued_at: Instant::now(),
        };
        let msg_id = message.id;

        if let Err((e, message)) = queue.push(message) {
            self.release(message.block);
            return Err(e);
        }

        debug!(
            "Queued message {} ({} bytes) on queue {} in {}",
            msg_id,
            payload.len(),
            id,
            block
        );
        Ok(())
    }

    /// Dequeue the oldest message, waiting up to `timeout` for one to arrive
    pub fn receive(&self, id: QueueId, timeout: Duration) -> IpcResult<Vec<u8>> {
        let queue = self.queue(id)?;
        let message = queue.pop_timeout(timeout, |_| Ok(()))?;

        let data = self.allocator.read(message.block, 0, message.len);
        self.release(message.block);
        self.log_delivery(id, &message);
        Ok(data?)
    }

    /// Dequeue the oldest message into `buf`, returning its length
    ///
    /// A message larger than `buf` is left at the head of the queue.
    pub fn receive_into(&self, id: QueueId, buf: &mut [u8], timeout: Duration) -> IpcResult<usize> {
        let queue = self.queue(id)?;
        let capacity = buf.len();
        let message = queue.pop_timeout(timeout, |head| {
            if head.len > capacity {
                Err(IpcError::InvalidOperation(format!(
                    "buffer of {} bytes cannot hold {} byte message",
                    capacity, head.len
                )))
            } else {
                Ok(())
            }
        })?;

        let copied = self
            .allocator
            .read_into(message.block, 0, &mut buf[..message.len]);
        self.release(message.block);
        self.log_delivery(id, &message);
        copied?;
        Ok(message.len)
    }

    pub fn stats(&self, id: QueueId) -> IpcResult<QueueStats> {
        let queue = self.queue(id)?;
        let (length, sent, received) = queue.counters();
        Ok(QueueStats {
            id,
            name: queue.name.clone(),
            capacity: queue.capacity,
            max_length: queue.max_length,
            length,
            sent,
            received,
        })
    }

    /// Messages currently waiting on a queue
    pub fn len(&self, id: QueueId) -> IpcResult<usize> {
        Ok(self.queue(id)?.len())
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    fn queue(&self, id: QueueId) -> IpcResult<Arc<FifoQueue>> {
        self.queues
            .get(&id)
            .map(|q| Arc::clone(q.value()))
            .ok_or_else(|| IpcError::NotFound(format!("Queue {}", id)))
    }

    fn release(&self, block: BlockHandle) {
        if let Err(e) = self.allocator.deallocate(block) {
            warn!("Failed to free message block {}: {}", block, e);
        }
    }

    fn log_delivery(&self, id: QueueId, message: &QueueMessage) {
        debug!(
            "Delivered message {} ({} bytes) from queue {} after {:?}",
            message.id,
            message.len,
            id,
            message.enqueued_at.elapsed()
        );
    }
}

impl Clone for QueueManager {
    fn clone(&self) -> Self {
        Self {
            queues: Arc::clone(&self.queues),
            names: Arc::clone(&self.names),
            next_id: Arc::clone(&self.next_id),
            next_msg_id: Arc::clone(&self.next_msg_id),
            allocator: self.allocator.clone(),
        }
    }
}
