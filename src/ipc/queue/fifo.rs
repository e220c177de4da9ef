/*!
 * FIFO Queue
 * First-in-first-out message queue implementation
 */

use super::types::QueueMessage;
use crate::ipc::types::{IpcError, IpcResult, QueueId};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

struct FifoState {
    messages: VecDeque<QueueMessage>,
    closed: bool,
    sent: u64,
    received: u64,
}

/// FIFO queue implementation
pub(super) struct FifoQueue {
    pub id: QueueId,
    pub name: String,
    pub capacity: usize,
    pub max_length: usize,
    state: Mutex<FifoState>,
    not_empty: Condvar,
}

impl FifoQueue {
    pub fn new(id: QueueId, name: String, capacity: usize, max_length: usize) -> Self {
        Self {
            id,
            name,
            capacity,
            max_length,
            state: Mutex::new(FifoState {
                messages: VecDeque::with_capacity(capacity),
                closed: false,
                sent: 0,
                received: 0,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Check that one more message would fit, without reserving anything
    pub fn ensure_room(&self) -> IpcResult<()> {
        let state = self.state.lock();
        self.check_room(&state)
    }

    fn check_room(&self, state: &FifoState) -> IpcResult<()> {
        if state.closed {
            return Err(IpcError::Closed(format!("Queue {}", self.name)));
        }
        if state.messages.len() >= self.capacity {
            return Err(IpcError::QueueFull {
                queue: self.id,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Enqueue; on failure the message is handed back so its block can be freed
    pub fn push(&self, message: QueueMessage) -> Result<(), (IpcError, QueueMessage)> {
        let mut state = self.state.lock();
        if let Err(e) = self.check_room(&state) {
            return Err((e, message));
        }
        state.messages.push_back(message);
        state.sent += 1;
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Wait up to `timeout` for the head message and take it if `accept` agrees
    ///
    /// A rejected head stays at the front of the queue. A timeout too large to express
    /// as a deadline waits indefinitely.
    pub fn pop_timeout(
        &self,
        timeout: Duration,
        accept: impl Fn(&QueueMessage) -> IpcResult<()>,
    ) -> IpcResult<QueueMessage> {
        let start = Instant::now();
        let deadline = start.checked_add(timeout);
        let mut state = self.state.lock();

        loop {
            if let Some(head) = state.messages.front() {
                accept(head)?;
                state.received += 1;
                return state
                    .messages
                    .pop_front()
                    .ok_or_else(|| IpcError::NotFound(format!("Queue {} head", self.name)));
            }
            if state.closed {
                return Err(IpcError::Closed(format!("Queue {}", self.name)));
            }

            let timed_out = match deadline {
                Some(deadline) => self.not_empty.wait_until(&mut state, deadline).timed_out(),
                None => {
                    self.not_empty.wait(&mut state);
                    false
                }
            };
            if timed_out && state.messages.is_empty() {
                if state.closed {
                    return Err(IpcError::Closed(format!("Queue {}", self.name)));
                }
                return Err(IpcError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        }
    }

    /// Mark closed, wake every waiter and hand back whatever was still queued
    pub fn close(&self) -> Vec<QueueMessage> {
        let mut state = self.state.lock();
        state.closed = true;
        let drained = state.messages.drain(..).collect();
        drop(state);
        self.not_empty.notify_all();
        drained
    }

    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn counters(&self) -> (usize, u64, u64) {
        let state = self.state.lock();
        (state.messages.len(), state.sent, state.received)
    }
}
