/*!
 * Shared Memory Types
 * Handles and segment statistics
 */

use super::super::types::ShmId;
use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle returned by a successful open; each open yields a distinct handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShmHandle(pub(crate) ShmId);

impl ShmHandle {
    #[inline]
    pub fn id(&self) -> ShmId {
        self.0
    }
}

impl fmt::Display for ShmHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shm#{}", self.0)
    }
}

/// Shared memory statistics for one handle's segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShmStats {
    pub handle: ShmHandle,
    pub name: String,
    pub size: Size,
    /// Handles currently attached to the segment, across all openers
    pub attached: usize,
    /// Whether this handle created the segment
    pub creator: bool,
    /// Whether the name still resolves to this segment
    pub linked: bool,
}
