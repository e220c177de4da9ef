/*!
 * Preallocation Plan
 * Per-class block counts carved at init
 */

use super::size_class::SizeClass;
use super::types::{MemoryError, MemoryResult};
use crate::core::limits::{DEFAULT_PREALLOCATION, MAX_PREALLOCATE, NUM_SIZE_CLASSES};
use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How many blocks of each class to pre-carve when a region is initialized
///
/// A zero entry means that class is carved lazily, on first demand. Serialized as a plain
/// array of 15 counts so existing configuration data keeps working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreallocationPlan([u32; NUM_SIZE_CLASSES]);

impl PreallocationPlan {
    /// Carve nothing up front
    pub const fn empty() -> Self {
        Self([0; NUM_SIZE_CLASSES])
    }

    pub const fn new(counts: [u32; NUM_SIZE_CLASSES]) -> Self {
        Self(counts)
    }

    /// Plan with a single class populated
    pub fn single(class: SizeClass, count: u32) -> Self {
        let mut counts = [0; NUM_SIZE_CLASSES];
        counts[class.index()] = count;
        Self(counts)
    }

    pub fn count(&self, class: SizeClass) -> u32 {
        self.0[class.index()]
    }

    pub fn counts(&self) -> &[u32; NUM_SIZE_CLASSES] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&c| c == 0)
    }

    /// Bytes the plan claims from the region
    pub fn required_bytes(&self) -> Size {
        SizeClass::all()
            .map(|class| self.count(class) as Size * class.size())
            .sum()
    }

    /// Check per-class limits
    pub fn validate(&self) -> MemoryResult<()> {
        for class in SizeClass::all() {
            let count = self.count(class);
            if count > MAX_PREALLOCATE {
                return Err(MemoryError::InvalidPlan(format!(
                    "{} blocks of class {} requested, at most {} may be preallocated",
                    count, class, MAX_PREALLOCATE
                )));
            }
        }
        Ok(())
    }
}

impl Default for PreallocationPlan {
    fn default() -> Self {
        Self(DEFAULT_PREALLOCATION)
    }
}

impl From<[u32; NUM_SIZE_CLASSES]> for PreallocationPlan {
    fn from(counts: [u32; NUM_SIZE_CLASSES]) -> Self {
        Self(counts)
    }
}

/// Parses the comma-separated form used in environment overrides, e.g.
/// `"0,0,0,0,0,0,0,0,0,1,1,1,4,0,0"`
impl FromStr for PreallocationPlan {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != NUM_SIZE_CLASSES {
            return Err(MemoryError::InvalidPlan(format!(
                "expected {} counts, got {}",
                NUM_SIZE_CLASSES,
                parts.len()
            )));
        }

        let mut counts = [0u32; NUM_SIZE_CLASSES];
        for (slot, part) in counts.iter_mut().zip(parts) {
            *slot = part
                .parse()
                .map_err(|_| MemoryError::InvalidPlan(format!("not a count: {:?}", part)))?;
        }
        Ok(Self(counts))
    }
}

impl fmt::Display for PreallocationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, count) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", count)?;
        }
        Ok(())
    }
}
