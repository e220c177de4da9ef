/*!
 * Size Classes
 * The fixed ladder of power-of-two block sizes
 */

use crate::core::limits::{BLOCK_SIZES, MAX_BLOCK_SIZE, NUM_SIZE_CLASSES};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the 15 block size classes, identified by its index in [`BLOCK_SIZES`]
///
/// Deserialization rejects indices past the end of the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SizeClass(u8);

impl SizeClass {
    /// Smallest class (32 bytes)
    pub const MIN: SizeClass = SizeClass(0);

    /// Largest class (512KB)
    pub const MAX: SizeClass = SizeClass((NUM_SIZE_CLASSES - 1) as u8);

    /// Class at `index`, or `None` past the end of the ladder
    #[inline]
    pub const fn from_index(index: usize) -> Option<SizeClass> {
        if index < NUM_SIZE_CLASSES {
            Some(SizeClass(index as u8))
        } else {
            None
        }
    }

    /// Smallest class whose block size is at least `size`
    ///
    /// Returns `None` for zero and for anything above [`MAX_BLOCK_SIZE`]; such requests are
    /// refused rather than spread over several blocks.
    pub fn for_size(size: usize) -> Option<SizeClass> {
        if size == 0 || size > MAX_BLOCK_SIZE {
            return None;
        }
        // 32 = 2^5 is class 0
        let index = size
            .max(BLOCK_SIZES[0])
            .next_power_of_two()
            .trailing_zeros() as usize
            - BLOCK_SIZES[0].trailing_zeros() as usize;
        Self::from_index(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Nominal block size in bytes
    #[inline]
    pub const fn size(self) -> usize {
        BLOCK_SIZES[self.0 as usize]
    }

    /// Next class up the ladder
    #[inline]
    pub const fn larger(self) -> Option<SizeClass> {
        Self::from_index(self.0 as usize + 1)
    }

    /// All classes, smallest first
    pub fn all() -> impl DoubleEndedIterator<Item = SizeClass> + ExactSizeIterator {
        (0..NUM_SIZE_CLASSES).map(|i| SizeClass(i as u8))
    }

    /// Classes strictly above `self`, smallest first
    pub fn above(self) -> impl Iterator<Item = SizeClass> {
        (self.0 as usize + 1..NUM_SIZE_CLASSES).map(|i| SizeClass(i as u8))
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.size();
        if size >= 1024 {
            write!(f, "{}KB", size / 1024)
        } else {
            write!(f, "{}B", size)
        }
    }
}

impl TryFrom<usize> for SizeClass {
    type Error = usize;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        SizeClass::from_index(index).ok_or(index)
    }
}

impl TryFrom<u8> for SizeClass {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        SizeClass::from_index(index as usize).ok_or_else(|| {
            format!(
                "size class index {} out of range (0..{})",
                index, NUM_SIZE_CLASSES
            )
        })
    }
}

impl From<SizeClass> for u8 {
    fn from(class: SizeClass) -> Self {
        class.0
    }
}
