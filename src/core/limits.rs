/*!
 * System Limits and Constants
 *
 * Centralized location for the allocator's compatibility constants and thresholds.
 * The size ladder and the default preallocation plan are part of the configuration
 * contract: existing configuration data refers to classes by index, so these values
 * must not change.
 */

use std::time::Duration;

// =============================================================================
// SIZE CLASSES
// =============================================================================

/// Number of block size classes
pub const NUM_SIZE_CLASSES: usize = 15;

/// Block sizes served by the allocator, smallest first
pub const BLOCK_SIZES: [usize; NUM_SIZE_CLASSES] = [
    32, 64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768, 65536, 131072, 262144, 524288,
];

/// Smallest block (32 bytes)
/// Also the granule used for block tags: every block starts on a 32-byte boundary
pub const MIN_BLOCK_SIZE: usize = BLOCK_SIZES[0];

/// Largest block (512KB)
/// Requests above this are refused, never served from several blocks
pub const MAX_BLOCK_SIZE: usize = BLOCK_SIZES[NUM_SIZE_CLASSES - 1];

// =============================================================================
// PREALLOCATION
// =============================================================================

/// Max blocks of a single class that may be pre-carved at init
pub const MAX_PREALLOCATE: u32 = 10;

/// Default preallocation plan
/// One block each of 16KB/32KB/64KB and four of 128KB, everything else carved lazily
pub const DEFAULT_PREALLOCATION: [u32; NUM_SIZE_CLASSES] =
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 4, 0, 0];

// =============================================================================
// REGION
// =============================================================================

/// Default region size for the demo binary (4MB)
pub const DEFAULT_REGION_SIZE: usize = 4 * 1024 * 1024;

/// Largest region the slot table can index (u32 granules)
pub const MAX_REGION_SIZE: usize = ((u32::MAX - 1) as usize).saturating_mul(MIN_BLOCK_SIZE);

/// Memory pressure thresholds (fraction of usable bytes allocated)
pub const PRESSURE_MEDIUM_THRESHOLD: f64 = 0.60;
pub const PRESSURE_WARNING_THRESHOLD: f64 = 0.80;
pub const PRESSURE_CRITICAL_THRESHOLD: f64 = 0.95;

// =============================================================================
// IPC LIMITS
// =============================================================================

/// Max messages a single queue may hold
pub const MAX_QUEUE_CAPACITY: usize = 10_000;

/// Max shared memory segment size (100MB)
pub const MAX_SEGMENT_SIZE: usize = 100 * 1024 * 1024;

/// Default receive timeout used by the demo binary
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(100);
