/*!
 * Allocator Configuration
 *
 * Region size, preallocation plan and pressure thresholds, loaded from JSON with
 * environment overrides
 */

use crate::core::limits::{
    DEFAULT_REGION_SIZE, PRESSURE_CRITICAL_THRESHOLD, PRESSURE_WARNING_THRESHOLD,
};
use crate::memory::{BlockAllocator, InitError, PreallocationPlan, RegionId};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable overriding the region size in bytes
pub const ENV_REGION_SIZE: &str = "VOS_MEM_SIZE";

/// Environment variable overriding the plan, as 15 comma separated counts
pub const ENV_PREALLOCATE: &str = "VOS_MEM_PREALLOCATE";

/// Configuration errors
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    #[diagnostic(code(config::io))]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    #[diagnostic(
        code(config::parse),
        help("Expected a JSON object with region_size and preallocation (15 counts).")
    )]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {reason}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue { key: String, reason: String },
}

/// Allocator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Bytes to reserve for the managed region
    pub region_size: usize,
    /// Blocks to pre-carve per class
    pub preallocation: PreallocationPlan,
    /// Fraction of usable bytes at which pressure is reported as high
    pub warning_threshold: f64,
    /// Fraction of usable bytes at which pressure is reported as critical
    pub critical_threshold: f64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            region_size: DEFAULT_REGION_SIZE,
            preallocation: PreallocationPlan::default(),
            warning_threshold: PRESSURE_WARNING_THRESHOLD,
            critical_threshold: PRESSURE_CRITICAL_THRESHOLD,
        }
    }
}

impl AllocatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Defaults with `VOS_MEM_SIZE` / `VOS_MEM_PREALLOCATE` applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of this configuration
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(size) = std::env::var(ENV_REGION_SIZE) {
            self.region_size = size.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_REGION_SIZE.into(),
                reason: format!("not a byte count: {:?}", size),
            })?;
        }
        if let Ok(plan) = std::env::var(ENV_PREALLOCATE) {
            self.preallocation = plan.parse().map_err(|e: crate::memory::MemoryError| {
                ConfigError::InvalidValue {
                    key: ENV_PREALLOCATE.into(),
                    reason: e.to_string(),
                }
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |v: f64| v > 0.0 && v <= 1.0;
        if !in_range(self.warning_threshold) || !in_range(self.critical_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "thresholds".into(),
                reason: "must be in (0, 1]".into(),
            });
        }
        if self.warning_threshold > self.critical_threshold {
            return Err(ConfigError::InvalidValue {
                key: "warning_threshold".into(),
                reason: format!(
                    "{} is above critical_threshold {}",
                    self.warning_threshold, self.critical_threshold
                ),
            });
        }
        self.preallocation
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                key: "preallocation".into(),
                reason: e.to_string(),
            })
    }

    /// Allocate the backing memory and initialize an allocator over it
    pub fn build(&self) -> Result<(BlockAllocator, RegionId), InitError> {
        let allocator = BlockAllocator::new()
            .with_thresholds(self.warning_threshold, self.critical_threshold);
        let region = vec![0u8; self.region_size].into_boxed_slice();
        let id = allocator.init(region, Some(&self.preallocation))?;
        Ok((allocator, id))
    }
}
