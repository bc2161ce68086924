//! Pool configuration

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default maximum pooled array length (16 MiB elements)
pub const DEFAULT_MAX_ARRAY_LENGTH: usize = 16 * 1024 * 1024;

/// Default number of arrays retained per size class in the shared buckets
pub const DEFAULT_MAX_ARRAYS_PER_BUCKET: usize = 50;

/// Upper bound on the pooled array length; larger configured values are clamped
pub const MAX_POOLED_ARRAY_LENGTH: usize = 1 << 30;

/// Limits for an [`ArrayPool`](crate::ArrayPool)
///
/// `max_array_length` is the longest array the pool tracks; requests above it
/// are served by plain allocation. `max_arrays_per_bucket` bounds how many
/// arrays each shared size class retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Longest array length served from the pool
    pub max_array_length: usize,
    /// Capacity of each shared bucket
    pub max_arrays_per_bucket: usize,
}

impl PoolConfig {
    /// Create a configuration from explicit limits
    pub fn new(max_array_length: usize, max_arrays_per_bucket: usize) -> Self {
        Self {
            max_array_length,
            max_arrays_per_bucket,
        }
    }

    /// Set the longest pooled array length
    pub fn with_max_array_length(mut self, max_array_length: usize) -> Self {
        self.max_array_length = max_array_length;
        self
    }

    /// Set the capacity of each shared bucket
    pub fn with_max_arrays_per_bucket(mut self, max_arrays_per_bucket: usize) -> Self {
        self.max_arrays_per_bucket = max_arrays_per_bucket;
        self
    }

    /// Check that both limits are at least one
    pub fn validate(&self) -> Result<()> {
        if self.max_array_length == 0 {
            return Err(Error::zero_limit("max_array_length"));
        }
        if self.max_arrays_per_bucket == 0 {
            return Err(Error::zero_limit("max_arrays_per_bucket"));
        }
        Ok(())
    }

    /// The maximum length actually pooled: rounded up to a power of two and
    /// clamped to [`MAX_POOLED_ARRAY_LENGTH`]
    pub fn effective_max_array_length(&self) -> usize {
        self.max_array_length
            .min(MAX_POOLED_ARRAY_LENGTH)
            .max(1)
            .next_power_of_two()
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ARRAY_LENGTH, DEFAULT_MAX_ARRAYS_PER_BUCKET)
    }
}
