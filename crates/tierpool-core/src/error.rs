//! Error types for the array pool
//!
//! Provides a unified error type for pool construction, renting and returning.

use thiserror::Error;

/// Core error type for array pool operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid pool configuration supplied at construction time
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid argument passed to a pool operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An array handed back to the pool could not have come from it
    #[error("Buffer mismatch: array of length {length} does not belong to any size class")]
    BufferMismatch { length: usize },
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for a configuration limit that must be at least one
    pub fn zero_limit(name: &str) -> Self {
        Self::Configuration(format!("{name} must be at least 1"))
    }

    /// Create an error for a length whose byte size cannot be allocated
    pub fn capacity_overflow(length: usize) -> Self {
        Self::InvalidArgument(format!(
            "Requested length {length} exceeds the maximum allocation size"
        ))
    }

    /// Create an error for an array that cannot be returned to the pool
    pub fn buffer_mismatch(length: usize) -> Self {
        Self::BufferMismatch { length }
    }
}
