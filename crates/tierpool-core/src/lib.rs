//! Core types for the tiered array pool
//!
//! This crate provides a thread-safe pool that rents and takes back
//! power-of-two length arrays so hot paths avoid repeated heap allocation.
//!
//! # Architecture Overview
//!
//! Lookups go through two tiers before falling back to the allocator:
//!
//! 1. **Thread-local cache** - one slot per size class, private to a thread,
//!    no synchronization
//! 2. **Shared buckets** - one bounded lock-free stack per size class
//!
//! Size classes double from length 1 up to the configured maximum array
//! length. Requests above the maximum are allocated exactly and never pooled.
//!
//! # Example
//!
//! ```rust
//! use tierpool_core::{ArrayPool, Error};
//!
//! let pool = ArrayPool::<f64>::new();
//!
//! let mut samples = pool.rent(1000)?;
//! assert_eq!(samples.len(), 1024);
//! samples[..1000].fill(0.5);
//! pool.return_array(samples, true)?;
//!
//! // Arrays that could not have come from a size class are rejected
//! let odd = vec![0.0; 1000].into_boxed_slice();
//! assert!(matches!(pool.return_array(odd, false), Err(Error::BufferMismatch { .. })));
//!
//! // Scoped rentals return themselves
//! {
//!     let mut scratch = ArrayPool::<u8>::shared().checkout(4096)?;
//!     scratch[0] = 1;
//! }
//! # Ok::<(), Error>(())
//! ```

pub mod bucket;
pub mod config;
pub mod error;
pub mod pool;
pub mod rented;
pub mod size_class;
pub mod stats;

mod thread_cache;

// Re-export core types
pub use error::{Error, Result};

pub use bucket::Bucket;
pub use config::{
    PoolConfig, DEFAULT_MAX_ARRAYS_PER_BUCKET, DEFAULT_MAX_ARRAY_LENGTH, MAX_POOLED_ARRAY_LENGTH,
};
pub use pool::ArrayPool;
pub use rented::PooledArray;
pub use size_class::SizeClasses;
pub use stats::PoolStats;
