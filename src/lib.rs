//! # tierpool
//!
//! A thread-safe pool of power-of-two length arrays for allocation-heavy hot
//! paths.
//!
//! ## Quick Start
//!
//! ```rust
//! use tierpool::ArrayPool;
//!
//! let pool = ArrayPool::<f32>::shared();
//! let mut frame = pool.rent(480)?;
//! assert_eq!(frame.len(), 512);
//! frame.fill(0.25);
//! pool.return_array(frame, true)?;
//! # Ok::<(), tierpool::Error>(())
//! ```
//!
//! ## Crate Organization
//!
//! - [`tierpool_core`]: size classes, buckets, thread caches and the pool

pub use tierpool_core;
pub use tierpool_core::*;
