//! Tiered array pool
//!
//! [`ArrayPool::rent`] looks for an array in three places, cheapest first:
//!
//! 1. the calling thread's cache (one slot per size class, unsynchronized)
//! 2. the shared [`Bucket`] for the size class (lock-free stack)
//! 3. a fresh allocation of exactly the size-class length
//!
//! [`ArrayPool::return_array`] walks the same tiers to find a home for the
//! array and drops it when both are full. Requests above the maximum array
//! length bypass the pool entirely.

use std::alloc::Layout;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use lazy_static::lazy_static;

use crate::bucket::Bucket;
use crate::config::{PoolConfig, MAX_POOLED_ARRAY_LENGTH};
use crate::rented::PooledArray;
use crate::size_class::SizeClasses;
use crate::stats::{PoolCounters, PoolStats};
use crate::thread_cache::{ThreadCache, ThreadCaches};
use crate::{Error, Result};

type SharedEntry = &'static (dyn Any + Send + Sync);

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);

// Process-wide pools, one per element type, created on first use
lazy_static! {
    static ref SHARED_POOLS: RwLock<HashMap<TypeId, SharedEntry>> = RwLock::new(HashMap::new());
}

/// Thread-safe pool of power-of-two length arrays
///
/// # Example
/// ```rust
/// use tierpool_core::ArrayPool;
///
/// let pool = ArrayPool::<u8>::with_limits(1024, 8)?;
/// let mut scratch = pool.rent(100)?;
/// assert_eq!(scratch.len(), 128);
/// scratch[0] = 42;
/// pool.return_array(scratch, true)?;
/// # Ok::<(), tierpool_core::Error>(())
/// ```
pub struct ArrayPool<T> {
    config: PoolConfig,
    size_classes: SizeClasses,
    buckets: Box<[Bucket<T>]>,
    thread_caches: ThreadCaches<T>,
    counters: PoolCounters,
}

impl<T: Default + Send + 'static> ArrayPool<T> {
    /// Create a pool with the default limits (16 MiB elements, 50 arrays per
    /// size class)
    pub fn new() -> Self {
        Self::build(PoolConfig::default())
    }

    /// Create a pool with custom limits; both must be at least one
    ///
    /// `max_array_length` is rounded up to the next power of two and clamped
    /// to [`MAX_POOLED_ARRAY_LENGTH`], so every array `rent` hands out can be
    /// returned. Requests between the configured value and the rounded one
    /// are served from the pool: `with_limits(100, n)` rents 128 elements for
    /// `rent(101)` and only allocates exactly for `rent(129)` and above.
    pub fn with_limits(max_array_length: usize, max_arrays_per_bucket: usize) -> Result<Self> {
        Self::from_config(PoolConfig::new(max_array_length, max_arrays_per_bucket))
    }

    /// Create a pool from a validated configuration
    ///
    /// The maximum array length is rounded and clamped as in
    /// [`with_limits`](Self::with_limits); [`config`](Self::config) reports the
    /// value in effect.
    pub fn from_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(requested: PoolConfig) -> Self {
        if requested.max_array_length > MAX_POOLED_ARRAY_LENGTH {
            log::warn!(
                "max_array_length {} clamped to {MAX_POOLED_ARRAY_LENGTH}",
                requested.max_array_length
            );
        }
        let config = PoolConfig::new(
            requested.effective_max_array_length(),
            requested.max_arrays_per_bucket,
        );
        let size_classes = SizeClasses::for_max_length(config.max_array_length);
        let buckets = size_classes
            .lengths()
            .map(|length| Bucket::new(length, config.max_arrays_per_bucket))
            .collect();
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);

        log::debug!(
            "array pool {id} for {}: {} size classes up to {}, {} arrays per bucket",
            std::any::type_name::<T>(),
            size_classes.len(),
            config.max_array_length,
            config.max_arrays_per_bucket
        );

        Self {
            config,
            size_classes,
            buckets,
            thread_caches: ThreadCaches::new(id, size_classes.len()),
            counters: PoolCounters::default(),
        }
    }

    /// The process-wide pool for element type `T`, created with the default
    /// limits on first access
    pub fn shared() -> &'static Self {
        let type_id = TypeId::of::<T>();
        let existing = SHARED_POOLS
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .copied();
        if let Some(pool) = existing.and_then(|entry| entry.downcast_ref::<Self>()) {
            return pool;
        }

        let mut pools = SHARED_POOLS.write().unwrap_or_else(PoisonError::into_inner);
        let entry: SharedEntry = *pools.entry(type_id).or_insert_with(|| {
            log::debug!(
                "creating shared array pool for {}",
                std::any::type_name::<T>()
            );
            let pool: &'static Self = Box::leak(Box::new(Self::new()));
            pool as SharedEntry
        });
        match entry.downcast_ref::<Self>() {
            Some(pool) => pool,
            None => unreachable!("shared pool registered under a foreign TypeId"),
        }
    }

    /// Rent an array of at least `minimum_length` elements
    ///
    /// Pooled lengths are rounded up to the next power of two. A length of
    /// zero yields an empty array that must not be returned. Lengths above
    /// the maximum array length are allocated exactly and never tracked.
    ///
    /// Arrays taken from the pool keep whatever contents they were returned
    /// with unless they were returned with `clear = true`.
    pub fn rent(&self, minimum_length: usize) -> Result<Box<[T]>> {
        if minimum_length == 0 {
            return Ok(Box::default());
        }

        let Some(index) = self.size_classes.index_of(minimum_length) else {
            PoolCounters::bump(&self.counters.unpooled);
            log::trace!(
                "rent({minimum_length}) above max array length {}, allocating unpooled",
                self.config.max_array_length
            );
            return allocate(minimum_length);
        };
        PoolCounters::bump(&self.counters.rented);

        let cached = self
            .thread_caches
            .with(|cache: &ThreadCache<T>| cache.take(index))
            .flatten();
        if let Some(array) = cached {
            PoolCounters::bump(&self.counters.thread_cache_hits);
            return Ok(array);
        }

        if let Some(array) = self.buckets[index].pop() {
            PoolCounters::bump(&self.counters.bucket_hits);
            return Ok(array);
        }

        PoolCounters::bump(&self.counters.allocated);
        allocate(self.size_classes.array_length(index))
    }

    /// Hand an array back to the pool
    ///
    /// With `clear` set every element is reset to `T::default()` before the
    /// array can be rented again. Arrays longer than the maximum array length
    /// are dropped without error. Zero-length and non-power-of-two arrays
    /// are rejected with [`Error::BufferMismatch`] and dropped.
    pub fn return_array(&self, mut array: Box<[T]>, clear: bool) -> Result<()> {
        let length = array.len();
        if length > self.config.max_array_length {
            PoolCounters::bump(&self.counters.discarded);
            log::trace!("return of unpooled array of length {length}, dropping");
            return Ok(());
        }
        // Covers length 0 too
        if !length.is_power_of_two() {
            log::trace!("rejecting return of array with length {length}");
            return Err(Error::buffer_mismatch(length));
        }

        let index = length.trailing_zeros() as usize;
        if clear {
            array.fill_with(T::default);
        }
        PoolCounters::bump(&self.counters.returned);

        let mut pending = Some(array);
        // The array stays here if the thread cache is unavailable
        self.thread_caches.with(|cache: &ThreadCache<T>| {
            if let Some(array) = pending.take() {
                if let Err(rejected) = cache.put(index, array) {
                    pending = Some(rejected);
                }
            }
        });
        let Some(array) = pending else {
            PoolCounters::bump(&self.counters.thread_cache_stores);
            return Ok(());
        };

        match self.buckets[index].push(array) {
            Ok(()) => PoolCounters::bump(&self.counters.bucket_stores),
            Err(rejected) => {
                PoolCounters::bump(&self.counters.discarded);
                log::trace!("bucket for length {length} full, dropping array");
                drop(rejected);
            }
        }
        Ok(())
    }

    /// Rent an array wrapped in a guard that returns it on drop
    pub fn checkout(&self, minimum_length: usize) -> Result<PooledArray<'_, T>> {
        let array = self.rent(minimum_length)?;
        Ok(PooledArray::new(array, self))
    }
}

impl<T> ArrayPool<T> {
    /// Effective configuration: `max_array_length` is the rounded, clamped
    /// value actually pooled
    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Longest array length served from the pool
    pub fn max_array_length(&self) -> usize {
        self.config.max_array_length
    }

    /// Capacity of each shared bucket
    pub fn max_arrays_per_bucket(&self) -> usize {
        self.config.max_arrays_per_bucket
    }

    /// The size classes this pool serves
    pub fn size_classes(&self) -> SizeClasses {
        self.size_classes
    }

    /// Number of arrays currently held by the shared bucket for
    /// `array_length`, or `None` if no size class has that length
    ///
    /// Does not include arrays parked in thread-local caches.
    pub fn bucket_len(&self, array_length: usize) -> Option<usize> {
        if !array_length.is_power_of_two() {
            return None;
        }
        self.buckets
            .get(array_length.trailing_zeros() as usize)
            .map(Bucket::len)
    }

    /// Snapshot of the pool's counters
    pub fn stats(&self) -> PoolStats {
        let pooled = self.buckets.iter().map(Bucket::len).sum();
        self.counters.snapshot(pooled)
    }
}

impl<T: Default + Send + 'static> Default for ArrayPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ArrayPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayPool")
            .field("element", &std::any::type_name::<T>())
            .field("config", &self.config)
            .field("size_classes", &self.size_classes.len())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Allocate `length` default-initialised elements
fn allocate<T: Default>(length: usize) -> Result<Box<[T]>> {
    Layout::array::<T>(length).map_err(|_| Error::capacity_overflow(length))?;
    let mut array = Vec::with_capacity(length);
    array.resize_with(length, T::default);
    Ok(array.into_boxed_slice())
}
