//! Pool usage counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a pool's activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Rents of a pooled size class
    pub rented: u64,
    /// Rents served from the calling thread's cache
    pub thread_cache_hits: u64,
    /// Rents served from a shared bucket
    pub bucket_hits: u64,
    /// Rents of a pooled size class that had to allocate
    pub allocated: u64,
    /// Rents above the maximum array length, allocated and never tracked
    pub unpooled: u64,
    /// Arrays accepted by `return_array` for a pooled size class
    pub returned: u64,
    /// Returns kept in the calling thread's cache
    pub thread_cache_stores: u64,
    /// Returns kept in a shared bucket
    pub bucket_stores: u64,
    /// Returns dropped because both tiers were full, or because the array was
    /// above the maximum array length
    pub discarded: u64,
    /// Arrays currently held by the shared buckets
    pub pooled_in_buckets: usize,
}

impl PoolStats {
    /// Fraction of pooled rents served without allocating (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.rented == 0 {
            0.0
        } else {
            (self.thread_cache_hits + self.bucket_hits) as f64 / self.rented as f64
        }
    }
}

/// Live counters behind [`PoolStats`]
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub(crate) rented: AtomicU64,
    pub(crate) thread_cache_hits: AtomicU64,
    pub(crate) bucket_hits: AtomicU64,
    pub(crate) allocated: AtomicU64,
    pub(crate) unpooled: AtomicU64,
    pub(crate) returned: AtomicU64,
    pub(crate) thread_cache_stores: AtomicU64,
    pub(crate) bucket_stores: AtomicU64,
    pub(crate) discarded: AtomicU64,
}

impl PoolCounters {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, pooled_in_buckets: usize) -> PoolStats {
        PoolStats {
            rented: self.rented.load(Ordering::Relaxed),
            thread_cache_hits: self.thread_cache_hits.load(Ordering::Relaxed),
            bucket_hits: self.bucket_hits.load(Ordering::Relaxed),
            allocated: self.allocated.load(Ordering::Relaxed),
            unpooled: self.unpooled.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            thread_cache_stores: self.thread_cache_stores.load(Ordering::Relaxed),
            bucket_stores: self.bucket_stores.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            pooled_in_buckets,
        }
    }
}
