//! Per-thread single-slot cache in front of the shared buckets
//!
//! Each thread keeps one [`ThreadCache`] per pool in a `thread_local!`
//! registry, keyed by the pool's id and type-erased so pools of any element
//! type share one map. Only the owning thread takes from or puts into its
//! slots while the pool is in use.
//!
//! A cache lives as long as its thread or its pool, whichever ends first. The
//! pool keeps a weak handle to every thread's cache and drains them all when
//! it is dropped; a thread frees its caches when it exits. Entries left behind
//! by dropped pools are pruned the next time the thread registers a cache.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::bucket::reclaim;

/// One slot per size class for a single (thread, pool) pair
///
/// Slot `i` holds an array of exactly `2^i` elements. Slots are atomic so the
/// pool can drain them from another thread once nobody can rent from it.
pub(crate) struct ThreadCache<T> {
    slots: Box<[AtomicPtr<T>]>,
    _owns: PhantomData<Box<[T]>>,
}

impl<T> ThreadCache<T> {
    pub(crate) fn new(size_classes: usize) -> Self {
        Self {
            slots: (0..size_classes)
                .map(|_| AtomicPtr::new(ptr::null_mut()))
                .collect(),
            _owns: PhantomData,
        }
    }

    /// Empty the slot for `index` and return what it held
    #[inline]
    pub(crate) fn take(&self, index: usize) -> Option<Box<[T]>> {
        let raw = self.slots[index].swap(ptr::null_mut(), Ordering::AcqRel);
        if raw.is_null() {
            return None;
        }
        // Safety: non-null slot pointers come from `put` and the swap made us
        // their only holder
        Some(unsafe { reclaim(raw, 1 << index) })
    }

    /// Fill the slot for `index` if it is empty, otherwise hand the array back
    #[inline]
    pub(crate) fn put(&self, index: usize, array: Box<[T]>) -> Result<(), Box<[T]>> {
        debug_assert_eq!(array.len(), 1 << index, "array does not match slot");
        let slot = &self.slots[index];
        if !slot.load(Ordering::Relaxed).is_null() {
            return Err(array);
        }
        let raw = Box::into_raw(array) as *mut T;
        match slot.compare_exchange(ptr::null_mut(), raw, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => Ok(()),
            // Safety: the exchange failed, so `raw` never left our hands
            Err(_) => Err(unsafe { reclaim(raw, 1 << index) }),
        }
    }

    /// Free every cached array
    pub(crate) fn drain(&self) {
        for index in 0..self.slots.len() {
            drop(self.take(index));
        }
    }

    #[cfg(test)]
    fn occupied(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !slot.load(Ordering::Acquire).is_null())
            .count()
    }
}

impl<T> Drop for ThreadCache<T> {
    fn drop(&mut self) {
        self.drain();
    }
}

// Safety: cached arrays are owned, never shared, and every access moves them
// through an atomic swap or exchange
unsafe impl<T: Send> Send for ThreadCache<T> {}
unsafe impl<T: Send> Sync for ThreadCache<T> {}

/// A thread's registry entry for one pool
struct Entry {
    pool: Weak<()>,
    cache: Arc<dyn Any + Send + Sync>,
}

// Thread-local cache storage
thread_local! {
    static THREAD_CACHES: RefCell<HashMap<u64, Entry>> = RefCell::new(HashMap::new());
}

/// A pool's handle on the caches every thread keeps for it
pub(crate) struct ThreadCaches<T> {
    id: u64,
    size_classes: usize,
    alive: Arc<()>,
    caches: Mutex<Vec<Weak<ThreadCache<T>>>>,
}

impl<T> ThreadCaches<T> {
    pub(crate) fn new(id: u64, size_classes: usize) -> Self {
        Self {
            id,
            size_classes,
            alive: Arc::new(()),
            caches: Mutex::new(Vec::new()),
        }
    }

    /// Number of thread caches still alive for this pool
    #[cfg(test)]
    pub(crate) fn live_threads(&self) -> usize {
        self.caches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|cache| cache.strong_count() > 0)
            .count()
    }
}

impl<T: Send + 'static> ThreadCaches<T> {
    /// Run `f` on the current thread's cache, creating it on first use
    ///
    /// Returns `None` without calling `f` when the registry is unavailable:
    /// during thread teardown, or on re-entrant access from inside another
    /// cache operation.
    pub(crate) fn with<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&ThreadCache<T>) -> R,
    {
        THREAD_CACHES
            .try_with(|entries| {
                let mut entries = entries.try_borrow_mut().ok()?;
                if let Some(entry) = entries.get(&self.id) {
                    return entry.cache.downcast_ref::<ThreadCache<T>>().map(f);
                }

                let cache = self.register();
                let result = f(&*cache);
                let pruned = prune_dead(&mut entries);
                entries.insert(
                    self.id,
                    Entry {
                        pool: Arc::downgrade(&self.alive),
                        cache,
                    },
                );
                // Element destructors run outside the registry borrow
                drop(entries);
                drop(pruned);
                Some(result)
            })
            .ok()
            .flatten()
    }

    fn register(&self) -> Arc<ThreadCache<T>> {
        let cache = Arc::new(ThreadCache::new(self.size_classes));
        let mut caches = self.caches.lock().unwrap_or_else(PoisonError::into_inner);
        caches.retain(|cache| cache.strong_count() > 0);
        caches.push(Arc::downgrade(&cache));
        log::trace!(
            "array pool {}: thread cache registered, {} live",
            self.id,
            caches.len()
        );
        cache
    }
}

impl<T> Drop for ThreadCaches<T> {
    fn drop(&mut self) {
        let evicted = THREAD_CACHES
            .try_with(|entries| {
                entries
                    .try_borrow_mut()
                    .ok()
                    .and_then(|mut entries| entries.remove(&self.id))
            })
            .ok()
            .flatten();
        drop(evicted);

        // Nobody can rent from the pool any more, so other threads' slots
        // are safe to empty from here
        let caches = std::mem::take(
            self.caches
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for cache in caches.iter().filter_map(Weak::upgrade) {
            cache.drain();
        }
    }
}

/// Remove entries whose pool has been dropped
fn prune_dead(entries: &mut HashMap<u64, Entry>) -> Vec<Entry> {
    let dead: Vec<u64> = entries
        .iter()
        .filter(|(_, entry)| entry.pool.strong_count() == 0)
        .map(|(&id, _)| id)
        .collect();
    dead.iter().filter_map(|id| entries.remove(id)).collect()
}

#[cfg(test)]
fn registered_entries() -> usize {
    THREAD_CACHES.with(|entries| entries.borrow().len())
}
