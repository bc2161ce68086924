//! Shared lock-free stack of same-length arrays
//!
//! A [`Bucket`] holds up to `capacity` arrays that all have the bucket's fixed
//! length. An atomic counter acts as the top of the stack and bounds
//! occupancy; slots are atomic thin pointers whose ownership moves only
//! through `swap`, so an array is never owned by two parties at once.
//!
//! The counter and the slot are updated in two steps, so a `pop` may claim a
//! slot whose `push` has not landed yet. It then reports a miss. A `push` that
//! lands on a slot still holding an uncollected array takes that array over and
//! frees it. Both outcomes keep ownership exclusive and lose nothing but a
//! reuse opportunity.

use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

/// Bounded lock-free LIFO of arrays of one fixed length
pub struct Bucket<T> {
    array_length: usize,
    count: CachePadded<AtomicUsize>,
    slots: Box<[AtomicPtr<T>]>,
    _owns: PhantomData<Box<[T]>>,
}

impl<T> Bucket<T> {
    /// Create an empty bucket for arrays of `array_length` elements
    pub fn new(array_length: usize, capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| AtomicPtr::new(ptr::null_mut()))
            .collect();
        Self {
            array_length,
            count: CachePadded::new(AtomicUsize::new(0)),
            slots,
            _owns: PhantomData,
        }
    }

    /// Length of every array stored in this bucket
    #[inline]
    pub fn array_length(&self) -> usize {
        self.array_length
    }

    /// Maximum number of arrays retained
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Current stack height
    ///
    /// Under concurrent use this is a snapshot and may briefly count a slot
    /// whose array is still in transit.
    #[inline]
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Check if the stack height is zero
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the most recently pushed array, if any
    pub fn pop(&self) -> Option<Box<[T]>> {
        let mut top = self.count.load(Ordering::Acquire);
        loop {
            if top == 0 {
                return None;
            }
            match self.count.compare_exchange_weak(
                top,
                top - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => top = actual,
            }
        }

        let raw = self.slots[top - 1].swap(ptr::null_mut(), Ordering::AcqRel);
        if raw.is_null() {
            return None;
        }
        // Safety: non-null slot pointers come from `into_raw` in `push` and the
        // swap above made us their only holder
        Some(unsafe { reclaim(raw, self.array_length) })
    }

    /// Store an array, handing it back if the bucket is full
    ///
    /// # Panics
    /// In debug builds, if the array length differs from the bucket's
    pub fn push(&self, array: Box<[T]>) -> Result<(), Box<[T]>> {
        debug_assert_eq!(
            array.len(),
            self.array_length,
            "array does not match bucket length"
        );

        let mut top = self.count.load(Ordering::Acquire);
        loop {
            if top >= self.slots.len() {
                return Err(array);
            }
            match self.count.compare_exchange_weak(
                top,
                top + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => top = actual,
            }
        }

        let raw = Box::into_raw(array) as *mut T;
        let displaced = self.slots[top].swap(raw, Ordering::AcqRel);
        if !displaced.is_null() {
            log::trace!(
                "bucket[{}]: slot {top} still held an uncollected array, dropping it",
                self.array_length
            );
            // Safety: the swap transferred the displaced pointer to us
            drop(unsafe { reclaim(displaced, self.array_length) });
        }
        Ok(())
    }
}

/// Rebuild the boxed array behind a slot pointer
///
/// # Safety
/// `raw` must come from `Box::into_raw` on an array of `length` elements and
/// must not be reachable from any slot.
pub(crate) unsafe fn reclaim<T>(raw: *mut T, length: usize) -> Box<[T]> {
    Box::from_raw(ptr::slice_from_raw_parts_mut(raw, length))
}

impl<T> Drop for Bucket<T> {
    fn drop(&mut self) {
        let array_length = self.array_length;
        for slot in self.slots.iter_mut() {
            let raw = std::mem::replace(slot.get_mut(), ptr::null_mut());
            if !raw.is_null() {
                // Safety: `&mut self` rules out concurrent access and the slot
                // was the pointer's only holder
                drop(unsafe { reclaim(raw, array_length) });
            }
        }
    }
}

impl<T> std::fmt::Debug for Bucket<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("array_length", &self.array_length)
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

// Safety: the bucket owns the arrays behind its slot pointers and only moves
// them between threads, never shares them, so `T: Send` is sufficient
unsafe impl<T: Send> Send for Bucket<T> {}
// Safety: every shared-access path transfers ownership through atomic swaps
unsafe impl<T: Send> Sync for Bucket<T> {}
