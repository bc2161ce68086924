//! Power-of-two size classes
//!
//! Class `k` holds arrays of exactly `2^k` elements. Classes run from length 1
//! up to the pool's effective maximum array length.

use crate::config::MAX_POOLED_ARRAY_LENGTH;

/// The set of size classes served by one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClasses {
    max_index: usize,
}

impl SizeClasses {
    /// Size classes covering lengths `1..=max_array_length`
    ///
    /// `max_array_length` is clamped to [`MAX_POOLED_ARRAY_LENGTH`] and rounded
    /// up to a power of two, so the largest class may exceed it.
    pub fn for_max_length(max_array_length: usize) -> Self {
        Self {
            max_index: index_for(max_array_length.min(MAX_POOLED_ARRAY_LENGTH)),
        }
    }

    /// Index of the smallest class that fits `length`, or `None` when the
    /// length is beyond the largest class and must not be pooled
    #[inline]
    pub fn index_of(&self, length: usize) -> Option<usize> {
        if length > self.max_array_length() {
            return None;
        }
        Some(index_for(length))
    }

    /// Array length stored in class `index`
    #[inline]
    pub fn array_length(&self, index: usize) -> usize {
        debug_assert!(index <= self.max_index, "size class {index} out of range");
        1 << index
    }

    /// Longest pooled array length
    #[inline]
    pub fn max_array_length(&self) -> usize {
        1 << self.max_index
    }

    /// Number of classes
    #[inline]
    pub fn len(&self) -> usize {
        self.max_index + 1
    }

    /// Always false: there is at least the length-1 class
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over the array length of every class, smallest first
    pub fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).map(move |index| self.array_length(index))
    }
}

// Lengths 0 and 1 share class 0. Callers bound `length` well below the point
// where `next_power_of_two` would overflow.
#[inline]
fn index_for(length: usize) -> usize {
    length.max(1).next_power_of_two().trailing_zeros() as usize
}
