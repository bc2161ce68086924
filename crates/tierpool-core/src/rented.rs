//! RAII guard for a rented array

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::pool::ArrayPool;

/// A rented array that goes back to its pool when dropped
///
/// Created by [`ArrayPool::checkout`]. Derefs to `[T]`.
pub struct PooledArray<'a, T: Default + Send + 'static> {
    array: Option<Box<[T]>>,
    pool: &'a ArrayPool<T>,
    clear_on_return: bool,
}

impl<'a, T: Default + Send + 'static> PooledArray<'a, T> {
    pub(crate) fn new(array: Box<[T]>, pool: &'a ArrayPool<T>) -> Self {
        Self {
            array: Some(array),
            pool,
            clear_on_return: false,
        }
    }

    /// Reset every element to `T::default()` when the array is returned
    pub fn clear_on_return(mut self) -> Self {
        self.clear_on_return = true;
        self
    }

    /// Take the array out of the guard; it will not be returned to the pool
    pub fn into_inner(mut self) -> Box<[T]> {
        self.array.take().unwrap_or_default()
    }

    /// The pool this array will be returned to
    pub fn pool(&self) -> &'a ArrayPool<T> {
        self.pool
    }
}

impl<T: Default + Send + 'static> Deref for PooledArray<'_, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.array.as_deref().unwrap_or(&[])
    }
}

impl<T: Default + Send + 'static> DerefMut for PooledArray<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.array.as_deref_mut().unwrap_or(&mut [])
    }
}

impl<T: Default + Send + 'static> Drop for PooledArray<'_, T> {
    fn drop(&mut self) {
        let Some(array) = self.array.take() else {
            return;
        };
        // rent(0) arrays are never poolable
        if array.is_empty() {
            return;
        }
        if let Err(err) = self.pool.return_array(array, self.clear_on_return) {
            log::debug!("pooled array not returned: {err}");
        }
    }
}

impl<T: Default + Send + 'static + fmt::Debug> fmt::Debug for PooledArray<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledArray")
            .field("array", &self.array)
            .field("clear_on_return", &self.clear_on_return)
            .finish()
    }
}
