//! Shared utilities for integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

/// Requested lengths around every power-of-two boundary up to `max`
pub fn boundary_lengths(max: usize) -> Vec<usize> {
    let mut lengths = vec![1, 2, 3];
    let mut power = 4;
    while power <= max {
        lengths.extend([power - 1, power, power + 1]);
        power <<= 1;
    }
    lengths.retain(|&length| length <= max);
    lengths.dedup();
    lengths
}

/// Thread-safe registry of arrays currently rented out, keyed by address
///
/// Registration fails if an address is already live, which would mean the
/// pool handed one allocation to two renters.
#[derive(Default)]
pub struct LiveArrays {
    addresses: Mutex<HashSet<usize>>,
}

impl LiveArrays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rented array; panics on a duplicate
    pub fn register<T>(&self, array: &[T]) {
        let addr = array.as_ptr() as usize;
        let fresh = self.addresses.lock().unwrap().insert(addr);
        assert!(fresh, "array at {addr:#x} is already rented out");
    }

    /// Forget an array before it is returned
    pub fn deregister<T>(&self, array: &[T]) {
        let addr = array.as_ptr() as usize;
        let removed = self.addresses.lock().unwrap().remove(&addr);
        assert!(removed, "array at {addr:#x} was not registered");
    }

    pub fn len(&self) -> usize {
        self.addresses.lock().unwrap().len()
    }
}

/// Thread count for stress tests: at least four, so contention happens on
/// small machines too
pub fn stress_threads() -> usize {
    num_cpus::get().clamp(4, 16)
}
