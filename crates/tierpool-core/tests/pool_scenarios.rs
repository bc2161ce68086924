//! End-to-end rent/return behaviour of a single pool
//!
//! Covers the reuse paths through both tiers, the unpooled path, and the
//! error cases of `return_array`.

mod common;

use common::boundary_lengths;
use tierpool_core::{ArrayPool, Error, PoolConfig, PoolStats};

#[test]
fn test_rent_length_is_smallest_power_of_two() {
    let pool: ArrayPool<u8> = ArrayPool::with_limits(4096, 4).unwrap();
    for length in boundary_lengths(4096) {
        let array = pool.rent(length).unwrap();
        assert_eq!(
            array.len(),
            length.next_power_of_two(),
            "rent({length}) returned the wrong size class"
        );
        pool.return_array(array, false).unwrap();
    }
}

#[test]
fn test_same_thread_reuse_with_defaults() {
    // Default limits: 16 MiB max length, 50 arrays per bucket
    let pool: ArrayPool<u8> = ArrayPool::new();
    assert_eq!(pool.config(), PoolConfig::default());

    let first = pool.rent(10).unwrap();
    assert_eq!(first.len(), 16);
    let addr = first.as_ptr();
    pool.return_array(first, false).unwrap();

    let second = pool.rent(10).unwrap();
    assert_eq!(second.as_ptr(), addr, "thread-local fast path should hand back the same array");
}

#[test]
fn test_retained_count_is_bounded() {
    let pool: ArrayPool<u8> = ArrayPool::with_limits(64, 2).unwrap();
    let max_retained = 1 + pool.max_arrays_per_bucket() as u64;

    for _ in 0..5 {
        pool.return_array(vec![0u8; 64].into_boxed_slice(), false).unwrap();
        let stats = pool.stats();
        assert!(stats.thread_cache_stores + stats.bucket_stores <= max_retained);
        assert!(pool.bucket_len(64).unwrap() <= pool.max_arrays_per_bucket());
    }

    let stats = pool.stats();
    assert_eq!(stats.returned, 5);
    assert_eq!(stats.thread_cache_stores, 1);
    assert_eq!(stats.bucket_stores, 2);
    assert_eq!(stats.discarded, 2);
    assert_eq!(stats.pooled_in_buckets, 2);

    // Everything retained can be rented back; the next rent allocates
    let held: Vec<_> = (0..3).map(|_| pool.rent(64).unwrap()).collect();
    assert_eq!(pool.stats().allocated, 0);
    let _extra = pool.rent(64).unwrap();
    assert_eq!(pool.stats().allocated, 1);
    drop(held);
}

#[test]
fn test_unpooled_rent_is_never_reused() {
    let pool: ArrayPool<u8> = ArrayPool::with_limits(16, 4).unwrap();

    let big = pool.rent(17).unwrap();
    assert_eq!(big.len(), 17);
    assert!(pool.return_array(big, false).is_ok());

    let pooled = pool.rent(16).unwrap();
    assert_eq!(pooled.len(), 16);
    let again = pool.rent(17).unwrap();
    assert_eq!(again.len(), 17);

    let stats = pool.stats();
    assert_eq!(stats.thread_cache_hits, 0);
    assert_eq!(stats.bucket_hits, 0);
    assert_eq!(stats.pooled_in_buckets, 0);
    assert_eq!(stats.unpooled, 2);
}

#[test]
fn test_return_errors() {
    let pool: ArrayPool<i64> = ArrayPool::with_limits(1024, 8).unwrap();

    let empty = pool.rent(0).unwrap();
    assert_eq!(
        pool.return_array(empty, false),
        Err(Error::BufferMismatch { length: 0 })
    );

    for length in [3usize, 5, 6, 7, 100, 1000] {
        let array = vec![0i64; length].into_boxed_slice();
        assert_eq!(
            pool.return_array(array, false),
            Err(Error::BufferMismatch { length })
        );
    }

    // Oversized arrays are ignored even when their length is not a power of two
    assert!(pool.return_array(vec![0i64; 1500].into_boxed_slice(), false).is_ok());
    assert!(pool.return_array(vec![0i64; 2048].into_boxed_slice(), false).is_ok());
    assert_eq!(pool.stats().returned, 0);
}

#[test]
fn test_clear_contents_is_observed_by_next_rent() {
    let pool: ArrayPool<String> = ArrayPool::with_limits(8, 2).unwrap();

    // Fill three arrays so both tiers hold dirty data before clearing
    let mut arrays: Vec<_> = (0..3).map(|_| pool.rent(8).unwrap()).collect();
    for array in &mut arrays {
        array.iter_mut().for_each(|s| s.push_str("secret"));
    }
    for array in arrays {
        pool.return_array(array, true).unwrap();
    }

    for _ in 0..3 {
        let array = pool.rent(8).unwrap();
        assert!(array.iter().all(String::is_empty));
    }
}

#[test]
fn test_configuration_errors() {
    assert!(matches!(
        ArrayPool::<u8>::with_limits(0, 50),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        ArrayPool::<u8>::with_limits(1024, 0),
        Err(Error::Configuration(_))
    ));
    assert!(ArrayPool::<u8>::from_config(PoolConfig::new(1, 1)).is_ok());
}

#[test]
fn test_single_element_pool() {
    let pool: ArrayPool<u32> = ArrayPool::with_limits(1, 1).unwrap();
    assert_eq!(pool.size_classes().len(), 1);

    let one = pool.rent(1).unwrap();
    assert_eq!(one.len(), 1);
    pool.return_array(one, false).unwrap();

    assert_eq!(pool.rent(2).unwrap().len(), 2);
    assert_eq!(pool.stats().unpooled, 1);
}

#[test]
fn test_stats_account_for_every_rent() {
    let pool: ArrayPool<u8> = ArrayPool::with_limits(256, 3).unwrap();
    let mut held = Vec::new();
    for length in [1, 7, 64, 200, 256] {
        held.push(pool.rent(length).unwrap());
    }
    for array in held.drain(..) {
        pool.return_array(array, false).unwrap();
    }
    for length in [1, 7, 64, 200, 256] {
        held.push(pool.rent(length).unwrap());
    }

    let PoolStats {
        rented,
        thread_cache_hits,
        bucket_hits,
        allocated,
        ..
    } = pool.stats();
    assert_eq!(rented, 10);
    assert_eq!(rented, thread_cache_hits + bucket_hits + allocated);
    // The second 256-length array found the thread slot taken
    assert_eq!(thread_cache_hits, 4);
    assert_eq!(bucket_hits, 1);
    assert!((pool.stats().hit_rate() - 0.5).abs() < 1e-12);
}
