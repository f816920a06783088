// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide pool of backing arrays for [`ReadBuffer`](super::ReadBuffer).
//!
//! Arrays are bucketed by element type and power-of-two size class. Each
//! bucket is a bounded lock-free queue; a full bucket drops the array.

use std::any::{Any, TypeId};
use std::sync::OnceLock;

use crossbeam::queue::ArrayQueue;
use dashmap::DashMap;

use crate::config::{ARRAY_POOL_ARRAYS_PER_BUCKET, ARRAY_POOL_MAX_RETAINED};

type Bucket = ArrayQueue<Box<dyn Any + Send>>;

/// Size-classed array pool keyed by `(element type, class)`.
pub struct ArrayPool {
    buckets: DashMap<(TypeId, usize), Bucket>,
}

static SHARED: OnceLock<ArrayPool> = OnceLock::new();

impl ArrayPool {
    fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// The process-wide instance.
    pub fn shared() -> &'static ArrayPool {
        SHARED.get_or_init(ArrayPool::new)
    }

    /// Smallest class able to hold `min_capacity` elements.
    fn class_for_request(min_capacity: usize) -> usize {
        min_capacity.max(1).next_power_of_two()
    }

    /// Largest class an array of `capacity` fully covers.
    fn class_for_capacity(capacity: usize) -> usize {
        1 << (usize::BITS - 1 - capacity.leading_zeros())
    }

    /// Empty vector with capacity of at least `min_capacity`.
    pub fn rent<T: Send + 'static>(&self, min_capacity: usize) -> Vec<T> {
        let class = Self::class_for_request(min_capacity);
        if let Some(bucket) = self.buckets.get(&(TypeId::of::<T>(), class)) {
            if let Some(array) = bucket.pop() {
                if let Ok(array) = array.downcast::<Vec<T>>() {
                    return *array;
                }
            }
        }
        Vec::with_capacity(class)
    }

    /// Clear `array` (dropping its elements) and keep it for a later rent.
    pub fn give_back<T: Send + 'static>(&self, mut array: Vec<T>) {
        array.clear();
        let capacity = array.capacity();
        if capacity == 0 || capacity > ARRAY_POOL_MAX_RETAINED {
            return;
        }
        let key = (TypeId::of::<T>(), Self::class_for_capacity(capacity));
        let bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| ArrayQueue::new(ARRAY_POOL_ARRAYS_PER_BUCKET));
        if bucket.push(Box::new(array)).is_err() {
            log::trace!("[array-pool] bucket full for class {}", key.1);
        }
    }

    /// Arrays currently pooled for element type `T`.
    pub fn pooled<T: 'static>(&self) -> usize {
        let id = TypeId::of::<T>();
        self.buckets
            .iter()
            .filter(|entry| entry.key().0 == id)
            .map(|entry| entry.value().len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_classes() {
        assert_eq!(ArrayPool::class_for_request(0), 1);
        assert_eq!(ArrayPool::class_for_request(16), 16);
        assert_eq!(ArrayPool::class_for_request(17), 32);
        assert_eq!(ArrayPool::class_for_capacity(16), 16);
        assert_eq!(ArrayPool::class_for_capacity(31), 16);
        assert_eq!(ArrayPool::class_for_capacity(32), 32);
    }

    #[test]
    fn test_rent_reuses_returned_array() {
        #[derive(Debug)]
        struct Marker;

        let pool = ArrayPool::new();
        let mut array: Vec<Marker> = pool.rent(20);
        assert!(array.capacity() >= 32);
        array.push(Marker);
        pool.give_back(array);
        assert_eq!(pool.pooled::<Marker>(), 1);

        let again: Vec<Marker> = pool.rent(20);
        assert!(again.is_empty());
        assert!(again.capacity() >= 32);
        assert_eq!(pool.pooled::<Marker>(), 0);
    }

    #[test]
    fn test_element_types_do_not_mix() {
        let pool = ArrayPool::new();
        pool.give_back(Vec::<u32>::with_capacity(8));
        let other: Vec<u64> = pool.rent(8);
        assert!(other.capacity() >= 8);
        assert_eq!(pool.pooled::<u32>(), 1);
    }

    #[test]
    fn test_bucket_is_bounded() {
        let pool = ArrayPool::new();
        for _ in 0..(ARRAY_POOL_ARRAYS_PER_BUCKET + 3) {
            pool.give_back(Vec::<i16>::with_capacity(4));
        }
        assert_eq!(pool.pooled::<i16>(), ARRAY_POOL_ARRAYS_PER_BUCKET);
    }
}
