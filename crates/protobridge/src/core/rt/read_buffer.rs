// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Growable append-only buffer used while decoding repeated fields.

use std::fmt;

use super::array_pool::ArrayPool;
use crate::config::{READ_BUFFER_INITIAL_CAPACITY, READ_BUFFER_MAX_CAPACITY};
use crate::error::{Error, Result};

/// Append-only buffer over a rented array.
///
/// Capacity doubles on demand up to a hard ceiling. On drop the elements are
/// dropped and the backing array goes back to the shared [`ArrayPool`].
///
/// A field split into several runs decodes each run into its own buffer;
/// [`continuing`](Self::continuing) charges the elements of earlier runs
/// against the ceiling.
pub struct ReadBuffer<T: Send + 'static> {
    items: Vec<T>,
    max_capacity: usize,
    /// Elements already decoded for the same field.
    prior: usize,
}

impl<T: Send + 'static> ReadBuffer<T> {
    pub fn new() -> Self {
        Self::with_max_capacity(READ_BUFFER_MAX_CAPACITY)
    }

    /// Buffer with a lower ceiling than [`READ_BUFFER_MAX_CAPACITY`].
    pub fn with_max_capacity(max_capacity: usize) -> Self {
        let max_capacity = max_capacity.min(READ_BUFFER_MAX_CAPACITY);
        let initial = READ_BUFFER_INITIAL_CAPACITY.min(max_capacity.max(1));
        Self {
            items: ArrayPool::shared().rent(initial),
            max_capacity,
            prior: 0,
        }
    }

    /// Count `prior` elements from earlier runs towards the ceiling.
    #[must_use]
    pub fn continuing(mut self, prior: usize) -> Self {
        self.prior = prior;
        self
    }

    /// Elements of this run plus those of earlier runs.
    pub fn total(&self) -> usize {
        self.prior.saturating_add(self.items.len())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn push(&mut self, item: T) -> Result<()> {
        if self.total() >= self.max_capacity {
            return Err(Error::CapacityExceeded {
                requested: self.total().saturating_add(1),
                max: self.max_capacity,
            });
        }
        if self.items.len() == self.items.capacity() {
            self.grow();
        }
        self.items.push(item);
        Ok(())
    }

    fn grow(&mut self) {
        let current = self.items.capacity();
        let target = current
            .saturating_mul(2)
            .max(READ_BUFFER_INITIAL_CAPACITY)
            .min(self.max_capacity - self.prior);
        log::trace!("[read-buffer] growing {} -> {}", current, target);

        let pool = ArrayPool::shared();
        let mut next: Vec<T> = pool.rent(target);
        next.append(&mut self.items);
        let old = std::mem::replace(&mut self.items, next);
        pool.give_back(old);
    }

    /// Move the elements into a right-sized vector. The backing array is
    /// recycled when `self` drops.
    pub fn into_vec(mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.items.len());
        out.extend(self.items.drain(..));
        out
    }
}

impl<T: Send + 'static> Default for ReadBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Drop for ReadBuffer<T> {
    fn drop(&mut self) {
        ArrayPool::shared().give_back(std::mem::take(&mut self.items));
    }
}

impl<T: Send + fmt::Debug + 'static> fmt::Debug for ReadBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadBuffer")
            .field("items", &self.items)
            .field("max_capacity", &self.max_capacity)
            .field("prior", &self.prior)
            .finish()
    }
}
