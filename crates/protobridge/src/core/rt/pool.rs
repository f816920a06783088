// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Two-tier object pool for scratch state.
//!
//! Each thread keeps one object in a thread-local slot; anything beyond that
//! goes to a small shared overflow guarded by a short mutex. Neither tier
//! ever blocks: a contended lock is treated as "empty" on `try_get` and as
//! "full" on `put`.
//!
//! # Performance
//!
//! - try_get/put on the owning thread: one TLS access, no atomics

use std::cell::Cell;
use std::thread::LocalKey;

use parking_lot::Mutex;

use crate::config::{SHARED_POOL_CAPACITY, WRITER_BUFFER_MAX_RETAINED};

/// State that can be reset and reused.
pub trait Recycle: Send + 'static {
    /// Reset for reuse. Return `false` to have the object dropped instead
    /// of pooled (for example because it grew too large).
    fn recycle(&mut self) -> bool;
}

impl Recycle for Vec<u8> {
    fn recycle(&mut self) -> bool {
        self.clear();
        self.capacity() <= WRITER_BUFFER_MAX_RETAINED
    }
}

/// Thread-local fast slot plus bounded shared overflow.
///
/// Declared as a `static` next to its `thread_local!` slot:
///
/// ```ignore
/// thread_local! {
///     static LOCAL: Cell<Option<Vec<u8>>> = const { Cell::new(None) };
/// }
/// static BUFFERS: Pool<Vec<u8>> = Pool::new(&LOCAL);
/// ```
pub struct Pool<T: 'static> {
    local: &'static LocalKey<Cell<Option<T>>>,
    shared: Mutex<Vec<T>>,
}

impl<T: Recycle> Pool<T> {
    pub const fn new(local: &'static LocalKey<Cell<Option<T>>>) -> Self {
        Self {
            local,
            shared: parking_lot::const_mutex(Vec::new()),
        }
    }

    /// Take a pooled object, if any is available without waiting.
    pub fn try_get(&self) -> Option<T> {
        if let Ok(Some(item)) = self.local.try_with(Cell::take) {
            return Some(item);
        }
        self.shared.try_lock()?.pop()
    }

    /// Return an object. Dropped silently when it refuses to recycle or
    /// when both tiers are full.
    pub fn put(&self, mut item: T) {
        if !item.recycle() {
            log::trace!("[pool] dropping oversized item");
            return;
        }
        let spilled = self.local.try_with(|slot| {
            let existing = slot.take();
            match existing {
                None => {
                    slot.set(Some(item));
                    None
                }
                Some(existing) => {
                    slot.set(Some(existing));
                    Some(item)
                }
            }
        });
        let item = match spilled {
            Ok(None) => return,
            Ok(Some(item)) => item,
            // thread-local already destroyed
            Err(_) => return,
        };
        match self.shared.try_lock() {
            Some(mut shared) if shared.len() < SHARED_POOL_CAPACITY => shared.push(item),
            _ => log::trace!("[pool] shared overflow full, dropping item"),
        }
    }

    /// Objects currently parked in the shared overflow.
    pub fn shared_len(&self) -> usize {
        self.shared.lock().len()
    }
}

thread_local! {
    static LOCAL_WRITER_BUFFER: Cell<Option<Vec<u8>>> = const { Cell::new(None) };
}

/// Scratch buffers for [`ProtoWriter::rent`](crate::core::ser::ProtoWriter::rent).
pub(crate) static WRITER_BUFFERS: Pool<Vec<u8>> = Pool::new(&LOCAL_WRITER_BUFFER);
