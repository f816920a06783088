// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Key positions of a map being decoded.
//!
//! Dynamic maps are stored as `Vec<(Value, Value)>` in wire order. While
//! decoding, an [`EntryIndex`] keeps the position of every key so a
//! repeated key replaces its entry in place without scanning the vector.

use crate::dynamic::Value;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};

/// Hash of a map key, consistent with `Value`'s `PartialEq`.
///
/// Composite values only contribute their variant; they are never valid
/// keys and simply share a bucket.
struct KeyHash<'a>(&'a Value);

impl Hash for KeyHash<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self.0).hash(state);
        match self.0 {
            Value::Bool(v) => v.hash(state),
            Value::I8(v) => v.hash(state),
            Value::I16(v) => v.hash(state),
            Value::I32(v) => v.hash(state),
            Value::I64(v) => v.hash(state),
            Value::U8(v) => v.hash(state),
            Value::U16(v) => v.hash(state),
            Value::U32(v) => v.hash(state),
            Value::U64(v) => v.hash(state),
            // 0.0 == -0.0; NaN never compares equal so its bucket is moot
            Value::F32(v) => (if *v == 0.0 { 0 } else { v.to_bits() }).hash(state),
            Value::F64(v) => (if *v == 0.0 { 0 } else { v.to_bits() }).hash(state),
            Value::String(v) => v.hash(state),
            Value::Bytes(v) => v.hash(state),
            Value::Guid(v) => v.hash(state),
            Value::Decimal(v) => v.hash(state),
            Value::DateTime(v) => v.hash(state),
            Value::TimeSpan(v) => v.hash(state),
            Value::Enum(v) => v.hash(state),
            Value::Null | Value::Message(_) | Value::List(_) | Value::Map(_) => {}
        }
    }
}

/// Positions of the keys of one decoded map, bucketed by key hash.
#[derive(Debug, Default)]
pub(crate) struct EntryIndex {
    state: RandomState,
    slots: HashMap<u64, Vec<usize>>,
    /// Number of entries the index covers.
    covered: usize,
}

impl EntryIndex {
    /// Re-index when `entries` changed behind the index's back.
    pub(crate) fn sync(&mut self, entries: &[(Value, Value)]) {
        if self.covered == entries.len() {
            return;
        }
        self.slots.clear();
        self.covered = 0;
        for (at, (key, _)) in entries.iter().enumerate() {
            let hash = self.state.hash_one(KeyHash(key));
            let bucket = self.slots.entry(hash).or_default();
            // keys are unique already; keep the first position if not
            if !bucket.iter().any(|&seen| entries[seen].0 == *key) {
                bucket.push(at);
            }
            self.covered += 1;
        }
    }

    /// Append `(key, value)`, or replace the value of an equal key.
    pub(crate) fn upsert(&mut self, entries: &mut Vec<(Value, Value)>, key: Value, value: Value) {
        self.sync(entries);
        let hash = self.state.hash_one(KeyHash(&key));
        let bucket = self.slots.entry(hash).or_default();
        let found = bucket
            .iter()
            .copied()
            .find(|&at| entries.get(at).is_some_and(|(existing, _)| *existing == key));
        match found.and_then(|at| entries.get_mut(at)) {
            Some(entry) => entry.1 = value,
            None => {
                bucket.push(entries.len());
                entries.push((key, value));
                self.covered += 1;
            }
        }
    }
}
