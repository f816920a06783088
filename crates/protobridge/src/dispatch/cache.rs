// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-model dispatch cache.
//!
//! Lookups read an immutable snapshot of the type-key to handle map without
//! taking a lock. Publishing clones the snapshot under a mutex, inserts the
//! new handle and swaps the snapshot in; when two threads race to build the
//! same key, the first published handle wins and both callers receive it.
//!
//! # Performance
//!
//! - Hit: one atomic snapshot load plus a hash lookup.
//! - Miss: handle construction plus an O(n) snapshot copy. Type sets are
//!   small and misses happen once per type, so reads stay wait-free.
//! - Known type without a handle: the failure is remembered together with
//!   the model's registration generation and answered without a rebuild
//!   until something new is registered.

use super::handle::{ConcreteHandle, DispatchHandle};
use crate::dynamic::{TypeDescriptor, TypeKind};
use crate::model::TypeModel;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Snapshot = HashMap<Arc<str>, Arc<DispatchHandle>>;

/// Lookup counters.
#[derive(Debug, Default)]
pub struct LookupStats {
    hits: AtomicU64,
    misses: AtomicU64,
    nil_fallbacks: AtomicU64,
    failed_hits: AtomicU64,
}

impl LookupStats {
    /// Lookups answered from the snapshot.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that had to build a handle.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Known types whose handle could not be built.
    pub fn nil_fallbacks(&self) -> u64 {
        self.nil_fallbacks.load(Ordering::Relaxed)
    }

    /// Lookups answered by a remembered build failure.
    pub fn failed_hits(&self) -> u64 {
        self.failed_hits.load(Ordering::Relaxed)
    }
}

/// Type key to [`DispatchHandle`] map with publish-once semantics.
pub struct DispatchCache {
    snapshot: ArcSwap<Snapshot>,
    publish: Mutex<()>,
    nil: Arc<DispatchHandle>,
    /// Type key to the model generation its build failed at.
    failures: DashMap<Arc<str>, u64>,
    stats: LookupStats,
}

impl DispatchCache {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HashMap::new()),
            publish: Mutex::new(()),
            nil: Arc::new(DispatchHandle::Nil),
            failures: DashMap::new(),
            stats: LookupStats::default(),
        }
    }

    /// The shared Nil handle.
    pub fn nil(&self) -> Arc<DispatchHandle> {
        Arc::clone(&self.nil)
    }

    /// Handle for `type_name`, building and publishing it on first use.
    ///
    /// Absent, unknown and open generic types resolve to the Nil handle,
    /// which is never cached: registering the type later makes it resolvable.
    /// A known type that fails to build is not rebuilt until the model's
    /// generation moves on.
    pub fn get(&self, model: &TypeModel, type_name: Option<&str>) -> Arc<DispatchHandle> {
        self.resolve(model, type_name, true)
    }

    fn resolve(&self, model: &TypeModel, type_name: Option<&str>, allow_proxy: bool) -> Arc<DispatchHandle> {
        let Some(name) = type_name else {
            return self.nil();
        };
        if let Some(handle) = self.snapshot.load().get(name) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(handle);
        }
        // read before building so a registration racing the build is seen
        let generation = model.generation();
        if self.failures.get(name).is_some_and(|failed| *failed == generation) {
            self.stats.failed_hits.fetch_add(1, Ordering::Relaxed);
            return self.nil();
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        let Some(desc) = model.lookup(name) else {
            log::debug!("no descriptor for type {name}");
            return self.nil();
        };
        let cached = self.snapshot.load().get(&desc.name).cloned();
        let handle = match cached {
            Some(handle) => handle,
            None => self.build(model, name, &desc, allow_proxy),
        };
        if handle.is_nil() {
            self.failures.insert(Arc::from(name), generation);
            return handle;
        }
        // aliases are published under the key they were looked up by
        if *desc.name != *name {
            return self.publish(Arc::from(name), handle);
        }
        handle
    }

    fn build(&self, model: &TypeModel, name: &str, desc: &Arc<TypeDescriptor>, allow_proxy: bool) -> Arc<DispatchHandle> {
        match &desc.kind {
            TypeKind::GenericParameter => {
                log::debug!("open generic type {name} has no dispatch handle");
                return self.nil();
            }
            TypeKind::Nullable(inner_name) => {
                if model
                    .lookup(inner_name)
                    .is_some_and(|d| matches!(d.kind, TypeKind::Nullable(_)))
                {
                    log::debug!("nested nullable {name} is not supported");
                    return self.fallback(name);
                }
                let inner = self.resolve(model, Some(inner_name), true);
                if inner.is_nil() {
                    return self.fallback(name);
                }
                let handle = DispatchHandle::Nullable {
                    type_name: desc.name.clone(),
                    inner,
                };
                return self.publish(desc.name.clone(), Arc::new(handle));
            }
            _ => {}
        }

        if allow_proxy && model.proxy_rules().is_proxy(desc) {
            if let Some(base) = desc.base_type.as_deref() {
                log::debug!("{name} is a proxy; dispatching as {base}");
                let handle = self.resolve(model, Some(base), false);
                if handle.is_nil() {
                    return handle;
                }
                return self.publish(desc.name.clone(), handle);
            }
        }

        match ConcreteHandle::build(model, Arc::clone(desc)) {
            Ok(handle) => self.publish(desc.name.clone(), Arc::new(DispatchHandle::Concrete(handle))),
            Err(reason) => {
                log::debug!("cannot build dispatch handle for {name}: {reason}");
                self.fallback(name)
            }
        }
    }

    fn fallback(&self, name: &str) -> Arc<DispatchHandle> {
        self.stats.nil_fallbacks.fetch_add(1, Ordering::Relaxed);
        log::debug!("{name} falls back to the nil handle");
        self.nil()
    }

    /// Insert `handle` unless another thread published `key` first; returns
    /// the handle that ended up in the cache.
    fn publish(&self, key: Arc<str>, handle: Arc<DispatchHandle>) -> Arc<DispatchHandle> {
        let _guard = self.publish.lock();
        let current = self.snapshot.load_full();
        if let Some(existing) = current.get(&key) {
            return Arc::clone(existing);
        }
        let mut next = (*current).clone();
        next.insert(key, Arc::clone(&handle));
        self.snapshot.store(Arc::new(next));
        log::trace!("published dispatch handle ({} cached)", current.len() + 1);
        handle
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a handle for `type_name` has been published.
    pub fn contains(&self, type_name: &str) -> bool {
        self.snapshot.load().contains_key(type_name)
    }

    /// Two handles are equivalent when they are the same cached instance.
    pub fn is_equivalent(a: &Arc<DispatchHandle>, b: &Arc<DispatchHandle>) -> bool {
        Arc::ptr_eq(a, b)
    }

    pub fn stats(&self) -> &LookupStats {
        &self.stats
    }
}

impl Default for DispatchCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DispatchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchCache")
            .field("cached", &self.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::{MessageBuilder, TypeDescriptor};
    use std::thread;

    #[test]
    fn test_repeated_lookup_returns_same_handle() {
        let model = TypeModel::new();
        model.register(MessageBuilder::new("Order").field(1, "id", "System.Int32").build());
        let a = model.dispatch().get(&model, Some("Order"));
        let b = model.dispatch().get(&model, Some("Order"));
        assert!(DispatchCache::is_equivalent(&a, &b));
        assert_eq!(model.dispatch().stats().hits(), 1);
    }

    #[test]
    fn test_unknown_type_is_not_cached() {
        let model = TypeModel::new();
        assert!(model.dispatch().get(&model, Some("Later")).is_nil());
        assert!(!model.dispatch().contains("Later"));

        model.register(MessageBuilder::new("Later").build());
        assert!(!model.dispatch().get(&model, Some("Later")).is_nil());
        assert!(model.dispatch().contains("Later"));
    }

    #[test]
    fn test_alias_shares_canonical_handle() {
        let model = TypeModel::new();
        let canonical = model.dispatch().get(&model, Some("System.Int32"));
        let alias = model.dispatch().get(&model, Some("int"));
        assert!(DispatchCache::is_equivalent(&canonical, &alias));
        assert!(model.dispatch().contains("int"));
        assert_eq!(model.dispatch().len(), 2);
    }

    #[test]
    fn test_absent_and_generic_types_are_nil() {
        let model = TypeModel::new();
        model.register(TypeDescriptor::generic_parameter("T"));
        assert!(model.dispatch().get(&model, None).is_nil());
        assert!(model.dispatch().get(&model, Some("T")).is_nil());
        assert!(model.dispatch().is_empty());
    }

    #[test]
    fn test_broken_type_counts_fallback() {
        let model = TypeModel::new();
        model.register(
            MessageBuilder::new("Broken")
                .field(1, "a", "System.Int32")
                .field(1, "b", "System.Int32")
                .build(),
        );
        assert!(model.dispatch().get(&model, Some("Broken")).is_nil());
        assert_eq!(model.dispatch().stats().nil_fallbacks(), 1);
    }

    #[test]
    fn test_failed_build_is_remembered_until_registration() {
        let model = TypeModel::new();
        model.register(MessageBuilder::new("Holder").field(1, "x", "Shop.Missing").build());
        for _ in 0..3 {
            assert!(model.dispatch().get(&model, Some("Holder")).is_nil());
        }
        assert_eq!(model.dispatch().stats().nil_fallbacks(), 1);
        assert_eq!(model.dispatch().stats().failed_hits(), 2);

        // unknown names are looked up again every time
        assert!(model.dispatch().get(&model, Some("Shop.Missing")).is_nil());
        assert!(model.dispatch().get(&model, Some("Shop.Missing")).is_nil());
        assert_eq!(model.dispatch().stats().failed_hits(), 2);

        model.register(MessageBuilder::new("Shop.Missing").build());
        assert!(!model.dispatch().get(&model, Some("Holder")).is_nil());
        assert_eq!(model.dispatch().stats().nil_fallbacks(), 1);
    }

    #[test]
    fn test_nullable_wraps_inner_handle() {
        let model = TypeModel::new();
        let handle = model.dispatch().get(&model, Some("System.Int32?"));
        let inner = model.dispatch().get(&model, Some("System.Int32"));
        match &*handle {
            DispatchHandle::Nullable { inner: wrapped, .. } => {
                assert!(DispatchCache::is_equivalent(wrapped, &inner));
            }
            other => panic!("expected nullable handle, got {other:?}"),
        }
        assert!(model.dispatch().get(&model, Some("System.Int32??")).is_nil());
    }

    #[test]
    fn test_concurrent_first_lookup_agrees() {
        let model = Arc::new(TypeModel::new());
        model.register(MessageBuilder::new("Order").field(1, "id", "System.Int32").build());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let model = Arc::clone(&model);
                thread::spawn(move || model.dispatch().get(&model, Some("Order")))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for handle in &results[1..] {
            assert!(DispatchCache::is_equivalent(&results[0], handle));
        }
        assert_eq!(model.dispatch().len(), 1);
    }
}
