// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type model: descriptor registry, options and the dispatch cache.
//!
//! Name resolution order:
//!
//! 1. Types registered on the model.
//! 2. An external [`TypeRegistry`], if one is attached.
//! 3. Built-in scalars and surrogates (`System.Int32`, `int`, `System.Guid`, ...).
//! 4. Synthesised forms: `T[]` (repeated `T`) and `T?` (nullable `T`), when
//!    `T` itself resolves.

use crate::config::ModelOptions;
use crate::core::ser::{ObjectScope, ProtoReader, ProtoWriter, WireType};
use crate::dispatch::{DispatchCache, DispatchHandle, ProxyRules};
use crate::dynamic::{builtin, synthesised, Synthesised, TypeDescriptor, Value};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// TypeRegistry trait + DashMap implementation
// ---------------------------------------------------------------------------

/// Source of type descriptors, looked up by fully qualified name.
pub trait TypeRegistry: Send + Sync {
    /// Returns `None` if the name is unknown.
    fn lookup(&self, name: &str) -> Option<Arc<TypeDescriptor>>;

    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Bumped whenever the registry's contents change. Registries that never
    /// change keep the default.
    fn generation(&self) -> u64 {
        0
    }
}

/// Concurrent [`TypeRegistry`] backed by a `DashMap`.
#[derive(Debug, Default)]
pub struct DashMapTypeRegistry {
    types: DashMap<Arc<str>, Arc<TypeDescriptor>>,
    generation: AtomicU64,
}

impl DashMapTypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `desc` under its name, replacing any previous descriptor.
    pub fn register(&self, desc: TypeDescriptor) -> Arc<TypeDescriptor> {
        let desc = Arc::new(desc);
        self.types.insert(desc.name.clone(), Arc::clone(&desc));
        self.generation.fetch_add(1, Ordering::Release);
        desc
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeRegistry for DashMapTypeRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.get(name).map(|entry| Arc::clone(entry.value()))
    }

    fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// TypeModel
// ---------------------------------------------------------------------------

/// Registered types, model options and the per-model dispatch cache.
///
/// A model is `Send + Sync`; share it behind an `Arc`. Handles are built on
/// first use and cached for the model's lifetime, so register every type
/// before the first serialize call that reaches it.
pub struct TypeModel {
    types: DashMapTypeRegistry,
    external: Option<Arc<dyn TypeRegistry>>,
    options: ModelOptions,
    proxies: ProxyRules,
    dispatch: DispatchCache,
}

impl TypeModel {
    pub fn new() -> Self {
        Self::with_options(ModelOptions::default())
    }

    pub fn with_options(options: ModelOptions) -> Self {
        Self {
            types: DashMapTypeRegistry::new(),
            external: None,
            options,
            proxies: ProxyRules::standard(),
            dispatch: DispatchCache::new(),
        }
    }

    #[must_use]
    pub fn with_proxy_rules(mut self, rules: ProxyRules) -> Self {
        self.proxies = rules;
        self
    }

    /// Fall back to `registry` for names not registered on the model.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn TypeRegistry>) -> Self {
        self.external = Some(registry);
        self
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn proxy_rules(&self) -> &ProxyRules {
        &self.proxies
    }

    pub fn dispatch(&self) -> &DispatchCache {
        &self.dispatch
    }

    /// Changes whenever a descriptor is registered here or in the attached
    /// registry.
    pub fn generation(&self) -> u64 {
        let external = self.external.as_ref().map_or(0, |r| r.generation());
        self.types.generation().wrapping_add(external)
    }

    /// Register a descriptor. A type whose handle is already cached keeps
    /// the cached handle.
    pub fn register(&self, desc: TypeDescriptor) -> Arc<TypeDescriptor> {
        if self.dispatch.contains(&desc.name) {
            log::warn!(
                "type {} re-registered after its dispatch handle was built; the cached handle stays in use",
                desc.name
            );
        }
        self.types.register(desc)
    }

    /// Resolve a type name without building any handle.
    pub fn lookup(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        if let Some(desc) = self.types.lookup(name) {
            return Some(desc);
        }
        if let Some(desc) = self.external.as_ref().and_then(|r| r.lookup(name)) {
            return Some(desc);
        }
        if let Some(desc) = builtin(name) {
            return Some(Arc::new(desc));
        }
        let desc = match synthesised(name)? {
            Synthesised::Repeated(element) => {
                self.lookup(element)?;
                TypeDescriptor::repeated(element)
            }
            Synthesised::Nullable(inner) => {
                self.lookup(inner)?;
                TypeDescriptor::nullable(inner)
            }
        };
        Some(Arc::new(desc))
    }

    /// Whether the model describes `name`. Never builds a handle.
    pub fn is_known_type(&self, name: &str) -> bool {
        self.types.contains(name)
            || self.external.as_ref().is_some_and(|r| r.contains(name))
            || self.lookup(name).is_some()
    }

    /// Dispatch handle for `name`, Nil when unsupported.
    pub fn handle(&self, name: &str) -> Arc<DispatchHandle> {
        self.dispatch.get(self, Some(name))
    }

    /// Root scope and wire type of `name`; see [`DispatchHandle::can_serialize`].
    pub fn can_serialize(&self, name: &str) -> Option<(ObjectScope, WireType)> {
        self.handle(name).can_serialize(self)
    }

    pub fn serialize(&self, name: &str, value: &Value) -> Result<Vec<u8>> {
        let mut writer = ProtoWriter::new();
        self.serialize_into(name, value, &mut writer)?;
        Ok(writer.into_vec())
    }

    pub fn serialize_into(&self, name: &str, value: &Value, writer: &mut ProtoWriter) -> Result<()> {
        if self.handle(name).try_serialize_root(self, writer, value)? {
            Ok(())
        } else {
            Err(Error::unsupported(name))
        }
    }

    /// Encoded size of `value` as a root payload.
    pub fn measure(&self, name: &str, value: &Value) -> Result<usize> {
        let mut writer = ProtoWriter::rent();
        self.serialize_into(name, value, &mut writer)?;
        Ok(writer.len())
    }

    /// Decode a root payload. Absent data yields the type default.
    pub fn deserialize(&self, name: &str, bytes: &[u8]) -> Result<Value> {
        let mut slot = None;
        self.deserialize_into(name, bytes, &mut slot, true)?;
        Ok(slot.unwrap_or(Value::Null))
    }

    /// Decode a root payload, merging into `slot`.
    ///
    /// An empty payload leaves an empty `slot` untouched unless
    /// `auto_create` is set.
    pub fn deserialize_into(
        &self,
        name: &str,
        bytes: &[u8],
        slot: &mut Option<Value>,
        auto_create: bool,
    ) -> Result<()> {
        let mut reader = ProtoReader::with_max_depth(bytes, self.options.max_depth);
        if self.handle(name).try_deserialize_root(self, &mut reader, slot, auto_create)? {
            Ok(())
        } else {
            Err(Error::unsupported(name))
        }
    }

    /// Structural copy of `value`, checked against the type.
    pub fn deep_clone(&self, name: &str, value: &Value) -> Result<Value> {
        let mut copy = value.clone();
        if self.handle(name).try_deep_clone(self, &mut copy)? {
            Ok(copy)
        } else {
            Err(Error::unsupported(name))
        }
    }
}

impl Default for TypeModel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeModel")
            .field("registered", &self.types.len())
            .field("external", &self.external.is_some())
            .field("options", &self.options)
            .field("proxies", &self.proxies)
            .field("dispatch", &self.dispatch)
            .finish()
    }
}
