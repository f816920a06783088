// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type dispatch.
//!
//! A type name resolves to one immutable [`DispatchHandle`] per model. The
//! handle knows the type's [`SerializerFeatures`](crate::core::ser::SerializerFeatures),
//! its [`ObjectScope`](crate::core::ser::ObjectScope) and how to read,
//! write and clone values of it; callers never need the static type.

mod cache;
mod entries;
mod handle;
mod payload;
mod proxy;

pub use cache::{DispatchCache, LookupStats};
pub use handle::{ConcreteHandle, DispatchHandle, Member};
pub use proxy::{ProxyRule, ProxyRules, ENTITY_FRAMEWORK_PROXY_NAMESPACE, NHIBERNATE_PROXY_INTERFACES};
