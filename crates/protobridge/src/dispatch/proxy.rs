// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime-generated proxy types.
//!
//! ORMs subclass entity types at runtime to intercept property access. A
//! proxy carries no extra data, so it is serialized as its declared base
//! type and shares that type's dispatch handle.

use crate::dynamic::TypeDescriptor;
use std::sync::Arc;

/// Entity Framework places its change-tracking proxies in this namespace.
pub const ENTITY_FRAMEWORK_PROXY_NAMESPACE: &str = "System.Data.Entity.DynamicProxies";
/// Marker interfaces implemented by NHibernate proxies.
pub const NHIBERNATE_PROXY_INTERFACES: [&str; 2] = [
    "NHibernate.Proxy.INHibernateProxy",
    "NHibernate.Proxy.DynamicProxy.IProxy",
];

/// One way of recognising a proxy type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRule {
    /// The type's namespace is this one or nested below it.
    NamespacePrefix(Arc<str>),
    /// The type implements this interface.
    Interface(Arc<str>),
}

impl ProxyRule {
    pub fn matches(&self, desc: &TypeDescriptor) -> bool {
        match self {
            Self::NamespacePrefix(prefix) => desc.namespace().is_some_and(|ns| {
                ns.strip_prefix(&**prefix)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
            }),
            Self::Interface(name) => desc.interfaces.iter().any(|i| i == name),
        }
    }
}

/// Ordered proxy rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRules {
    rules: Vec<ProxyRule>,
}

impl ProxyRules {
    /// Entity Framework namespace plus the NHibernate marker interfaces.
    pub fn standard() -> Self {
        let mut rules = vec![ProxyRule::NamespacePrefix(ENTITY_FRAMEWORK_PROXY_NAMESPACE.into())];
        rules.extend(
            NHIBERNATE_PROXY_INTERFACES
                .iter()
                .map(|name| ProxyRule::Interface((*name).into())),
        );
        Self { rules }
    }

    /// No proxy handling.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    #[must_use]
    pub fn with(mut self, rule: ProxyRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[ProxyRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// True for reference types matched by any rule.
    pub fn is_proxy(&self, desc: &TypeDescriptor) -> bool {
        !desc.is_value_type && self.rules.iter().any(|rule| rule.matches(desc))
    }
}

impl Default for ProxyRules {
    fn default() -> Self {
        Self::standard()
    }
}
