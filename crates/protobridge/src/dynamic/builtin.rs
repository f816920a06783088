// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Types every model knows without registration.

use super::type_descriptor::{ScalarKind, SurrogateKind, TypeDescriptor};

const SCALARS: [ScalarKind; 13] = [
    ScalarKind::Bool,
    ScalarKind::I8,
    ScalarKind::I16,
    ScalarKind::I32,
    ScalarKind::I64,
    ScalarKind::U8,
    ScalarKind::U16,
    ScalarKind::U32,
    ScalarKind::U64,
    ScalarKind::F32,
    ScalarKind::F64,
    ScalarKind::String,
    ScalarKind::Bytes,
];

const SURROGATES: [SurrogateKind; 4] = [
    SurrogateKind::Guid,
    SurrogateKind::Decimal,
    SurrogateKind::DateTime,
    SurrogateKind::TimeSpan,
];

/// Language keywords accepted as aliases of the platform names.
fn alias(name: &str) -> Option<&'static str> {
    let target = match name {
        "bool" => "System.Boolean",
        "sbyte" => "System.SByte",
        "short" => "System.Int16",
        "int" => "System.Int32",
        "long" => "System.Int64",
        "byte" => "System.Byte",
        "ushort" => "System.UInt16",
        "uint" => "System.UInt32",
        "ulong" => "System.UInt64",
        "float" => "System.Single",
        "double" => "System.Double",
        "string" => "System.String",
        "byte[]" => "System.Byte[]",
        "decimal" => "System.Decimal",
        _ => return None,
    };
    Some(target)
}

/// Descriptor for a built-in scalar or surrogate name.
pub fn builtin(name: &str) -> Option<TypeDescriptor> {
    let name = alias(name).unwrap_or(name);
    if let Some(kind) = SCALARS.iter().find(|k| k.type_name() == name) {
        return Some(TypeDescriptor::scalar(*kind));
    }
    SURROGATES
        .iter()
        .find(|k| k.type_name() == name)
        .map(|k| TypeDescriptor::surrogate(*k))
}

/// Split a synthesised name into its element (`T[]`) or inner (`T?`) part.
pub(crate) enum Synthesised<'a> {
    Repeated(&'a str),
    Nullable(&'a str),
}

pub(crate) fn synthesised(name: &str) -> Option<Synthesised<'_>> {
    if let Some(element) = name.strip_suffix("[]") {
        return (!element.is_empty()).then_some(Synthesised::Repeated(element));
    }
    name.strip_suffix('?')
        .filter(|inner| !inner.is_empty())
        .map(Synthesised::Nullable)
}
