// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the wire codec and the dispatch layer.
//!
//! Dispatch operations report "not applicable" through `Ok(false)` so a
//! resolution chain can try alternatives; everything in this enum is a hard
//! failure (corrupt input, contradictory metadata, or a value that does not
//! fit its target representation).

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed bytes: bad length, invalid Guid text, out-of-range kind, ...
    #[error("malformed input at offset {offset}: {reason}")]
    Format { offset: usize, reason: String },

    /// The buffer ended in the middle of a value.
    #[error("unexpected end of buffer at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// No serializer can be resolved for the type.
    #[error("no serializer for type {type_name}{}", .hint.map(|h| format!(" ({h})")).unwrap_or_default())]
    UnsupportedType {
        type_name: String,
        hint: Option<&'static str>,
    },

    /// A value exceeds its target representation.
    #[error("value out of range for {target}")]
    Overflow { target: &'static str },

    /// A type declares mutually exclusive wire capabilities.
    #[error("type {type_name} declares contradictory serializer features: {detail}")]
    InvariantViolation { type_name: String, detail: String },

    /// A pooled read buffer would grow beyond its hard ceiling.
    #[error("read buffer capacity exceeded: {requested} > {max}")]
    CapacityExceeded { requested: usize, max: usize },

    /// A runtime value does not match the shape its descriptor declares.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A collection contains a null element, which has no wire representation.
    #[error("null element in collection of {type_name}")]
    NullElement { type_name: String },

    /// String payload is not valid UTF-8.
    #[error("invalid UTF-8 in string field: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Name prefixes of foreign protobuf runtimes whose message types are not
/// understood by this engine.
const FOREIGN_MESSAGE_LIBRARIES: &[(&str, &str)] = &[
    (
        "Google.Protobuf.",
        "this looks like a Google.Protobuf generated type; use that runtime's own parser or register an equivalent descriptor",
    ),
    (
        "Google.ProtocolBuffers.",
        "this looks like a protobuf-csharp-port generated type; use that runtime's own parser or register an equivalent descriptor",
    ),
];

impl Error {
    pub fn format(offset: usize, reason: impl Into<String>) -> Self {
        Self::Format {
            offset,
            reason: reason.into(),
        }
    }

    /// Build an [`Error::UnsupportedType`], attaching an actionable hint when
    /// the name belongs to a known foreign message library.
    pub fn unsupported(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let hint = FOREIGN_MESSAGE_LIBRARIES
            .iter()
            .find(|(prefix, _)| type_name.starts_with(prefix))
            .map(|(_, hint)| *hint);
        Self::UnsupportedType { type_name, hint }
    }

    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
