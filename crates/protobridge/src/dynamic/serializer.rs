// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Extension point for types the built-in kinds cannot describe.

use super::value::Value;
use crate::core::ser::{ProtoReader, ProtoWriter, SerializerFeatures, WireType};
use crate::error::Result;
use std::fmt;

/// Serializer for a [`TypeKind::Custom`](super::TypeKind::Custom) type.
///
/// What `write` produces depends on the scope derived from
/// [`features`](Self::features): for scalar scopes it is the bare payload of
/// one field, for message and root-like scopes it is a field-structured
/// body. `read` mirrors it; for bodies the reader is bounded to the body.
pub trait ValueSerializer: Send + Sync + fmt::Debug {
    fn features(&self) -> SerializerFeatures;

    fn write(&self, writer: &mut ProtoWriter, value: &Value) -> Result<()>;

    fn read(&self, reader: &mut ProtoReader<'_>, wire: WireType, existing: Option<Value>) -> Result<Value>;

    /// Value produced for absent data; `None` leaves the slot empty.
    fn default_value(&self) -> Option<Value> {
        None
    }
}
