// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dispatch handles: the resolved read/write strategy of one type.
//!
//! A handle is built once per type key and never changes afterwards.
//! Features, scope and wire type are computed at construction; the handles
//! of member, element and subtype types are resolved lazily on first use so
//! that recursive types never recurse during construction.
//!
//! Every `try_*` operation returns `Ok(false)` when the handle cannot serve
//! the request at all (the Nil handle) and `Err` for corrupt input or
//! contradictory metadata.

use super::entries::EntryIndex;
use super::payload::{mismatch, Payload, PayloadKind};
use crate::collections::read_repeated_with;
use crate::config::{ModelOptions, MAP_FIELD_KEY, MAP_FIELD_VALUE, MAX_FIELD_NUMBER, ROOT_ENVELOPE_FIELD};
use crate::core::rt::ReadBuffer;
use crate::core::ser::{FeatureOptions, ObjectScope, ProtoReader, ProtoWriter, SerializerFeatures, WireType};
use crate::dynamic::{DataFormat, FieldDescriptor, MessageDescriptor, MessageValue, TypeDescriptor, TypeKind, Value, ValueSerializer};
use crate::error::{Error, Result};
use crate::model::TypeModel;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

/// Longest base-type chain followed before a hierarchy is considered cyclic.
const MAX_HIERARCHY_DEPTH: usize = 64;

/// How one value is placed inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    pub number: u32,
    pub format: DataFormat,
    /// Write the value even when it equals the type default.
    pub emit_default: bool,
    /// Packed request for repeated numeric values; `None` follows the model.
    pub packed: Option<bool>,
}

impl Member {
    pub const fn new(number: u32) -> Self {
        Self {
            number,
            format: DataFormat::Default,
            emit_default: false,
            packed: None,
        }
    }

    /// Field 1 of the implicit root envelope.
    pub const fn root() -> Self {
        Self::new(ROOT_ENVELOPE_FIELD)
    }

    pub fn from_field(field: &FieldDescriptor) -> Self {
        Self {
            number: field.number,
            format: field.data_format,
            emit_default: field.emit_default,
            packed: field.packed,
        }
    }

    /// Elements of a repeated member: same number and format, always written.
    const fn element(self) -> Self {
        Self {
            emit_default: true,
            packed: None,
            ..self
        }
    }

    const fn present(self) -> Self {
        Self {
            emit_default: true,
            ..self
        }
    }
}

/// Resolved strategy for one type key.
#[derive(Debug)]
pub enum DispatchHandle {
    /// Unsupported or unknown type; every operation reports "not applicable".
    Nil,
    /// Optional value of `inner`.
    Nullable {
        type_name: Arc<str>,
        inner: Arc<DispatchHandle>,
    },
    Concrete(ConcreteHandle),
}

impl DispatchHandle {
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Nil => None,
            Self::Nullable { type_name, .. } => Some(type_name),
            Self::Concrete(h) => Some(&h.descriptor.name),
        }
    }

    pub fn as_concrete(&self) -> Option<&ConcreteHandle> {
        match self {
            Self::Concrete(h) => Some(h),
            _ => None,
        }
    }

    /// The concrete handle, looking through one nullable layer.
    fn underlying(&self) -> Option<&ConcreteHandle> {
        match self {
            Self::Nil => None,
            Self::Nullable { inner, .. } => inner.as_concrete(),
            Self::Concrete(h) => Some(h),
        }
    }

    /// Scope the type is framed with; nullable handles report their inner scope.
    pub fn scope(&self) -> ObjectScope {
        self.underlying().map_or(ObjectScope::Invalid, |h| h.scope)
    }

    pub fn features(&self) -> Option<SerializerFeatures> {
        self.underlying().map(|h| h.features)
    }

    /// `None` when unsupported; `Some((Invalid, WireType::None))` when the
    /// declared features contradict each other.
    pub fn can_serialize(&self, _model: &TypeModel) -> Option<(ObjectScope, WireType)> {
        let handle = self.underlying()?;
        if handle.scope == ObjectScope::Invalid {
            return Some((ObjectScope::Invalid, WireType::None));
        }
        Some((handle.scope, handle.features.wire_type()))
    }

    /// Whether the model describes this handle's type. Never builds handles.
    pub fn is_known_type(&self, model: &TypeModel) -> bool {
        self.type_name().is_some_and(|name| model.is_known_type(name))
    }

    pub fn try_serialize_root(&self, model: &TypeModel, writer: &mut ProtoWriter, value: &Value) -> Result<bool> {
        match self {
            Self::Nil => Ok(false),
            Self::Nullable { inner, .. } => match inner.as_concrete() {
                Some(h) => {
                    h.write_root(model, writer, value, true)?;
                    Ok(true)
                }
                None => Ok(false),
            },
            Self::Concrete(h) => {
                h.write_root(model, writer, value, false)?;
                Ok(true)
            }
        }
    }

    /// Read a root payload into `slot`, merging with its current value.
    ///
    /// When the reader consumed nothing and `slot` was empty, the slot is
    /// filled with the type default only if `auto_create` is set.
    pub fn try_deserialize_root(
        &self,
        model: &TypeModel,
        reader: &mut ProtoReader<'_>,
        slot: &mut Option<Value>,
        auto_create: bool,
    ) -> Result<bool> {
        let Some(handle) = self.underlying() else {
            return Ok(false);
        };
        let before = reader.offset();
        let existing = slot.take().filter(|v| !v.is_null());
        let had_value = existing.is_some();
        let value = handle.read_root(model, reader, existing)?;
        let consumed = reader.offset() != before;
        if consumed || had_value || auto_create {
            *slot = Some(value);
        }
        Ok(true)
    }

    /// Write `value` as member `member.number` framed for `scope`. Null
    /// values are omitted.
    pub fn try_serialize(
        &self,
        scope: ObjectScope,
        member: &Member,
        model: &TypeModel,
        writer: &mut ProtoWriter,
        value: &Value,
    ) -> Result<bool> {
        match self {
            Self::Nil => Ok(false),
            Self::Nullable { inner, .. } => {
                if value.is_null() {
                    return Ok(true);
                }
                inner.try_serialize(scope, &member.present(), model, writer, value)
            }
            Self::Concrete(h) => {
                h.write_member(scope, member, model, writer, value)?;
                Ok(true)
            }
        }
    }

    /// Read one occurrence of a member whose header carried `header_wire`,
    /// merging into `slot`.
    pub fn try_deserialize(
        &self,
        scope: ObjectScope,
        member: &Member,
        model: &TypeModel,
        reader: &mut ProtoReader<'_>,
        header_wire: WireType,
        slot: &mut Option<Value>,
    ) -> Result<bool> {
        let Some(handle) = self.underlying() else {
            return Ok(false);
        };
        let existing = slot.take().filter(|v| !v.is_null());
        *slot = Some(handle.read_member(scope, member, model, reader, header_wire, existing)?);
        Ok(true)
    }

    /// Replace `value` with a structural copy checked against the type.
    pub fn try_deep_clone(&self, model: &TypeModel, value: &mut Value) -> Result<bool> {
        if self.is_nil() {
            return Ok(false);
        }
        *value = self.clone_value(model, value)?;
        Ok(true)
    }

    pub(crate) fn clone_value(&self, model: &TypeModel, value: &Value) -> Result<Value> {
        match self {
            Self::Nil => Err(Error::unsupported(value.kind_name())),
            Self::Nullable { .. } if value.is_null() => Ok(Value::Null),
            Self::Nullable { inner, .. } => inner.clone_value(model, value),
            Self::Concrete(h) => h.clone_value(model, value),
        }
    }

    /// Value synthesised for absent data, if the type has one.
    pub(crate) fn default_value(&self, model: &TypeModel) -> Result<Option<Value>> {
        match self {
            Self::Nil | Self::Nullable { .. } => Ok(None),
            Self::Concrete(h) => h.default_value(model),
        }
    }

    /// Default stored for an absent message field; nested messages stay null.
    fn field_default(&self, model: &TypeModel) -> Result<Option<Value>> {
        match self.as_concrete() {
            Some(h) if matches!(h.shape, Shape::Message(_)) => Ok(None),
            _ => self.default_value(model),
        }
    }
}

/// Handle of a named type, resolved through the model on first use.
#[derive(Debug)]
struct LazyHandle {
    type_name: Arc<str>,
    resolved: OnceLock<Arc<DispatchHandle>>,
}

impl LazyHandle {
    fn new(type_name: Arc<str>) -> Self {
        Self {
            type_name,
            resolved: OnceLock::new(),
        }
    }

    fn get(&self, model: &TypeModel) -> Result<&DispatchHandle> {
        let handle = self
            .resolved
            .get_or_init(|| model.dispatch().get(model, Some(&*self.type_name)));
        if handle.is_nil() {
            return Err(Error::unsupported(&*self.type_name));
        }
        Ok(handle)
    }

    fn get_message(&self, model: &TypeModel) -> Result<(&ConcreteHandle, &MessagePlan)> {
        self.get(model)?
            .as_concrete()
            .and_then(|h| h.message_plan().map(|plan| (h, plan)))
            .ok_or_else(|| Error::unsupported(&*self.type_name))
    }
}

#[derive(Debug)]
struct PlannedField {
    name: String,
    member: Member,
    handle: LazyHandle,
}

#[derive(Debug)]
struct PlannedSubtype {
    number: u32,
    handle: LazyHandle,
}

/// Fields and subtypes of one message level, indexed by field number.
#[derive(Debug)]
struct MessagePlan {
    fields: Vec<PlannedField>,
    subtypes: Vec<PlannedSubtype>,
    by_number: HashMap<u32, usize>,
}

impl MessagePlan {
    fn build(model: &TypeModel, name: &str, message: &MessageDescriptor) -> std::result::Result<Self, String> {
        let mut numbers = HashSet::new();
        let mut check_number = |number: u32| {
            if number == 0 || number > MAX_FIELD_NUMBER {
                return Err(format!("field number {number} out of range"));
            }
            if !numbers.insert(number) {
                return Err(format!("field number {number} used twice"));
            }
            Ok(())
        };

        let mut fields = Vec::with_capacity(message.fields.len());
        let mut by_number = HashMap::with_capacity(message.fields.len());
        for field in &message.fields {
            check_number(field.number)?;
            if !model.is_known_type(&field.type_name) {
                return Err(format!("field {} has unknown type {}", field.name, field.type_name));
            }
            by_number.insert(field.number, fields.len());
            fields.push(PlannedField {
                name: field.name.clone(),
                member: Member::from_field(field),
                handle: LazyHandle::new(field.type_name.clone()),
            });
        }

        let mut subtypes = Vec::with_capacity(message.subtypes.len());
        for subtype in &message.subtypes {
            check_number(subtype.number)?;
            let desc = model
                .lookup(&subtype.type_name)
                .ok_or_else(|| format!("unknown subtype {}", subtype.type_name))?;
            if !desc.is_message() || desc.base_type.as_deref() != Some(name) {
                return Err(format!("{} is not a message deriving from {name}", subtype.type_name));
            }
            subtypes.push(PlannedSubtype {
                number: subtype.number,
                handle: LazyHandle::new(subtype.type_name.clone()),
            });
        }

        Ok(Self {
            fields,
            subtypes,
            by_number,
        })
    }

    fn field(&self, number: u32) -> Option<&PlannedField> {
        self.by_number.get(&number).map(|&i| &self.fields[i])
    }

    fn subtype(&self, number: u32) -> Option<&PlannedSubtype> {
        self.subtypes.iter().find(|s| s.number == number)
    }

    fn subtype_named(&self, name: &str) -> Option<&PlannedSubtype> {
        self.subtypes.iter().find(|s| &*s.handle.type_name == name)
    }
}

#[derive(Debug)]
enum Shape {
    /// Scalar, surrogate or enum: one field payload.
    Payload,
    Message(MessagePlan),
    Repeated(LazyHandle),
    Map { key: LazyHandle, value: LazyHandle },
    Custom(Arc<dyn ValueSerializer>),
}

/// Handle of a type with a concrete wire shape.
#[derive(Debug)]
pub struct ConcreteHandle {
    descriptor: Arc<TypeDescriptor>,
    features: SerializerFeatures,
    scope: ObjectScope,
    shape: Shape,
}

impl ConcreteHandle {
    /// Build the handle, or explain why the type has no wire shape.
    pub(crate) fn build(model: &TypeModel, descriptor: Arc<TypeDescriptor>) -> std::result::Result<Self, String> {
        let (features, shape) = match &descriptor.kind {
            TypeKind::Scalar(kind) => (SerializerFeatures::scalar(kind.default_wire()), Shape::Payload),
            TypeKind::Surrogate(_) => (SerializerFeatures::scalar(WireType::String), Shape::Payload),
            TypeKind::Enum(_) => (SerializerFeatures::scalar(WireType::Varint), Shape::Payload),
            TypeKind::Message(message) => (
                SerializerFeatures::message(),
                Shape::Message(MessagePlan::build(model, &descriptor.name, message)?),
            ),
            TypeKind::Repeated(element) => {
                if !model.is_known_type(element) {
                    return Err(format!("unknown element type {element}"));
                }
                (SerializerFeatures::repeated(), Shape::Repeated(LazyHandle::new(element.clone())))
            }
            TypeKind::Map { key, value } => {
                let key_desc = model
                    .lookup(key)
                    .ok_or_else(|| format!("unknown map key type {key}"))?;
                if !key_desc.is_valid_map_key() {
                    return Err(format!("map key type {key} is not a scalar, surrogate or enum"));
                }
                if !model.is_known_type(value) {
                    return Err(format!("unknown map value type {value}"));
                }
                (
                    SerializerFeatures::repeated(),
                    Shape::Map {
                        key: LazyHandle::new(key.clone()),
                        value: LazyHandle::new(value.clone()),
                    },
                )
            }
            TypeKind::Custom(serializer) => (serializer.features(), Shape::Custom(serializer.clone())),
            TypeKind::Nullable(_) | TypeKind::GenericParameter => {
                return Err("not a concrete type".to_string());
            }
        };
        let features = features.with_options(descriptor.feature_options);
        let scope = features.scope();
        if scope == ObjectScope::Invalid {
            log::warn!(
                "type {} declares contradictory serializer features {:?}",
                descriptor.name,
                features.categories()
            );
        }
        Ok(Self {
            descriptor,
            features,
            scope,
            shape,
        })
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn features(&self) -> SerializerFeatures {
        self.features
    }

    pub fn scope(&self) -> ObjectScope {
        self.scope
    }

    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn message_plan(&self) -> Option<&MessagePlan> {
        match &self.shape {
            Shape::Message(plan) => Some(plan),
            _ => None,
        }
    }

    fn payload<'a>(&'a self, member: &Member, options: &'a ModelOptions) -> Option<Payload<'a>> {
        let kind = match &self.descriptor.kind {
            TypeKind::Scalar(k) => PayloadKind::Scalar(*k),
            TypeKind::Surrogate(k) => PayloadKind::Surrogate(*k),
            TypeKind::Enum(e) => PayloadKind::Enum(e),
            _ => return None,
        };
        Some(Payload::new(kind, member.format, options))
    }

    fn invalid(&self) -> Error {
        Error::InvariantViolation {
            type_name: self.name().to_string(),
            detail: format!("categories {:?} select no single scope", self.features.categories()),
        }
    }

    fn wrong_scope(&self, scope: ObjectScope) -> Error {
        Error::InvariantViolation {
            type_name: self.name().to_string(),
            detail: format!("cannot be framed with scope {scope:?}"),
        }
    }

    fn ensure_valid(&self) -> Result<()> {
        if self.scope == ObjectScope::Invalid {
            return Err(self.invalid());
        }
        Ok(())
    }

    fn expect_delimited(&self, reader: &ProtoReader<'_>, wire: WireType) -> Result<()> {
        if wire != WireType::String {
            return Err(Error::format(
                reader.offset(),
                format!("{} expects a length-delimited field, found {wire}", self.name()),
            ));
        }
        Ok(())
    }

    // =======================================================================
    // Root framing
    // =======================================================================

    /// `present` forces a scalar root to be written even when it is the
    /// default, so an optional root keeps its presence.
    fn write_root(&self, model: &TypeModel, writer: &mut ProtoWriter, value: &Value, present: bool) -> Result<()> {
        self.ensure_valid()?;
        if value.is_null() {
            return Ok(());
        }
        let member = Member {
            emit_default: present,
            ..Member::root()
        };
        match self.scope {
            ObjectScope::Scalar => self.write_scalar_field(&member, model, writer, value),
            ObjectScope::Message => self.write_body(model, writer, value),
            ObjectScope::LikeRoot => match &self.shape {
                Shape::Repeated(element) => self.write_elements(model, writer, element, &member, value),
                Shape::Map { key, value: item } => self.write_entries(model, writer, key, item, &member, value),
                Shape::Custom(serializer) => serializer.write(writer, value),
                Shape::Message(_) => self.write_body(model, writer, value),
                Shape::Payload => Err(self.wrong_scope(self.scope)),
            },
            ObjectScope::WrappedMessage => writer.write_message_field(ROOT_ENVELOPE_FIELD, |w| {
                self.write_scalar_field(&member, model, w, value)
            }),
            ObjectScope::Invalid => Err(self.invalid()),
        }
    }

    fn read_root(&self, model: &TypeModel, reader: &mut ProtoReader<'_>, existing: Option<Value>) -> Result<Value> {
        self.ensure_valid()?;
        let member = Member::root();
        match self.scope {
            ObjectScope::Scalar => {
                let mut value = existing;
                while let Some(header) = reader.read_field_header()? {
                    if header.field == ROOT_ENVELOPE_FIELD {
                        let previous = value.take();
                        value = Some(self.read_scalar_payload(&member, model, reader, header.wire, previous)?);
                    } else {
                        reader.skip_field(header)?;
                    }
                }
                self.or_default(model, value)
            }
            ObjectScope::Message => self.read_body(model, reader, existing),
            ObjectScope::LikeRoot => match &self.shape {
                Shape::Repeated(element) => {
                    let mut items = self.take_list(existing, true)?;
                    while let Some(header) = reader.read_field_header()? {
                        if header.field == ROOT_ENVELOPE_FIELD {
                            self.read_elements(model, reader, element, &member, header.wire, &mut items)?;
                        } else {
                            reader.skip_field(header)?;
                        }
                    }
                    Ok(Value::List(items))
                }
                Shape::Map { key, value: item } => {
                    let mut entries = self.take_map(existing, true)?;
                    let mut index = EntryIndex::default();
                    while let Some(header) = reader.read_field_header()? {
                        if header.field == ROOT_ENVELOPE_FIELD {
                            self.read_entries(model, reader, key, item, &member, header.wire, &mut entries, &mut index)?;
                        } else {
                            reader.skip_field(header)?;
                        }
                    }
                    Ok(Value::Map(entries))
                }
                Shape::Custom(serializer) => serializer.read(reader, WireType::String, existing),
                Shape::Message(_) => self.read_body(model, reader, existing),
                Shape::Payload => Err(self.wrong_scope(self.scope)),
            },
            ObjectScope::WrappedMessage => {
                let mut value = existing;
                while let Some(header) = reader.read_field_header()? {
                    if header.field == ROOT_ENVELOPE_FIELD {
                        self.expect_delimited(reader, header.wire)?;
                        let previous = value.take();
                        value = Some(reader.read_sub_item(|r| self.read_wrapped(&member, model, r, previous))?);
                    } else {
                        reader.skip_field(header)?;
                    }
                }
                self.or_default(model, value)
            }
            ObjectScope::Invalid => Err(self.invalid()),
        }
    }

    fn or_default(&self, model: &TypeModel, value: Option<Value>) -> Result<Value> {
        match value {
            Some(value) => Ok(value),
            None => Ok(self.default_value(model)?.unwrap_or(Value::Null)),
        }
    }

    // =======================================================================
    // Members
    // =======================================================================

    fn write_member(
        &self,
        scope: ObjectScope,
        member: &Member,
        model: &TypeModel,
        writer: &mut ProtoWriter,
        value: &Value,
    ) -> Result<()> {
        self.ensure_valid()?;
        if value.is_null() {
            return Ok(());
        }
        match scope {
            ObjectScope::Scalar => self.write_scalar_field(member, model, writer, value),
            ObjectScope::Message => writer.write_message_field(member.number, |w| self.write_body(model, w, value)),
            ObjectScope::LikeRoot => {
                writer.write_message_field(member.number, |w| self.write_root(model, w, value, false))
            }
            ObjectScope::WrappedMessage => {
                let inner = Member {
                    format: member.format,
                    ..Member::root()
                };
                writer.write_message_field(member.number, |w| self.write_scalar_field(&inner, model, w, value))
            }
            ObjectScope::Invalid => Err(self.invalid()),
        }
    }

    fn read_member(
        &self,
        scope: ObjectScope,
        member: &Member,
        model: &TypeModel,
        reader: &mut ProtoReader<'_>,
        header_wire: WireType,
        existing: Option<Value>,
    ) -> Result<Value> {
        self.ensure_valid()?;
        match scope {
            ObjectScope::Scalar => self.read_scalar_payload(member, model, reader, header_wire, existing),
            ObjectScope::Message => {
                self.expect_delimited(reader, header_wire)?;
                reader.read_sub_item(|r| self.read_body(model, r, existing))
            }
            ObjectScope::LikeRoot => {
                self.expect_delimited(reader, header_wire)?;
                reader.read_sub_item(|r| self.read_root(model, r, existing))
            }
            ObjectScope::WrappedMessage => {
                self.expect_delimited(reader, header_wire)?;
                let inner = Member {
                    format: member.format,
                    ..Member::root()
                };
                reader.read_sub_item(|r| self.read_wrapped(&inner, model, r, existing))
            }
            ObjectScope::Invalid => Err(self.invalid()),
        }
    }

    /// Header plus payload; defaults are elided unless the member asks.
    fn write_scalar_field(&self, member: &Member, model: &TypeModel, writer: &mut ProtoWriter, value: &Value) -> Result<()> {
        match &self.shape {
            Shape::Payload => {
                let payload = self
                    .payload(member, model.options())
                    .ok_or_else(|| self.wrong_scope(ObjectScope::Scalar))?;
                if !member.emit_default && payload.is_default(value) {
                    return Ok(());
                }
                writer.write_field_header(member.number, payload.wire())?;
                payload.write(writer, value)
            }
            Shape::Custom(serializer) => {
                writer.write_field_header(member.number, self.features.wire_type())?;
                serializer.write(writer, value)
            }
            _ => Err(self.wrong_scope(ObjectScope::Scalar)),
        }
    }

    fn read_scalar_payload(
        &self,
        member: &Member,
        model: &TypeModel,
        reader: &mut ProtoReader<'_>,
        wire: WireType,
        existing: Option<Value>,
    ) -> Result<Value> {
        match &self.shape {
            Shape::Payload => self
                .payload(member, model.options())
                .ok_or_else(|| self.wrong_scope(ObjectScope::Scalar))?
                .read(reader, wire),
            Shape::Custom(serializer) => serializer.read(reader, wire.hint(self.features.wire_type()), existing),
            _ => Err(self.wrong_scope(ObjectScope::Scalar)),
        }
    }

    /// Body of a one-field wrapper message.
    fn read_wrapped(
        &self,
        member: &Member,
        model: &TypeModel,
        reader: &mut ProtoReader<'_>,
        existing: Option<Value>,
    ) -> Result<Value> {
        let mut value = existing;
        while let Some(header) = reader.read_field_header()? {
            if header.field == ROOT_ENVELOPE_FIELD {
                let previous = value.take();
                value = Some(self.read_scalar_payload(member, model, reader, header.wire, previous)?);
            } else {
                reader.skip_field(header)?;
            }
        }
        self.or_default(model, value)
    }

    // =======================================================================
    // Messages
    // =======================================================================

    fn write_body(&self, model: &TypeModel, writer: &mut ProtoWriter, value: &Value) -> Result<()> {
        match &self.shape {
            Shape::Message(plan) => match value {
                Value::Message(message) => self.write_message(plan, model, writer, message),
                other => Err(mismatch(self.name(), other)),
            },
            Shape::Custom(serializer) => serializer.write(writer, value),
            Shape::Repeated(_) | Shape::Map { .. } => self.write_root(model, writer, value, false),
            Shape::Payload => Err(self.wrong_scope(ObjectScope::Message)),
        }
    }

    /// Subtype field first (holding the derived levels), then own fields.
    fn write_message(&self, plan: &MessagePlan, model: &TypeModel, writer: &mut ProtoWriter, message: &MessageValue) -> Result<()> {
        if let Some((subtype, child, child_plan)) = self.derived_level(plan, model, message)? {
            writer.write_message_field(subtype.number, |w| child.write_message(child_plan, model, w, message))?;
        }
        for field in &plan.fields {
            let Some(value) = message.fields.get(&field.name) else {
                continue;
            };
            let handle = field.handle.get(model)?;
            if let Some(h) = handle.as_concrete() {
                match &h.shape {
                    Shape::Repeated(element) => {
                        h.write_elements(model, writer, element, &field.member, value)?;
                        continue;
                    }
                    Shape::Map { key, value: item } => {
                        h.write_entries(model, writer, key, item, &field.member, value)?;
                        continue;
                    }
                    _ => {}
                }
            }
            if !handle.try_serialize(handle.scope(), &field.member, model, writer, value)? {
                return Err(Error::unsupported(&*field.handle.type_name));
            }
        }
        Ok(())
    }

    /// The declared subtype of this level on the way down to the message's
    /// concrete type, if the message is more derived than this level.
    fn derived_level<'p>(
        &self,
        plan: &'p MessagePlan,
        model: &'p TypeModel,
        message: &MessageValue,
    ) -> Result<Option<(&'p PlannedSubtype, &'p ConcreteHandle, &'p MessagePlan)>> {
        let Some(child) = subtype_path(model, &message.type_name, self.name())? else {
            return Ok(None);
        };
        let subtype = plan.subtype_named(&child).ok_or_else(|| Error::InvariantViolation {
            type_name: child.to_string(),
            detail: format!("not declared as a subtype of {}", self.name()),
        })?;
        let (handle, child_plan) = subtype.handle.get_message(model)?;
        Ok(Some((subtype, handle, child_plan)))
    }

    fn read_body(&self, model: &TypeModel, reader: &mut ProtoReader<'_>, existing: Option<Value>) -> Result<Value> {
        match &self.shape {
            Shape::Message(plan) => {
                let mut message = match existing {
                    None => MessageValue::new(self.descriptor.name.clone()),
                    Some(Value::Message(message)) => message,
                    Some(other) => return Err(mismatch(self.name(), &other)),
                };
                self.read_message(plan, model, reader, &mut message)?;
                Ok(Value::Message(message))
            }
            Shape::Custom(serializer) => serializer.read(reader, WireType::String, existing),
            Shape::Repeated(_) | Shape::Map { .. } => self.read_root(model, reader, existing),
            Shape::Payload => Err(self.wrong_scope(ObjectScope::Message)),
        }
    }

    fn read_message(&self, plan: &MessagePlan, model: &TypeModel, reader: &mut ProtoReader<'_>, message: &mut MessageValue) -> Result<()> {
        if !message.fields.is_empty() {
            self.clear_collections(plan, model, message)?;
        }
        // map fields may arrive in several runs; their key positions live
        // for the whole message
        let mut indexes: HashMap<u32, EntryIndex> = HashMap::new();
        while let Some(header) = reader.read_field_header()? {
            if let Some(field) = plan.field(header.field) {
                self.read_field(field, model, reader, header.wire, message, &mut indexes)?;
            } else if let Some(subtype) = plan.subtype(header.field) {
                self.expect_delimited(reader, header.wire)?;
                let (child, child_plan) = subtype.handle.get_message(model)?;
                if message.type_name == self.descriptor.name {
                    message.type_name = subtype.handle.type_name.clone();
                }
                reader.read_sub_item(|r| child.read_message(child_plan, model, r, message))?;
            } else {
                reader.skip_field(header)?;
            }
        }
        for field in &plan.fields {
            if message.fields.contains_key(&field.name) {
                continue;
            }
            if let Some(value) = field.handle.get(model)?.field_default(model)? {
                message.fields.insert(field.name.clone(), value);
            }
        }
        Ok(())
    }

    fn read_field(
        &self,
        field: &PlannedField,
        model: &TypeModel,
        reader: &mut ProtoReader<'_>,
        wire: WireType,
        message: &mut MessageValue,
        indexes: &mut HashMap<u32, EntryIndex>,
    ) -> Result<()> {
        let handle = field.handle.get(model)?;
        let existing = message.fields.remove(&field.name);
        if let Some(h) = handle.as_concrete() {
            match &h.shape {
                Shape::Repeated(element) => {
                    // cleared once per message by `clear_collections`
                    let mut items = h.take_list(existing, false)?;
                    h.read_elements(model, reader, element, &field.member, wire, &mut items)?;
                    message.fields.insert(field.name.clone(), Value::List(items));
                    return Ok(());
                }
                Shape::Map { key, value } => {
                    let mut entries = h.take_map(existing, false)?;
                    let index = indexes.entry(field.member.number).or_default();
                    h.read_entries(model, reader, key, value, &field.member, wire, &mut entries, index)?;
                    message.fields.insert(field.name.clone(), Value::Map(entries));
                    return Ok(());
                }
                _ => {}
            }
        }
        let mut slot = existing;
        if !handle.try_deserialize(handle.scope(), &field.member, model, reader, wire, &mut slot)? {
            return Err(Error::unsupported(&*field.handle.type_name));
        }
        if let Some(value) = slot {
            message.fields.insert(field.name.clone(), value);
        }
        Ok(())
    }

    /// Empty collections whose type asks to be cleared before a merge.
    fn clear_collections(&self, plan: &MessagePlan, model: &TypeModel, message: &mut MessageValue) -> Result<()> {
        for field in &plan.fields {
            let Some(value) = message.fields.get_mut(&field.name) else {
                continue;
            };
            let clears = field
                .handle
                .get(model)?
                .features()
                .is_some_and(|f| f.options().contains(FeatureOptions::CLEAR_COLLECTION));
            if clears {
                match value {
                    Value::List(items) => items.clear(),
                    Value::Map(entries) => entries.clear(),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    // =======================================================================
    // Collections
    // =======================================================================

    fn take_list(&self, existing: Option<Value>, clear: bool) -> Result<Vec<Value>> {
        match existing {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::List(mut items)) => {
                if clear && self.features.options().contains(FeatureOptions::CLEAR_COLLECTION) {
                    items.clear();
                }
                Ok(items)
            }
            Some(other) => Err(mismatch(self.name(), &other)),
        }
    }

    fn take_map(&self, existing: Option<Value>, clear: bool) -> Result<Vec<(Value, Value)>> {
        match existing {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Map(mut entries)) => {
                if clear && self.features.options().contains(FeatureOptions::CLEAR_COLLECTION) {
                    entries.clear();
                }
                Ok(entries)
            }
            Some(other) => Err(mismatch(self.name(), &other)),
        }
    }

    fn packed_requested(&self, member: &Member, options: &ModelOptions) -> bool {
        member.packed.unwrap_or(options.pack_repeated_by_default)
            && !self.features.options().contains(FeatureOptions::PACKED_DISABLED)
    }

    /// Elements inline at `member.number`, packed when requested and the
    /// element payload is numeric.
    fn write_elements(
        &self,
        model: &TypeModel,
        writer: &mut ProtoWriter,
        element: &LazyHandle,
        member: &Member,
        value: &Value,
    ) -> Result<()> {
        let items = match value {
            Value::Null => return Ok(()),
            Value::List(items) => items,
            other => return Err(mismatch(self.name(), other)),
        };
        if items.is_empty() {
            return Ok(());
        }
        if items.iter().any(Value::is_null) {
            return Err(Error::NullElement {
                type_name: self.name().to_string(),
            });
        }
        let handle = element.get(model)?;
        let element_member = member.element();

        if self.packed_requested(member, model.options()) {
            let payload = handle
                .underlying()
                .and_then(|h| h.payload(&element_member, model.options()))
                .filter(|p| p.wire().is_packable());
            if let Some(payload) = payload {
                return writer.write_message_field(member.number, |w| {
                    items.iter().try_for_each(|item| payload.write(w, item))
                });
            }
        }

        let scope = handle.scope();
        for item in items {
            if !handle.try_serialize(scope, &element_member, model, writer, item)? {
                return Err(Error::unsupported(&*element.type_name));
            }
        }
        Ok(())
    }

    /// Consume the run of entries starting with the header just read.
    fn read_elements(
        &self,
        model: &TypeModel,
        reader: &mut ProtoReader<'_>,
        element: &LazyHandle,
        member: &Member,
        header_wire: WireType,
        items: &mut Vec<Value>,
    ) -> Result<()> {
        let handle = element.get(model)?;
        let element_member = member.element();
        let scope = handle.scope();
        let declared = handle
            .underlying()
            .and_then(|h| h.payload(&element_member, model.options()))
            .map_or(WireType::String, |p| p.wire());

        // the element ceiling counts every run of this field
        let mut buffer = ReadBuffer::new().continuing(items.len());
        read_repeated_with(reader, member.number, header_wire, declared, &mut buffer, |r, wire| {
            let mut slot = None;
            if !handle.try_deserialize(scope, &element_member, model, r, wire, &mut slot)? {
                return Err(Error::unsupported(&*element.type_name));
            }
            Ok(slot.unwrap_or(Value::Null))
        })?;
        items.extend(buffer.into_vec());
        Ok(())
    }

    fn write_entries(
        &self,
        model: &TypeModel,
        writer: &mut ProtoWriter,
        key: &LazyHandle,
        item: &LazyHandle,
        member: &Member,
        value: &Value,
    ) -> Result<()> {
        let entries = match value {
            Value::Null => return Ok(()),
            Value::Map(entries) => entries,
            other => return Err(mismatch(self.name(), other)),
        };
        let key_handle = key.get(model)?;
        let value_handle = item.get(model)?;
        let key_member = Member::new(MAP_FIELD_KEY);
        let value_member = Member::new(MAP_FIELD_VALUE);
        for (k, v) in entries {
            if k.is_null() {
                return Err(Error::NullElement {
                    type_name: self.name().to_string(),
                });
            }
            writer.write_message_field(member.number, |w| {
                if !key_handle.try_serialize(key_handle.scope(), &key_member, model, w, k)? {
                    return Err(Error::unsupported(&*key.type_name));
                }
                if !value_handle.try_serialize(value_handle.scope(), &value_member, model, w, v)? {
                    return Err(Error::unsupported(&*item.type_name));
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Consume the run of map entries; a repeated key keeps the last value.
    #[allow(clippy::too_many_arguments)]
    fn read_entries(
        &self,
        model: &TypeModel,
        reader: &mut ProtoReader<'_>,
        key: &LazyHandle,
        item: &LazyHandle,
        member: &Member,
        header_wire: WireType,
        entries: &mut Vec<(Value, Value)>,
        index: &mut EntryIndex,
    ) -> Result<()> {
        let key_handle = key.get(model)?;
        let value_handle = item.get(model)?;
        let key_member = Member::new(MAP_FIELD_KEY);
        let value_member = Member::new(MAP_FIELD_VALUE);
        let mut wire = header_wire;
        loop {
            self.expect_delimited(reader, wire)?;
            let (k, v) = reader.read_sub_item(|r| {
                let mut k = None;
                let mut v = None;
                while let Some(header) = r.read_field_header()? {
                    let (handle, member, slot) = match header.field {
                        MAP_FIELD_KEY => (key_handle, &key_member, &mut k),
                        MAP_FIELD_VALUE => (value_handle, &value_member, &mut v),
                        _ => {
                            r.skip_field(header)?;
                            continue;
                        }
                    };
                    if !handle.try_deserialize(handle.scope(), member, model, r, header.wire, slot)? {
                        return Err(Error::unsupported(self.name()));
                    }
                }
                let k = match k {
                    Some(k) => k,
                    None => key_handle.default_value(model)?.unwrap_or(Value::Null),
                };
                let v = match v {
                    Some(v) => v,
                    None => value_handle.default_value(model)?.unwrap_or(Value::Null),
                };
                Ok((k, v))
            })?;
            index.upsert(entries, k, v);
            match reader.try_read_field_header(member.number)? {
                Some(next) => wire = next,
                None => return Ok(()),
            }
        }
    }

    // =======================================================================
    // Defaults and cloning
    // =======================================================================

    fn default_value(&self, model: &TypeModel) -> Result<Option<Value>> {
        let value = match &self.shape {
            Shape::Payload => self
                .payload(&Member::root(), model.options())
                .map(|p| p.default_value()),
            Shape::Message(plan) => {
                let mut message = MessageValue::new(self.descriptor.name.clone());
                for field in &plan.fields {
                    if let Some(value) = field.handle.get(model)?.field_default(model)? {
                        message.fields.insert(field.name.clone(), value);
                    }
                }
                Some(Value::Message(message))
            }
            Shape::Repeated(_) => Some(Value::List(Vec::new())),
            Shape::Map { .. } => Some(Value::Map(Vec::new())),
            Shape::Custom(serializer) => serializer.default_value(),
        };
        Ok(value)
    }

    fn clone_value(&self, model: &TypeModel, value: &Value) -> Result<Value> {
        self.ensure_valid()?;
        if value.is_null() {
            return Ok(Value::Null);
        }
        match &self.shape {
            Shape::Payload => {
                self.payload(&Member::root(), model.options())
                    .ok_or_else(|| self.wrong_scope(self.scope))?
                    .check(value)?;
                Ok(value.clone())
            }
            Shape::Message(plan) => {
                let Value::Message(message) = value else {
                    return Err(mismatch(self.name(), value));
                };
                let mut copy = MessageValue::new(message.type_name.clone());
                self.clone_message(plan, model, message, &mut copy)?;
                Ok(Value::Message(copy))
            }
            Shape::Repeated(element) => {
                let Value::List(items) = value else {
                    return Err(mismatch(self.name(), value));
                };
                let handle = element.get(model)?;
                items
                    .iter()
                    .map(|item| {
                        if item.is_null() {
                            return Err(Error::NullElement {
                                type_name: self.name().to_string(),
                            });
                        }
                        handle.clone_value(model, item)
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List)
            }
            Shape::Map { key, value: item } => {
                let Value::Map(entries) = value else {
                    return Err(mismatch(self.name(), value));
                };
                let key_handle = key.get(model)?;
                let value_handle = item.get(model)?;
                entries
                    .iter()
                    .map(|(k, v)| Ok((key_handle.clone_value(model, k)?, value_handle.clone_value(model, v)?)))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Map)
            }
            Shape::Custom(_) => Ok(value.clone()),
        }
    }

    /// Copy the fields every level of the hierarchy declares.
    fn clone_message(&self, plan: &MessagePlan, model: &TypeModel, message: &MessageValue, copy: &mut MessageValue) -> Result<()> {
        if let Some((_, child, child_plan)) = self.derived_level(plan, model, message)? {
            child.clone_message(child_plan, model, message, copy)?;
        }
        for field in &plan.fields {
            if let Some(value) = message.fields.get(&field.name) {
                let cloned = field.handle.get(model)?.clone_value(model, value)?;
                copy.fields.insert(field.name.clone(), cloned);
            }
        }
        Ok(())
    }
}

/// Walk the base chain of `concrete` up to `declared` and return the type
/// directly below `declared`. `None` when `concrete` is `declared` itself or
/// a proxy of it.
fn subtype_path(model: &TypeModel, concrete: &str, declared: &str) -> Result<Option<Arc<str>>> {
    let mut current: Arc<str> = Arc::from(concrete);
    for _ in 0..MAX_HIERARCHY_DEPTH {
        if &*current == declared {
            return Ok(None);
        }
        let desc = model.lookup(&current).ok_or_else(|| Error::unsupported(&*current))?;
        let Some(base) = desc.base_type.clone() else {
            break;
        };
        if &*base == declared {
            let is_proxy = model.proxy_rules().is_proxy(&desc);
            return Ok((!is_proxy).then_some(current));
        }
        current = base;
    }
    Err(Error::mismatch(declared, concrete))
}
