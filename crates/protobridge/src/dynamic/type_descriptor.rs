// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors for runtime type information.

use super::serializer::ValueSerializer;
use super::value::Value;
use crate::bcl::{DateTime, EnumRepr, Guid, TimeSpan};
use crate::core::ser::{FeatureOptions, WireType};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Scalar kinds with a native protobuf encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Bytes,
}

impl ScalarKind {
    /// Platform name the kind is registered under.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Bool => "System.Boolean",
            Self::I8 => "System.SByte",
            Self::I16 => "System.Int16",
            Self::I32 => "System.Int32",
            Self::I64 => "System.Int64",
            Self::U8 => "System.Byte",
            Self::U16 => "System.UInt16",
            Self::U32 => "System.UInt32",
            Self::U64 => "System.UInt64",
            Self::F32 => "System.Single",
            Self::F64 => "System.Double",
            Self::String => "System.String",
            Self::Bytes => "System.Byte[]",
        }
    }

    /// Wire type used when the member asks for nothing special.
    pub const fn default_wire(self) -> WireType {
        match self {
            Self::Bool
            | Self::I8
            | Self::I16
            | Self::I32
            | Self::I64
            | Self::U8
            | Self::U16
            | Self::U32
            | Self::U64 => WireType::Varint,
            Self::F32 => WireType::Fixed32,
            Self::F64 => WireType::Fixed64,
            Self::String | Self::Bytes => WireType::String,
        }
    }

    pub const fn is_signed_integer(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::U8 | Self::U16 | Self::U32 | Self::U64
        )
    }

    pub fn default_value(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::I8 => Value::I8(0),
            Self::I16 => Value::I16(0),
            Self::I32 => Value::I32(0),
            Self::I64 => Value::I64(0),
            Self::U8 => Value::U8(0),
            Self::U16 => Value::U16(0),
            Self::U32 => Value::U32(0),
            Self::U64 => Value::U64(0),
            Self::F32 => Value::F32(0.0),
            Self::F64 => Value::F64(0.0),
            Self::String => Value::String(String::new()),
            Self::Bytes => Value::Bytes(Vec::new()),
        }
    }
}

/// Platform value types without a protobuf scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurrogateKind {
    Guid,
    Decimal,
    DateTime,
    TimeSpan,
}

impl SurrogateKind {
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Guid => "System.Guid",
            Self::Decimal => "System.Decimal",
            Self::DateTime => "System.DateTime",
            Self::TimeSpan => "System.TimeSpan",
        }
    }

    pub fn default_value(self) -> Value {
        match self {
            Self::Guid => Value::Guid(Guid::EMPTY),
            Self::Decimal => Value::Decimal(Decimal::ZERO),
            Self::DateTime => Value::DateTime(DateTime::MIN),
            Self::TimeSpan => Value::TimeSpan(TimeSpan::ZERO),
        }
    }
}

/// Per-member encoding override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFormat {
    /// The type's own encoding (compatibility level applies to surrogates).
    #[default]
    Default,
    /// Zigzag varint for signed integers.
    ZigZag,
    /// Fixed32/Fixed64 for integers, raw ticks for DateTime/TimeSpan.
    FixedSize,
    /// google.protobuf.Timestamp/Duration for DateTime/TimeSpan.
    WellKnown,
    /// String form for Guid and Decimal.
    Text,
}

/// Enumeration type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumDescriptor {
    pub repr: EnumRepr,
    pub variants: Vec<EnumVariant>,
}

impl EnumDescriptor {
    pub fn new(variants: Vec<EnumVariant>) -> Self {
        Self {
            repr: EnumRepr::default(),
            variants,
        }
    }

    #[must_use]
    pub fn with_repr(mut self, repr: EnumRepr) -> Self {
        self.repr = repr;
        self
    }

    pub fn variant(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn variant_by_value(&self, value: i64) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.value == value)
    }

    /// Storage bits of a declared value.
    pub fn raw_of(&self, value: i64) -> u64 {
        self.repr.to_wire(value as u64)
    }
}

/// Enum variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

impl EnumVariant {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One serialized member of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field number on the wire.
    pub number: u32,
    /// Key in [`MessageValue::fields`](super::MessageValue).
    pub name: String,
    /// Name of the member's type, resolved through the model.
    pub type_name: Arc<str>,
    pub data_format: DataFormat,
    /// Write the member even when it holds the type default.
    pub emit_default: bool,
    /// Packed encoding for repeated numeric members; `None` follows the model.
    pub packed: Option<bool>,
}

impl FieldDescriptor {
    pub fn new(number: u32, name: impl Into<String>, type_name: impl Into<Arc<str>>) -> Self {
        Self {
            number,
            name: name.into(),
            type_name: type_name.into(),
            data_format: DataFormat::Default,
            emit_default: false,
            packed: None,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: DataFormat) -> Self {
        self.data_format = format;
        self
    }

    #[must_use]
    pub fn emit_default(mut self) -> Self {
        self.emit_default = true;
        self
    }

    #[must_use]
    pub fn packed(mut self, packed: bool) -> Self {
        self.packed = Some(packed);
        self
    }
}

/// A known derived type, written as a nested field of its base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtypeDescriptor {
    pub number: u32,
    pub type_name: Arc<str>,
}

/// Fields and known subtypes of a message type, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageDescriptor {
    pub fields: Vec<FieldDescriptor>,
    pub subtypes: Vec<SubtypeDescriptor>,
}

impl MessageDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }

    pub fn subtype_by_number(&self, number: u32) -> Option<&SubtypeDescriptor> {
        self.subtypes.iter().find(|s| s.number == number)
    }
}

/// Type kind enumeration.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Scalar(ScalarKind),
    Surrogate(SurrogateKind),
    Enum(EnumDescriptor),
    Message(MessageDescriptor),
    /// Ordered sequence of the named element type.
    Repeated(Arc<str>),
    Map {
        key: Arc<str>,
        value: Arc<str>,
    },
    /// Optional value of the named inner type.
    Nullable(Arc<str>),
    /// Open generic parameter; never serializable.
    GenericParameter,
    /// Externally supplied serializer.
    Custom(Arc<dyn ValueSerializer>),
}

/// A complete type descriptor.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: Arc<str>,
    /// Declared base type; also the substitute when a proxy rule matches.
    pub base_type: Option<Arc<str>>,
    /// Implemented interface names.
    pub interfaces: Vec<Arc<str>>,
    pub is_value_type: bool,
    pub kind: TypeKind,
    /// Options merged into the type's serializer features.
    pub feature_options: FeatureOptions,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<Arc<str>>, kind: TypeKind) -> Self {
        let is_value_type = matches!(
            kind,
            TypeKind::Scalar(_) | TypeKind::Surrogate(_) | TypeKind::Enum(_) | TypeKind::Nullable(_)
        );
        Self {
            name: name.into(),
            base_type: None,
            interfaces: Vec::new(),
            is_value_type,
            kind,
            feature_options: FeatureOptions::empty(),
        }
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        Self::new(kind.type_name(), TypeKind::Scalar(kind))
    }

    pub fn surrogate(kind: SurrogateKind) -> Self {
        Self::new(kind.type_name(), TypeKind::Surrogate(kind))
    }

    /// `T[]`-named sequence of `element`.
    pub fn repeated(element: impl Into<Arc<str>>) -> Self {
        let element = element.into();
        Self::new(format!("{element}[]"), TypeKind::Repeated(element))
    }

    pub fn map(name: impl Into<Arc<str>>, key: impl Into<Arc<str>>, value: impl Into<Arc<str>>) -> Self {
        Self::new(
            name,
            TypeKind::Map {
                key: key.into(),
                value: value.into(),
            },
        )
    }

    /// `T?`-named optional `inner`.
    pub fn nullable(inner: impl Into<Arc<str>>) -> Self {
        let inner = inner.into();
        Self::new(format!("{inner}?"), TypeKind::Nullable(inner))
    }

    pub fn generic_parameter(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, TypeKind::GenericParameter)
    }

    pub fn custom(name: impl Into<Arc<str>>, serializer: Arc<dyn ValueSerializer>) -> Self {
        Self::new(name, TypeKind::Custom(serializer))
    }

    #[must_use]
    pub fn with_base(mut self, base: impl Into<Arc<str>>) -> Self {
        self.base_type = Some(base.into());
        self
    }

    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<Arc<str>>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: FeatureOptions) -> Self {
        self.feature_options |= options;
        self
    }

    #[must_use]
    pub fn value_type(mut self, is_value_type: bool) -> Self {
        self.is_value_type = is_value_type;
        self
    }

    /// Everything before the last `.` of the name, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(ns, _)| ns)
    }

    pub fn is_message(&self) -> bool {
        matches!(self.kind, TypeKind::Message(_))
    }

    pub fn message(&self) -> Option<&MessageDescriptor> {
        match &self.kind {
            TypeKind::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Whether values may be used as map keys.
    pub fn is_valid_map_key(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Scalar(_) | TypeKind::Surrogate(_) | TypeKind::Enum(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_from_name() {
        let desc = TypeDescriptor::new("Shop.Orders.Order", TypeKind::Message(MessageDescriptor::default()));
        assert_eq!(desc.namespace(), Some("Shop.Orders"));
        assert!(!desc.is_value_type);
        let desc = TypeDescriptor::new("Order", TypeKind::Message(MessageDescriptor::default()));
        assert_eq!(desc.namespace(), None);
    }

    #[test]
    fn test_synthesised_names() {
        assert_eq!(&*TypeDescriptor::repeated("System.Int32").name, "System.Int32[]");
        let nullable = TypeDescriptor::nullable("System.Guid");
        assert_eq!(&*nullable.name, "System.Guid?");
        assert!(nullable.is_value_type);
    }

    #[test]
    fn test_enum_descriptor_lookup() {
        let desc = EnumDescriptor::new(vec![
            EnumVariant::new("Red", 0),
            EnumVariant::new("Green", 1),
            EnumVariant::new("Gone", -1),
        ])
        .with_repr(EnumRepr::I16);
        assert_eq!(desc.variant("Green").map(|v| v.value), Some(1));
        assert_eq!(desc.variant_by_value(-1).map(|v| v.name.as_str()), Some("Gone"));
        assert_eq!(desc.raw_of(-1), u64::MAX);
    }

    #[test]
    fn test_map_key_validity() {
        assert!(TypeDescriptor::scalar(ScalarKind::String).is_valid_map_key());
        assert!(TypeDescriptor::surrogate(SurrogateKind::Guid).is_valid_map_key());
        assert!(!TypeDescriptor::repeated("System.Int32").is_valid_map_key());
    }
}
