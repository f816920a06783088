// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder API for TypeDescriptor.

use super::type_descriptor::{
    DataFormat, EnumDescriptor, EnumVariant, FieldDescriptor, MessageDescriptor, SubtypeDescriptor,
    TypeDescriptor, TypeKind,
};
use crate::bcl::EnumRepr;
use crate::core::ser::FeatureOptions;
use std::sync::Arc;

/// Builder for message types.
#[derive(Debug)]
pub struct MessageBuilder {
    name: Arc<str>,
    base_type: Option<Arc<str>>,
    interfaces: Vec<Arc<str>>,
    is_value_type: bool,
    options: FeatureOptions,
    message: MessageDescriptor,
}

impl MessageBuilder {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            base_type: None,
            interfaces: Vec::new(),
            is_value_type: false,
            options: FeatureOptions::empty(),
            message: MessageDescriptor::default(),
        }
    }

    /// Add a field with the default encoding.
    pub fn field(self, number: u32, name: impl Into<String>, type_name: impl Into<Arc<str>>) -> Self {
        self.field_with(FieldDescriptor::new(number, name, type_name))
    }

    /// Add a field with an encoding override.
    pub fn field_as(
        self,
        number: u32,
        name: impl Into<String>,
        type_name: impl Into<Arc<str>>,
        format: DataFormat,
    ) -> Self {
        self.field_with(FieldDescriptor::new(number, name, type_name).with_format(format))
    }

    /// Add a `T[]` field.
    pub fn repeated_field(
        self,
        number: u32,
        name: impl Into<String>,
        element: impl Into<Arc<str>>,
    ) -> Self {
        let element: Arc<str> = element.into();
        self.field(number, name, format!("{element}[]"))
    }

    /// Add a `T?` field.
    pub fn optional_field(
        self,
        number: u32,
        name: impl Into<String>,
        inner: impl Into<Arc<str>>,
    ) -> Self {
        let inner: Arc<str> = inner.into();
        self.field(number, name, format!("{inner}?"))
    }

    pub fn field_with(mut self, field: FieldDescriptor) -> Self {
        self.message.fields.push(field);
        self
    }

    /// Declare a known subtype written at `number`.
    pub fn subtype(mut self, number: u32, type_name: impl Into<Arc<str>>) -> Self {
        self.message.subtypes.push(SubtypeDescriptor {
            number,
            type_name: type_name.into(),
        });
        self
    }

    pub fn base(mut self, base: impl Into<Arc<str>>) -> Self {
        self.base_type = Some(base.into());
        self
    }

    pub fn interface(mut self, interface: impl Into<Arc<str>>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn value_type(mut self) -> Self {
        self.is_value_type = true;
        self
    }

    pub fn options(mut self, options: FeatureOptions) -> Self {
        self.options |= options;
        self
    }

    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor {
            name: self.name,
            base_type: self.base_type,
            interfaces: self.interfaces,
            is_value_type: self.is_value_type,
            kind: TypeKind::Message(self.message),
            feature_options: self.options,
        }
    }
}

/// Builder for enum types.
#[derive(Debug)]
pub struct EnumBuilder {
    name: Arc<str>,
    variants: Vec<EnumVariant>,
    next_value: i64,
    repr: EnumRepr,
}

impl EnumBuilder {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
            next_value: 0,
            repr: EnumRepr::I32,
        }
    }

    /// Add a variant with auto-incrementing value.
    pub fn variant(mut self, name: impl Into<String>) -> Self {
        self.variants.push(EnumVariant::new(name, self.next_value));
        self.next_value = self.next_value.wrapping_add(1);
        self
    }

    /// Add a variant with explicit value.
    pub fn variant_value(mut self, name: impl Into<String>, value: i64) -> Self {
        self.variants.push(EnumVariant::new(name, value));
        self.next_value = value.wrapping_add(1);
        self
    }

    pub fn repr(mut self, repr: EnumRepr) -> Self {
        self.repr = repr;
        self
    }

    pub fn build(self) -> TypeDescriptor {
        let desc = EnumDescriptor::new(self.variants).with_repr(self.repr);
        TypeDescriptor::new(self.name, TypeKind::Enum(desc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_builder() {
        let desc = MessageBuilder::new("Shop.Order")
            .field(1, "id", "System.Int32")
            .repeated_field(2, "lines", "Shop.Line")
            .optional_field(3, "discount", "System.Decimal")
            .field_as(4, "placed", "System.DateTime", DataFormat::WellKnown)
            .subtype(10, "Shop.RushOrder")
            .build();

        let message = desc.message().expect("message");
        assert_eq!(message.fields.len(), 4);
        assert_eq!(&*message.fields[1].type_name, "Shop.Line[]");
        assert_eq!(&*message.fields[2].type_name, "System.Decimal?");
        assert_eq!(message.fields[3].data_format, DataFormat::WellKnown);
        assert_eq!(message.subtype_by_number(10).map(|s| &*s.type_name), Some("Shop.RushOrder"));
        assert!(!desc.is_value_type);
    }

    #[test]
    fn test_enum_builder_numbering() {
        let desc = EnumBuilder::new("Color")
            .variant("Red")
            .variant("Green")
            .variant_value("Blue", 10)
            .variant("Cyan")
            .build();
        let TypeKind::Enum(e) = &desc.kind else {
            panic!("expected enum");
        };
        let values: Vec<i64> = e.variants.iter().map(|v| v.value).collect();
        assert_eq!(values, vec![0, 1, 10, 11]);
        assert!(desc.is_value_type);
    }
}
