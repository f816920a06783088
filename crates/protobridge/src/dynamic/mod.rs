// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type descriptions and values.
//!
//! Types are described by name: a [`TypeDescriptor`] refers to the types of
//! its fields, elements and base by name, and the [`TypeModel`] resolves
//! those names when a dispatch handle is built. Names ending in `[]` and
//! `?` are synthesised as repeated and nullable forms of the prefix.
//!
//! # Example
//!
//! ```rust
//! use protobridge::dynamic::{MessageBuilder, MessageValue, Value};
//! use protobridge::TypeModel;
//!
//! let model = TypeModel::new();
//! model.register(
//!     MessageBuilder::new("SensorReading")
//!         .field(1, "sensor_id", "System.UInt32")
//!         .field(2, "temperature", "System.Double")
//!         .build(),
//! );
//!
//! let reading = MessageValue::new("SensorReading")
//!     .with("sensor_id", 42u32)
//!     .with("temperature", 23.5f64);
//! let bytes = model.serialize("SensorReading", &reading.into()).unwrap();
//! let back = model.deserialize("SensorReading", &bytes).unwrap();
//! assert_eq!(back.get_field("temperature"), Some(&Value::F64(23.5)));
//! ```
//!
//! [`TypeModel`]: crate::TypeModel

mod builder;
mod builtin;
mod serializer;
mod type_descriptor;
mod value;

pub use builder::{EnumBuilder, MessageBuilder};
pub use builtin::builtin;
pub(crate) use builtin::{synthesised, Synthesised};
pub use serializer::ValueSerializer;
pub use type_descriptor::{
    DataFormat, EnumDescriptor, EnumVariant, FieldDescriptor, MessageDescriptor, ScalarKind,
    SubtypeDescriptor, SurrogateKind, TypeDescriptor, TypeKind,
};
pub use value::{MessageValue, Value};
