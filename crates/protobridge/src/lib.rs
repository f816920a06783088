// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # protobridge - protobuf wire engine with runtime type dispatch
//!
//! Reads and writes Google's protobuf wire format for an object model
//! described at runtime. Types are registered on a [`TypeModel`] by name;
//! each name resolves once to a cached dispatch handle that knows the type's
//! wire shape, so values move through the engine without statically generic
//! call sites.
//!
//! ## Quick Start
//!
//! ```rust
//! use protobridge::dynamic::{MessageBuilder, MessageValue, Value};
//! use protobridge::{Result, TypeModel};
//!
//! fn main() -> Result<()> {
//!     let model = TypeModel::new();
//!     model.register(
//!         MessageBuilder::new("Shop.Order")
//!             .field(1, "id", "System.Int32")
//!             .field(2, "reference", "System.Guid")
//!             .repeated_field(3, "lines", "System.String")
//!             .build(),
//!     );
//!
//!     let order = MessageValue::new("Shop.Order")
//!         .with("id", 7i32)
//!         .with("lines", Value::List(vec!["tea".into(), "milk".into()]));
//!     let bytes = model.serialize("Shop.Order", &order.into())?;
//!     let back = model.deserialize("Shop.Order", &bytes)?;
//!     assert_eq!(back.get_field("id").and_then(|v| v.as_i32()), Some(7));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  TypeModel        registry | options | proxy rules | dispatch cache |
//! +---------------------------------------------------------------------+
//! |  dispatch         DispatchHandle (Nil | Nullable | Concrete)         |
//! +---------------------------------------------------------------------+
//! |  collections      repeated (packed/unpacked) | map entries           |
//! |  bcl              Guid | Decimal | DateTime | TimeSpan | enums       |
//! |  scalar           ProtoCodec for bool, integers, floats, text        |
//! +---------------------------------------------------------------------+
//! |  core::ser        varint | ProtoReader | ProtoWriter | features      |
//! |  core::rt         Pool | ArrayPool | ReadBuffer                      |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`model`] - type model and registry (start here)
//! - [`dynamic`] - type descriptors, builders and runtime values
//! - [`dispatch`] - cached per-type handles
//! - [`scalar`], [`bcl`], [`collections`] - statically typed codecs
//! - [`core`] - wire cursors and buffer pools

#![forbid(unsafe_code)]

/// Encoding surrogates for Guid, Decimal, DateTime, TimeSpan and enums.
pub mod bcl;
/// Repeated fields and maps.
pub mod collections;
/// Wire constants and per-model options.
pub mod config;
/// Wire primitives and buffer recycling.
pub mod core;
/// Type dispatch handles and their cache.
pub mod dispatch;
/// Runtime type descriptors and values.
pub mod dynamic;
/// Error type.
pub mod error;
/// Type model: registry, options and dispatch.
pub mod model;
/// Scalar codecs.
pub mod scalar;

pub use config::{CompatibilityLevel, GuidFormat, ModelOptions};
pub use core::ser::{ObjectScope, ProtoReader, ProtoWriter, SerializerFeatures, WireType};
pub use dispatch::DispatchHandle;
pub use dynamic::{MessageValue, TypeDescriptor, Value};
pub use error::{Error, Result};
pub use model::{DashMapTypeRegistry, TypeModel, TypeRegistry};
pub use scalar::ProtoCodec;
