// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Protobuf wire primitives.
//!
//! - [`varint`]: LEB128 and zigzag.
//! - [`cursor`]: bounds-checked [`ProtoReader`] and growable [`ProtoWriter`].
//! - [`features`]: per-type wire capabilities and their [`ObjectScope`].

pub mod cursor;
pub mod features;
pub mod varint;

pub use cursor::{ProtoReader, ProtoWriter, ReadToken, WriteToken};
pub use features::{Category, CategoryFlags, FeatureOptions, ObjectScope, SerializerFeatures};

use std::fmt;

/// Wire encoding of a single field payload.
///
/// `SignedVarint` is a logical type: it travels with the varint bits and only
/// changes how the payload is interpreted. `None` is the "no wire shape"
/// marker returned for unsupported or contradictory types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Varint,
    Fixed64,
    String,
    StartGroup,
    EndGroup,
    Fixed32,
    SignedVarint,
    None,
}

impl WireType {
    /// Low three bits of the field tag, or `None` for [`WireType::None`].
    #[must_use]
    pub const fn tag_bits(self) -> Option<u32> {
        match self {
            Self::Varint | Self::SignedVarint => Some(0),
            Self::Fixed64 => Some(1),
            Self::String => Some(2),
            Self::StartGroup => Some(3),
            Self::EndGroup => Some(4),
            Self::Fixed32 => Some(5),
            Self::None => None,
        }
    }

    #[must_use]
    pub const fn from_tag_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::String),
            3 => Some(Self::StartGroup),
            4 => Some(Self::EndGroup),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }

    /// Interpret a header's wire type in the light of the declared one.
    ///
    /// Only the varint/zigzag ambiguity is resolved; any other mismatch is
    /// left for the payload reader to accept or reject.
    #[must_use]
    pub const fn hint(self, declared: WireType) -> WireType {
        match (self, declared) {
            (Self::Varint, Self::SignedVarint) => Self::SignedVarint,
            _ => self,
        }
    }

    /// Whether values of this wire type may share one length-delimited block.
    #[must_use]
    pub const fn is_packable(self) -> bool {
        matches!(
            self,
            Self::Varint | Self::SignedVarint | Self::Fixed32 | Self::Fixed64
        )
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Decoded field tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldHeader {
    pub field: u32,
    pub wire: WireType,
}
