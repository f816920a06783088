// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serializer features: what a type looks like on the wire.
//!
//! Every serializable type declares exactly one category plus a preferred
//! wire type. The category decides how the type is framed when it is the
//! root object, which the dispatch layer caches as an [`ObjectScope`].

use bitflags::bitflags;

use super::WireType;

bitflags! {
    /// Category bits. Exactly one must be set for a well-formed type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CategoryFlags: u8 {
        const SCALAR = 1 << 0;
        const MESSAGE = 1 << 1;
        const REPEATED = 1 << 2;
        const MESSAGE_WRAPPED_AT_ROOT = 1 << 3;
    }
}

bitflags! {
    /// Optional behaviour flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FeatureOptions: u8 {
        /// Never write repeated values of this type packed.
        const PACKED_DISABLED = 1 << 0;
        /// Scalar that is framed as a one-field message.
        const WRAPPED_VALUE = 1 << 1;
        /// Clear existing collection contents before reading.
        const CLEAR_COLLECTION = 1 << 2;
    }
}

/// The single category a well-formed feature set declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Scalar,
    Message,
    Repeated,
    MessageWrappedAtRoot,
}

/// Root framing derived from [`SerializerFeatures`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectScope {
    /// Contradictory declared features.
    Invalid,
    /// Body written with no envelope.
    Message,
    /// Elements (or body) written at field 1 of an implicit envelope.
    LikeRoot,
    /// Scalar inside a one-field message.
    WrappedMessage,
    /// Scalar at field 1.
    Scalar,
}

/// Immutable wire capabilities of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializerFeatures {
    wire_type: WireType,
    categories: CategoryFlags,
    options: FeatureOptions,
}

impl SerializerFeatures {
    #[must_use]
    pub const fn new(wire_type: WireType, categories: CategoryFlags, options: FeatureOptions) -> Self {
        Self {
            wire_type,
            categories,
            options,
        }
    }

    #[must_use]
    pub const fn scalar(wire_type: WireType) -> Self {
        Self::new(wire_type, CategoryFlags::SCALAR, FeatureOptions::empty())
    }

    #[must_use]
    pub const fn message() -> Self {
        Self::new(WireType::String, CategoryFlags::MESSAGE, FeatureOptions::empty())
    }

    #[must_use]
    pub const fn repeated() -> Self {
        Self::new(WireType::String, CategoryFlags::REPEATED, FeatureOptions::empty())
    }

    #[must_use]
    pub const fn wrapped_at_root() -> Self {
        Self::new(
            WireType::String,
            CategoryFlags::MESSAGE_WRAPPED_AT_ROOT,
            FeatureOptions::empty(),
        )
    }

    #[must_use]
    pub const fn with_options(mut self, options: FeatureOptions) -> Self {
        self.options = self.options.union(options);
        self
    }

    #[must_use]
    pub const fn wire_type(&self) -> WireType {
        self.wire_type
    }

    #[must_use]
    pub const fn categories(&self) -> CategoryFlags {
        self.categories
    }

    #[must_use]
    pub const fn options(&self) -> FeatureOptions {
        self.options
    }

    /// The declared category, or `None` when zero or several bits are set.
    #[must_use]
    pub fn category(&self) -> Option<Category> {
        if self.categories == CategoryFlags::SCALAR {
            Some(Category::Scalar)
        } else if self.categories == CategoryFlags::MESSAGE {
            Some(Category::Message)
        } else if self.categories == CategoryFlags::REPEATED {
            Some(Category::Repeated)
        } else if self.categories == CategoryFlags::MESSAGE_WRAPPED_AT_ROOT {
            Some(Category::MessageWrappedAtRoot)
        } else {
            None
        }
    }

    #[must_use]
    pub fn scope(&self) -> ObjectScope {
        ObjectScope::from_features(self)
    }
}

impl ObjectScope {
    #[must_use]
    pub fn from_features(features: &SerializerFeatures) -> Self {
        match features.category() {
            Some(Category::Scalar) if features.options.contains(FeatureOptions::WRAPPED_VALUE) => {
                Self::WrappedMessage
            }
            Some(Category::Scalar) => Self::Scalar,
            Some(Category::Message) => Self::Message,
            Some(Category::Repeated | Category::MessageWrappedAtRoot) => Self::LikeRoot,
            None => Self::Invalid,
        }
    }
}
