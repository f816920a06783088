// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! protobridge configuration - single source of truth
//!
//! - **Level 1 (Static)**: wire constants, surrogate field numbers, pool
//!   capacities and tick arithmetic. **Never hardcode these elsewhere.**
//! - **Level 2 (Per model)**: [`ModelOptions`], fixed when a
//!   [`TypeModel`](crate::TypeModel) is built. Dispatch handles bake the
//!   options into their cached features, so options never change afterwards.
//!
//! # Example
//!
//! ```
//! use protobridge::config::{CompatibilityLevel, ModelOptions};
//!
//! let options = ModelOptions::builder()
//!     .compatibility_level(CompatibilityLevel::Level240)
//!     .include_date_time_kind(true)
//!     .build();
//! assert!(options.include_date_time_kind);
//! ```

// =======================================================================
// Wire format
// =======================================================================

/// Largest legal protobuf field number (2^29 - 1).
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Field number used for the implicit envelope around non-message roots.
pub const ROOT_ENVELOPE_FIELD: u32 = 1;

// =======================================================================
// Surrogate field numbers (part of the wire contract, never renumber)
// =======================================================================

/// Guid: low 8 bytes (fixed64).
pub const GUID_FIELD_LOW: u32 = 1;
/// Guid: high 8 bytes (fixed64).
pub const GUID_FIELD_HIGH: u32 = 2;

/// Decimal: `(mid << 32) | lo` (varint).
pub const DECIMAL_FIELD_LOW: u32 = 1;
/// Decimal: `hi` (varint).
pub const DECIMAL_FIELD_HIGH: u32 = 2;
/// Decimal: `(scale << 1) | sign` (varint).
pub const DECIMAL_FIELD_SIGN_SCALE: u32 = 3;

/// DateTime/TimeSpan: tick value in the selected unit (zigzag varint).
pub const TIME_FIELD_VALUE: u32 = 1;
/// DateTime/TimeSpan: unit (varint enum).
pub const TIME_FIELD_SCALE: u32 = 2;
/// DateTime: kind (varint enum, optional).
pub const TIME_FIELD_KIND: u32 = 3;

/// google.protobuf.Timestamp / Duration: seconds.
pub const WELLKNOWN_FIELD_SECONDS: u32 = 1;
/// google.protobuf.Timestamp / Duration: nanos.
pub const WELLKNOWN_FIELD_NANOS: u32 = 2;

/// Map entry key.
pub const MAP_FIELD_KEY: u32 = 1;
/// Map entry value.
pub const MAP_FIELD_VALUE: u32 = 2;

// =======================================================================
// Resource recycling
// =======================================================================

/// Capacity of the shared overflow queue behind each [`Pool`](crate::core::rt::Pool).
pub const SHARED_POOL_CAPACITY: usize = 20;

/// Initial capacity rented by a [`ReadBuffer`](crate::core::rt::ReadBuffer).
pub const READ_BUFFER_INITIAL_CAPACITY: usize = 16;

/// Hard ceiling for a [`ReadBuffer`](crate::core::rt::ReadBuffer); growing past it is fatal.
pub const READ_BUFFER_MAX_CAPACITY: usize = 0x7FFF_FFC7;

/// Arrays retained per size class in the shared array pool.
pub const ARRAY_POOL_ARRAYS_PER_BUCKET: usize = 8;

/// Largest array (in elements) the shared array pool keeps; bigger arrays are freed.
pub const ARRAY_POOL_MAX_RETAINED: usize = 1 << 20;

/// Writer buffers above this capacity are not recycled.
pub const WRITER_BUFFER_MAX_RETAINED: usize = 1 << 20;

// =======================================================================
// Tick arithmetic (100 ns ticks)
// =======================================================================

pub const TICKS_PER_MILLISECOND: i64 = 10_000;
pub const TICKS_PER_SECOND: i64 = 1_000 * TICKS_PER_MILLISECOND;
pub const TICKS_PER_MINUTE: i64 = 60 * TICKS_PER_SECOND;
pub const TICKS_PER_HOUR: i64 = 60 * TICKS_PER_MINUTE;
pub const TICKS_PER_DAY: i64 = 24 * TICKS_PER_HOUR;

/// Nanoseconds per tick.
pub const NANOS_PER_TICK: i64 = 100;

/// Ticks from 0001-01-01T00:00:00 to 1970-01-01T00:00:00.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Ticks of 9999-12-31T23:59:59.9999999, the largest representable DateTime.
pub const MAX_DATE_TIME_TICKS: i64 = 3_155_378_975_999_999_999;

// =======================================================================
// Per-model options
// =======================================================================

/// Default maximum nesting depth for length-delimited reads.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Wire shape generation used for surrogate types that have several encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompatibilityLevel {
    /// bcl.proto surrogates for Guid, Decimal, DateTime and TimeSpan.
    #[default]
    Level200,
    /// DateTime/TimeSpan as google.protobuf.Timestamp/Duration.
    Level240,
    /// Level 240 plus Guid and Decimal as text.
    Level300,
}

/// Text layout used when writing a Guid as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GuidFormat {
    /// 32 hex digits, no hyphens.
    N,
    /// 36 characters, hyphenated 8-4-4-4-12.
    #[default]
    D,
}

/// Options shared by every dispatch handle of one [`TypeModel`](crate::TypeModel).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModelOptions {
    /// Default wire generation for surrogate members.
    pub compatibility_level: CompatibilityLevel,
    /// Emit DateTime kind (field 3) for non-Unspecified kinds.
    pub include_date_time_kind: bool,
    /// Text layout for Guid strings.
    pub guid_format: GuidFormat,
    /// Write repeated numeric scalars packed unless a member opts out.
    pub pack_repeated_by_default: bool,
    /// Maximum nesting of length-delimited reads before input is rejected.
    pub max_depth: usize,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            compatibility_level: CompatibilityLevel::Level200,
            include_date_time_kind: false,
            guid_format: GuidFormat::D,
            pack_repeated_by_default: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ModelOptions {
    /// Start a fluent builder from the defaults.
    #[must_use]
    pub fn builder() -> ModelOptionsBuilder {
        ModelOptionsBuilder::default()
    }
}

/// Fluent builder for [`ModelOptions`].
#[derive(Debug, Clone, Default)]
pub struct ModelOptionsBuilder {
    options: ModelOptions,
}

impl ModelOptionsBuilder {
    #[must_use]
    pub fn compatibility_level(mut self, level: CompatibilityLevel) -> Self {
        self.options.compatibility_level = level;
        self
    }

    #[must_use]
    pub fn include_date_time_kind(mut self, enabled: bool) -> Self {
        self.options.include_date_time_kind = enabled;
        self
    }

    #[must_use]
    pub fn guid_format(mut self, format: GuidFormat) -> Self {
        self.options.guid_format = format;
        self
    }

    #[must_use]
    pub fn pack_repeated_by_default(mut self, enabled: bool) -> Self {
        self.options.pack_repeated_by_default = enabled;
        self
    }

    /// Clamp to at least 1 so a root message can always be read.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = depth.max(1);
        self
    }

    #[must_use]
    pub fn build(self) -> ModelOptions {
        self.options
    }
}
