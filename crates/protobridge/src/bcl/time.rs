// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TimeSpan and DateTime surrogates (bcl.proto `TimeSpan`/`DateTime`).
//!
//! ```text
//! field 1  zigzag  value in the selected unit     (omitted when 0)
//! field 2  varint  TimeSpanScale                 (omitted when Days)
//! field 3  varint  DateTimeKind                  (only when requested and not Unspecified)
//! ```
//!
//! The writer picks the coarsest unit that represents the tick count
//! exactly. The extreme values travel as `MinMax` with value -1 or +1.
//! DateTime values are deltas from 1970-01-01.

use std::fmt;

use super::sub_message_len;
use crate::config::{
    MAX_DATE_TIME_TICKS, TICKS_PER_DAY, TICKS_PER_HOUR, TICKS_PER_MILLISECOND, TICKS_PER_MINUTE,
    TICKS_PER_SECOND, TIME_FIELD_KIND, TIME_FIELD_SCALE, TIME_FIELD_VALUE, UNIX_EPOCH_TICKS,
};
use crate::core::ser::varint::{varint_len, zigzag_encode64};
use crate::core::ser::{ProtoReader, ProtoWriter, SerializerFeatures, WireType};
use crate::error::{Error, Result};
use crate::scalar::{unsupported_read, unsupported_write, ProtoCodec};

/// Unit of a [`ScaledTicks`] value. Discriminants are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeSpanScale {
    Days = 0,
    Hours = 1,
    Minutes = 2,
    Seconds = 3,
    Milliseconds = 4,
    Ticks = 5,
    MinMax = 15,
}

impl TimeSpanScale {
    /// Candidate units from coarsest to finest.
    const DIVISIBLE: [TimeSpanScale; 5] = [
        Self::Days,
        Self::Hours,
        Self::Minutes,
        Self::Seconds,
        Self::Milliseconds,
    ];

    pub const fn wire_value(self) -> u32 {
        self as u32
    }

    pub const fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Days),
            1 => Some(Self::Hours),
            2 => Some(Self::Minutes),
            3 => Some(Self::Seconds),
            4 => Some(Self::Milliseconds),
            5 => Some(Self::Ticks),
            15 => Some(Self::MinMax),
            _ => None,
        }
    }

    /// Ticks per unit; `None` for `MinMax`.
    pub const fn ticks_per_unit(self) -> Option<i64> {
        match self {
            Self::Days => Some(TICKS_PER_DAY),
            Self::Hours => Some(TICKS_PER_HOUR),
            Self::Minutes => Some(TICKS_PER_MINUTE),
            Self::Seconds => Some(TICKS_PER_SECOND),
            Self::Milliseconds => Some(TICKS_PER_MILLISECOND),
            Self::Ticks => Some(1),
            Self::MinMax => None,
        }
    }
}

/// Clock a DateTime value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateTimeKind {
    #[default]
    Unspecified = 0,
    Utc = 1,
    Local = 2,
}

impl DateTimeKind {
    pub const fn wire_value(self) -> u32 {
        self as u32
    }

    pub const fn from_wire(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::Unspecified),
            1 => Some(Self::Utc),
            2 => Some(Self::Local),
            _ => None,
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Epoch each kind's deltas are measured from.
const EPOCH_ORIGINS: [i64; 3] = [UNIX_EPOCH_TICKS; 3];

/// A tick count expressed in its coarsest exact unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaledTicks {
    pub value: i64,
    pub scale: TimeSpanScale,
    pub kind: DateTimeKind,
}

impl ScaledTicks {
    pub const MIN: ScaledTicks = Self::min_max(-1);
    pub const MAX: ScaledTicks = Self::min_max(1);

    const fn min_max(value: i64) -> Self {
        Self {
            value,
            scale: TimeSpanScale::MinMax,
            kind: DateTimeKind::Unspecified,
        }
    }

    /// Coarsest exact representation of `ticks`.
    pub fn from_ticks(ticks: i64, kind: DateTimeKind) -> Self {
        for scale in TimeSpanScale::DIVISIBLE {
            if let Some(unit) = scale.ticks_per_unit() {
                if ticks % unit == 0 {
                    return Self {
                        value: ticks / unit,
                        scale,
                        kind,
                    };
                }
            }
        }
        Self {
            value: ticks,
            scale: TimeSpanScale::Ticks,
            kind,
        }
    }

    pub fn for_time_span(value: TimeSpan) -> Self {
        match value {
            TimeSpan::MIN => Self::MIN,
            TimeSpan::MAX => Self::MAX,
            _ => Self::from_ticks(value.ticks(), DateTimeKind::Unspecified),
        }
    }

    /// The MinMax sentinels drop the kind, so no kind field follows them.
    pub fn for_date_time(value: DateTime) -> Self {
        let kind = value.kind();
        if value.ticks() == DateTime::MIN.ticks() {
            Self::MIN
        } else if value.ticks() == DateTime::MAX.ticks() {
            Self::MAX
        } else {
            Self::from_ticks(value.ticks() - EPOCH_ORIGINS[kind.index()], kind)
        }
    }

    /// Multiply back to ticks. `MinMax` maps to `min`/`max`.
    pub fn to_ticks(&self, min: i64, max: i64, offset: usize) -> Result<i64> {
        match self.scale.ticks_per_unit() {
            Some(unit) => self
                .value
                .checked_mul(unit)
                .ok_or(Error::Overflow { target: "ticks" }),
            None => match self.value {
                -1 => Ok(min),
                1 => Ok(max),
                other => Err(Error::format(
                    offset,
                    format!("MinMax scale with value {other} (expected -1 or 1)"),
                )),
            },
        }
    }

    fn body_len(&self, include_kind: bool) -> usize {
        let mut len = 0;
        if self.value != 0 {
            len += 1 + varint_len(zigzag_encode64(self.value));
        }
        if self.scale != TimeSpanScale::Days {
            len += 1 + varint_len(u64::from(self.scale.wire_value()));
        }
        if include_kind && self.kind != DateTimeKind::Unspecified {
            len += 2;
        }
        len
    }

    fn write_body(&self, writer: &mut ProtoWriter, include_kind: bool) -> Result<()> {
        if self.value != 0 {
            writer.write_field_header(TIME_FIELD_VALUE, WireType::SignedVarint)?;
            writer.write_zigzag_i64(self.value);
        }
        if self.scale != TimeSpanScale::Days {
            writer.write_field_header(TIME_FIELD_SCALE, WireType::Varint)?;
            writer.write_varint(u64::from(self.scale.wire_value()));
        }
        if include_kind && self.kind != DateTimeKind::Unspecified {
            writer.write_field_header(TIME_FIELD_KIND, WireType::Varint)?;
            writer.write_varint(u64::from(self.kind.wire_value()));
        }
        Ok(())
    }

    fn read_body(reader: &mut ProtoReader<'_>) -> Result<Self> {
        let mut scaled = Self::from_ticks(0, DateTimeKind::Unspecified);
        while let Some(header) = reader.read_field_header()? {
            let at = reader.offset();
            match (header.field, header.wire) {
                (TIME_FIELD_VALUE, WireType::Varint) => scaled.value = reader.read_zigzag_i64()?,
                (TIME_FIELD_SCALE, WireType::Varint) => {
                    let raw = reader.read_varint_u64()?;
                    scaled.scale = u32::try_from(raw)
                        .ok()
                        .and_then(TimeSpanScale::from_wire)
                        .ok_or_else(|| Error::format(at, format!("unknown time scale {raw}")))?;
                }
                (TIME_FIELD_KIND, WireType::Varint) => {
                    let raw = reader.read_varint_u64()?;
                    scaled.kind = DateTimeKind::from_wire(raw)
                        .ok_or_else(|| Error::format(at, format!("unknown date-time kind {raw}")))?;
                }
                _ => reader.skip_field(header)?,
            }
        }
        Ok(scaled)
    }
}

/// Signed interval in 100 ns ticks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TimeSpan {
    ticks: i64,
}

impl TimeSpan {
    pub const ZERO: TimeSpan = TimeSpan { ticks: 0 };
    pub const MIN: TimeSpan = TimeSpan { ticks: i64::MIN };
    pub const MAX: TimeSpan = TimeSpan { ticks: i64::MAX };

    pub const fn from_ticks(ticks: i64) -> Self {
        Self { ticks }
    }

    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    /// `value` units of `scale`, or `None` on overflow or for `MinMax`.
    pub fn from_units(value: i64, scale: TimeSpanScale) -> Option<Self> {
        let unit = scale.ticks_per_unit()?;
        value.checked_mul(unit).map(Self::from_ticks)
    }

    pub fn from_seconds(seconds: i64) -> Option<Self> {
        Self::from_units(seconds, TimeSpanScale::Seconds)
    }

    pub fn from_millis(millis: i64) -> Option<Self> {
        Self::from_units(millis, TimeSpanScale::Milliseconds)
    }
}

impl fmt::Debug for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeSpan({} ticks)", self.ticks)
    }
}

/// Calendar instant in 100 ns ticks since 0001-01-01, with its kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DateTime {
    ticks: i64,
    kind: DateTimeKind,
}

impl DateTime {
    pub const MIN: DateTime = DateTime {
        ticks: 0,
        kind: DateTimeKind::Unspecified,
    };
    pub const MAX: DateTime = DateTime {
        ticks: MAX_DATE_TIME_TICKS,
        kind: DateTimeKind::Unspecified,
    };

    pub fn new(ticks: i64, kind: DateTimeKind) -> Result<Self> {
        if !(0..=MAX_DATE_TIME_TICKS).contains(&ticks) {
            return Err(Error::Overflow { target: "DateTime" });
        }
        Ok(Self { ticks, kind })
    }

    pub const fn unix_epoch(kind: DateTimeKind) -> Self {
        Self {
            ticks: UNIX_EPOCH_TICKS,
            kind,
        }
    }

    /// Instant `delta` ticks after 1970-01-01.
    pub fn from_unix_ticks(delta: i64, kind: DateTimeKind) -> Result<Self> {
        let ticks = delta
            .checked_add(EPOCH_ORIGINS[kind.index()])
            .ok_or(Error::Overflow { target: "DateTime" })?;
        Self::new(ticks, kind)
    }

    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    pub const fn kind(&self) -> DateTimeKind {
        self.kind
    }

    pub const fn unix_ticks(&self) -> i64 {
        self.ticks - UNIX_EPOCH_TICKS
    }

    #[must_use]
    pub const fn with_kind(self, kind: DateTimeKind) -> Self {
        Self {
            ticks: self.ticks,
            kind,
        }
    }
}

impl fmt::Debug for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DateTime({} ticks, {:?})", self.ticks, self.kind)
    }
}

pub fn write_time_span_body(writer: &mut ProtoWriter, value: TimeSpan) -> Result<()> {
    ScaledTicks::for_time_span(value).write_body(writer, false)
}

pub fn read_time_span_body(reader: &mut ProtoReader<'_>) -> Result<TimeSpan> {
    let start = reader.offset();
    let scaled = ScaledTicks::read_body(reader)?;
    scaled
        .to_ticks(i64::MIN, i64::MAX, start)
        .map(TimeSpan::from_ticks)
}

/// Kind is written only when `include_kind` is set and the kind is not
/// Unspecified.
pub fn write_date_time_body(writer: &mut ProtoWriter, value: DateTime, include_kind: bool) -> Result<()> {
    ScaledTicks::for_date_time(value).write_body(writer, include_kind)
}

/// The kind of a MinMax value is not carried over.
pub fn read_date_time_body(reader: &mut ProtoReader<'_>) -> Result<DateTime> {
    let start = reader.offset();
    let scaled = ScaledTicks::read_body(reader)?;
    if scaled.scale == TimeSpanScale::MinMax {
        let ticks = scaled.to_ticks(DateTime::MIN.ticks(), DateTime::MAX.ticks(), start)?;
        return DateTime::new(ticks, DateTimeKind::Unspecified);
    }
    let delta = scaled.to_ticks(i64::MIN, i64::MAX, start)?;
    DateTime::from_unix_ticks(delta, scaled.kind)
}

/// Fixed64 form: the raw tick count.
pub fn write_time_span_fixed(writer: &mut ProtoWriter, value: TimeSpan) {
    writer.write_fixed64(value.ticks() as u64);
}

pub fn read_time_span_fixed(reader: &mut ProtoReader<'_>) -> Result<TimeSpan> {
    Ok(TimeSpan::from_ticks(reader.read_fixed64()? as i64))
}

/// Fixed64 form: the raw tick delta from 1970-01-01.
pub fn write_date_time_fixed(writer: &mut ProtoWriter, value: DateTime) {
    writer.write_fixed64(value.unix_ticks() as u64);
}

pub fn read_date_time_fixed(reader: &mut ProtoReader<'_>) -> Result<DateTime> {
    DateTime::from_unix_ticks(reader.read_fixed64()? as i64, DateTimeKind::Unspecified)
}

impl ProtoCodec for TimeSpan {
    const TYPE_NAME: &'static str = "System.TimeSpan";

    fn features() -> SerializerFeatures {
        SerializerFeatures::scalar(WireType::String)
    }

    fn read(reader: &mut ProtoReader<'_>, wire: WireType, _existing: Option<Self>) -> Result<Self> {
        match wire {
            WireType::String => reader.read_sub_item(read_time_span_body),
            WireType::Fixed64 => read_time_span_fixed(reader),
            _ => Err(unsupported_read(reader, Self::TYPE_NAME, wire)),
        }
    }

    fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()> {
        match wire {
            WireType::String => writer.write_sub_item(|w| write_time_span_body(w, *self)),
            WireType::Fixed64 => {
                write_time_span_fixed(writer, *self);
                Ok(())
            }
            _ => Err(unsupported_write(Self::TYPE_NAME, wire)),
        }
    }

    fn measure(&self, wire: WireType) -> Option<usize> {
        match wire {
            WireType::String => Some(sub_message_len(ScaledTicks::for_time_span(*self).body_len(false))),
            WireType::Fixed64 => Some(8),
            _ => None,
        }
    }

    fn is_default(&self) -> bool {
        self.ticks == 0
    }
}

impl ProtoCodec for DateTime {
    const TYPE_NAME: &'static str = "System.DateTime";

    fn features() -> SerializerFeatures {
        SerializerFeatures::scalar(WireType::String)
    }

    fn read(reader: &mut ProtoReader<'_>, wire: WireType, _existing: Option<Self>) -> Result<Self> {
        match wire {
            WireType::String => reader.read_sub_item(read_date_time_body),
            WireType::Fixed64 => read_date_time_fixed(reader),
            _ => Err(unsupported_read(reader, Self::TYPE_NAME, wire)),
        }
    }

    fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()> {
        match wire {
            WireType::String => writer.write_sub_item(|w| write_date_time_body(w, *self, false)),
            WireType::Fixed64 => {
                write_date_time_fixed(writer, *self);
                Ok(())
            }
            _ => Err(unsupported_write(Self::TYPE_NAME, wire)),
        }
    }

    fn measure(&self, wire: WireType) -> Option<usize> {
        match wire {
            WireType::String => Some(sub_message_len(ScaledTicks::for_date_time(*self).body_len(false))),
            WireType::Fixed64 => Some(8),
            _ => None,
        }
    }

    fn is_default(&self) -> bool {
        *self == DateTime::MIN
    }
}
