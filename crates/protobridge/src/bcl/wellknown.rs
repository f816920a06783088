// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `google.protobuf.Timestamp` and `google.protobuf.Duration`.
//!
//! Used for DateTime/TimeSpan members from compatibility level 240, or when
//! a member asks for the well-known format explicitly.

use super::time::{DateTime, DateTimeKind, TimeSpan};
use crate::config::{NANOS_PER_TICK, TICKS_PER_SECOND, WELLKNOWN_FIELD_NANOS, WELLKNOWN_FIELD_SECONDS};
use crate::core::ser::varint::varint_len;
use crate::core::ser::{ProtoReader, ProtoWriter, SerializerFeatures, WireType};
use crate::error::{Error, Result};
use crate::scalar::{unsupported_read, unsupported_write, ProtoCodec};

use super::sub_message_len;

const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// Seconds and non-negative nanos since 1970-01-01T00:00:00Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

/// Signed seconds and nanos; both carry the same sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Duration {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn from_date_time(value: DateTime) -> Self {
        let delta = value.unix_ticks();
        Self {
            seconds: delta.div_euclid(TICKS_PER_SECOND),
            nanos: (delta.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK) as i32,
        }
    }

    /// UTC instant; sub-tick nanos are truncated.
    pub fn to_date_time(&self) -> Result<DateTime> {
        let ticks = self
            .seconds
            .checked_mul(TICKS_PER_SECOND)
            .and_then(|t| t.checked_add(i64::from(self.nanos) / NANOS_PER_TICK))
            .ok_or(Error::Overflow { target: "DateTime" })?;
        DateTime::from_unix_ticks(ticks, DateTimeKind::Utc)
    }

    fn validate(&self, offset: usize) -> Result<()> {
        if !(0..NANOS_PER_SECOND).contains(&self.nanos) {
            return Err(Error::format(
                offset,
                format!("timestamp nanos {} out of range", self.nanos),
            ));
        }
        Ok(())
    }
}

impl Duration {
    pub fn from_time_span(value: TimeSpan) -> Self {
        let ticks = value.ticks();
        Self {
            seconds: ticks / TICKS_PER_SECOND,
            nanos: ((ticks % TICKS_PER_SECOND) * NANOS_PER_TICK) as i32,
        }
    }

    pub fn to_time_span(&self) -> Result<TimeSpan> {
        self.seconds
            .checked_mul(TICKS_PER_SECOND)
            .and_then(|t| t.checked_add(i64::from(self.nanos) / NANOS_PER_TICK))
            .map(TimeSpan::from_ticks)
            .ok_or(Error::Overflow { target: "TimeSpan" })
    }

    fn validate(&self, offset: usize) -> Result<()> {
        let sign_conflict =
            (self.seconds > 0 && self.nanos < 0) || (self.seconds < 0 && self.nanos > 0);
        if self.nanos.unsigned_abs() >= NANOS_PER_SECOND as u32 || sign_conflict {
            return Err(Error::format(
                offset,
                format!(
                    "duration nanos {} invalid for seconds {}",
                    self.nanos, self.seconds
                ),
            ));
        }
        Ok(())
    }
}

fn write_seconds_nanos(writer: &mut ProtoWriter, seconds: i64, nanos: i32) -> Result<()> {
    if seconds != 0 {
        writer.write_field_header(WELLKNOWN_FIELD_SECONDS, WireType::Varint)?;
        writer.write_varint_i64(seconds);
    }
    if nanos != 0 {
        writer.write_field_header(WELLKNOWN_FIELD_NANOS, WireType::Varint)?;
        writer.write_varint_i32(nanos);
    }
    Ok(())
}

fn read_seconds_nanos(reader: &mut ProtoReader<'_>) -> Result<(i64, i32)> {
    let mut seconds = 0;
    let mut nanos = 0;
    while let Some(header) = reader.read_field_header()? {
        match (header.field, header.wire) {
            (WELLKNOWN_FIELD_SECONDS, WireType::Varint) => seconds = reader.read_varint_i64()?,
            (WELLKNOWN_FIELD_NANOS, WireType::Varint) => nanos = reader.read_varint_i32()?,
            _ => reader.skip_field(header)?,
        }
    }
    Ok((seconds, nanos))
}

fn seconds_nanos_len(seconds: i64, nanos: i32) -> usize {
    let mut len = 0;
    if seconds != 0 {
        len += 1 + varint_len(seconds as u64);
    }
    if nanos != 0 {
        len += 1 + varint_len(i64::from(nanos) as u64);
    }
    len
}

pub fn write_timestamp_body(writer: &mut ProtoWriter, value: &Timestamp) -> Result<()> {
    write_seconds_nanos(writer, value.seconds, value.nanos)
}

pub fn read_timestamp_body(reader: &mut ProtoReader<'_>) -> Result<Timestamp> {
    let start = reader.offset();
    let (seconds, nanos) = read_seconds_nanos(reader)?;
    let value = Timestamp { seconds, nanos };
    value.validate(start)?;
    Ok(value)
}

pub fn write_duration_body(writer: &mut ProtoWriter, value: &Duration) -> Result<()> {
    write_seconds_nanos(writer, value.seconds, value.nanos)
}

pub fn read_duration_body(reader: &mut ProtoReader<'_>) -> Result<Duration> {
    let start = reader.offset();
    let (seconds, nanos) = read_seconds_nanos(reader)?;
    let value = Duration { seconds, nanos };
    value.validate(start)?;
    Ok(value)
}

macro_rules! impl_wellknown_codec {
    ($type:ty, $name:literal, $write:ident, $read:ident) => {
        impl ProtoCodec for $type {
            const TYPE_NAME: &'static str = $name;

            fn features() -> SerializerFeatures {
                SerializerFeatures::message()
            }

            fn read(reader: &mut ProtoReader<'_>, wire: WireType, _existing: Option<Self>) -> Result<Self> {
                match wire {
                    WireType::String => reader.read_sub_item($read),
                    _ => Err(unsupported_read(reader, $name, wire)),
                }
            }

            fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()> {
                match wire {
                    WireType::String => writer.write_sub_item(|w| $write(w, self)),
                    _ => Err(unsupported_write($name, wire)),
                }
            }

            fn measure(&self, wire: WireType) -> Option<usize> {
                (wire == WireType::String)
                    .then(|| sub_message_len(seconds_nanos_len(self.seconds, self.nanos)))
            }

            fn is_default(&self) -> bool {
                self.seconds == 0 && self.nanos == 0
            }
        }
    };
}

impl_wellknown_codec!(Timestamp, "google.protobuf.Timestamp", write_timestamp_body, read_timestamp_body);
impl_wellknown_codec!(Duration, "google.protobuf.Duration", write_duration_body, read_duration_body);
