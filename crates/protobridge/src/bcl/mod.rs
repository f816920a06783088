// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Surrogate encodings for platform value types.
//!
//! Guid, Decimal, DateTime and TimeSpan have no protobuf scalar, so they
//! travel as small messages with fixed field numbers (bcl.proto). From
//! compatibility level 240 DateTime/TimeSpan may use the well-known
//! Timestamp/Duration messages instead; from level 300 Guid and Decimal
//! may travel as text.

pub mod decimal;
pub mod enums;
pub mod guid;
pub mod time;
pub mod wellknown;

pub use decimal::{read_decimal_body, read_decimal_text, write_decimal_body, write_decimal_text, DecimalBits};
pub use enums::{read_enum, write_enum, EnumRepr, ProtoEnum};
pub use guid::{read_guid_body, read_guid_text, write_guid_body, write_guid_text, Guid, GuidHalves};
pub use time::{
    read_date_time_body, read_date_time_fixed, read_time_span_body, read_time_span_fixed,
    write_date_time_body, write_date_time_fixed, write_time_span_body, write_time_span_fixed,
    DateTime, DateTimeKind, ScaledTicks, TimeSpan, TimeSpanScale,
};
pub use wellknown::{
    read_duration_body, read_timestamp_body, write_duration_body, write_timestamp_body, Duration,
    Timestamp,
};

use crate::core::ser::varint::varint_len;

/// Size of a length-delimited payload with a body of `body_len` bytes.
pub(crate) fn sub_message_len(body_len: usize) -> usize {
    varint_len(body_len as u64) + body_len
}
