// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scalar codecs for statically typed values.
//!
//! A [`ProtoCodec`] reads and writes the *payload* of one field; the caller
//! owns the field header. The `wire` argument is the effective wire type,
//! i.e. the header's wire type refined by [`WireType::hint`].
//!
//! ```
//! use protobridge::core::ser::{ProtoReader, ProtoWriter, WireType};
//! use protobridge::scalar::{read_field, write_field};
//!
//! let mut writer = ProtoWriter::new();
//! write_field(&mut writer, 1, &-3i32, WireType::SignedVarint, false).unwrap();
//! let bytes = writer.into_vec();
//! assert_eq!(bytes, [0x08, 0x05]);
//!
//! let mut reader = ProtoReader::new(&bytes);
//! let header = reader.read_field_header().unwrap().unwrap();
//! let value: i32 = read_field(&mut reader, header.wire, WireType::SignedVarint, None).unwrap();
//! assert_eq!(value, -3);
//! ```

mod numeric;
mod text;

use crate::core::ser::{ProtoReader, ProtoWriter, SerializerFeatures, WireType};
use crate::core::ser::varint::varint_len;
use crate::error::{Error, Result};

/// Read/write/measure for one statically known type.
pub trait ProtoCodec: Sized {
    /// Name used in errors.
    const TYPE_NAME: &'static str;

    /// Preferred wire type and category.
    fn features() -> SerializerFeatures;

    /// Decode one payload. `existing` is the value already present for
    /// merge-capable types; scalars ignore it.
    fn read(reader: &mut ProtoReader<'_>, wire: WireType, existing: Option<Self>) -> Result<Self>;

    /// Encode one payload (no header).
    fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()>;

    /// Payload size in bytes, or `None` when `wire` does not apply.
    fn measure(&self, wire: WireType) -> Option<usize>;

    /// True when the value equals the type default and may be elided.
    fn is_default(&self) -> bool;
}

/// Write `value` as `field`, omitting it when it is the default unless
/// `emit_default` is set.
pub fn write_field<T: ProtoCodec>(
    writer: &mut ProtoWriter,
    field: u32,
    value: &T,
    wire: WireType,
    emit_default: bool,
) -> Result<()> {
    if !emit_default && value.is_default() {
        return Ok(());
    }
    writer.write_field_header(field, wire)?;
    value.write(writer, wire)
}

/// Write a nullable value: `None` is omitted, `Some(default)` is written so
/// presence survives the round trip.
pub fn write_optional_field<T: ProtoCodec>(
    writer: &mut ProtoWriter,
    field: u32,
    value: Option<&T>,
    wire: WireType,
) -> Result<()> {
    match value {
        Some(value) => write_field(writer, field, value, wire, true),
        None => Ok(()),
    }
}

/// Read the payload of a field whose header carried `header_wire`.
pub fn read_field<T: ProtoCodec>(
    reader: &mut ProtoReader<'_>,
    header_wire: WireType,
    declared: WireType,
    existing: Option<T>,
) -> Result<T> {
    T::read(reader, header_wire.hint(declared), existing)
}

/// Bytes `write_field` would produce, header included.
pub fn measure_field<T: ProtoCodec>(field: u32, value: &T, wire: WireType, emit_default: bool) -> Option<usize> {
    if !emit_default && value.is_default() {
        return Some(0);
    }
    let tag = u64::from(field) << 3;
    Some(varint_len(tag) + value.measure(wire)?)
}

pub(crate) fn unsupported_read(reader: &ProtoReader<'_>, type_name: &str, wire: WireType) -> Error {
    Error::format(
        reader.offset(),
        format!("cannot read {type_name} from wire type {wire}"),
    )
}

pub(crate) fn unsupported_write(type_name: &str, wire: WireType) -> Error {
    Error::InvariantViolation {
        type_name: type_name.to_string(),
        detail: format!("cannot be written as wire type {wire}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_elision_and_presence() {
        let mut writer = ProtoWriter::new();
        write_field(&mut writer, 1, &0i32, WireType::Varint, false).unwrap();
        assert!(writer.is_empty());

        write_field(&mut writer, 1, &0i32, WireType::Varint, true).unwrap();
        assert_eq!(writer.as_slice(), &[0x08, 0x00]);

        let mut writer = ProtoWriter::new();
        write_optional_field::<i32>(&mut writer, 2, None, WireType::Varint).unwrap();
        assert!(writer.is_empty());
        write_optional_field(&mut writer, 2, Some(&0i32), WireType::Varint).unwrap();
        assert_eq!(writer.as_slice(), &[0x10, 0x00]);
    }

    #[test]
    fn test_measure_field_matches_write() {
        let cases: [(u32, i64, WireType); 4] = [
            (1, 150, WireType::Varint),
            (16, -1, WireType::Varint),
            (3, -1, WireType::SignedVarint),
            (2047, 7, WireType::Fixed64),
        ];
        for (field, value, wire) in cases {
            let mut writer = ProtoWriter::new();
            write_field(&mut writer, field, &value, wire, false).unwrap();
            assert_eq!(
                measure_field(field, &value, wire, false),
                Some(writer.len()),
                "field {field} value {value} {wire}"
            );
        }
    }

    #[test]
    fn test_measure_rejects_inapplicable_wire() {
        assert_eq!(1u8.measure(WireType::String), None);
        assert_eq!(String::from("x").measure(WireType::Fixed32), None);
    }
}
