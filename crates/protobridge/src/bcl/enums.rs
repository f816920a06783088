// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Enum values over an integer representation.
//!
//! Values travel as plain varints. Signed representations are sign-extended
//! to 64 bits first (so `-1` takes 10 bytes), unsigned ones zero-extended.

use crate::core::ser::{ProtoReader, ProtoWriter, WireType};
use crate::error::{Error, Result};
use crate::scalar::unsupported_read;

/// Underlying integer of an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnumRepr {
    I8,
    U8,
    I16,
    U16,
    #[default]
    I32,
    U32,
    I64,
    U64,
}

impl EnumRepr {
    pub const fn bits(self) -> u32 {
        match self {
            Self::I8 | Self::U8 => 8,
            Self::I16 | Self::U16 => 16,
            Self::I32 | Self::U32 => 32,
            Self::I64 | Self::U64 => 64,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
        }
    }

    /// Truncate raw storage to the representation width and extend it back
    /// to 64 bits; this is exactly the varint payload.
    pub const fn to_wire(self, raw: u64) -> u64 {
        let bits = self.bits();
        if bits == 64 {
            return raw;
        }
        let mask = (1u64 << bits) - 1;
        let value = raw & mask;
        if self.is_signed() && (value >> (bits - 1)) & 1 == 1 {
            value | !mask
        } else {
            value
        }
    }

    /// Check a decoded varint fits the representation and return it in
    /// storage form (sign-extended for signed reprs).
    pub fn from_wire(self, wire: u64) -> Result<u64> {
        let bits = self.bits();
        if bits == 64 {
            return Ok(wire);
        }
        let fits = if self.is_signed() {
            let value = wire as i64;
            let limit = 1i64 << (bits - 1);
            (-limit..limit).contains(&value)
                // five-byte two's complement from 32-bit encoders
                || (bits == 32 && wire <= u64::from(u32::MAX))
        } else {
            wire >> bits == 0
        };
        if !fits {
            return Err(Error::Overflow { target: self.name() });
        }
        Ok(self.to_wire(wire))
    }

    pub fn from_bits(bits: u32, signed: bool) -> Option<Self> {
        match (bits, signed) {
            (8, true) => Some(Self::I8),
            (8, false) => Some(Self::U8),
            (16, true) => Some(Self::I16),
            (16, false) => Some(Self::U16),
            (32, true) => Some(Self::I32),
            (32, false) => Some(Self::U32),
            (64, true) => Some(Self::I64),
            (64, false) => Some(Self::U64),
            _ => None,
        }
    }
}

/// A statically known enum.
///
/// `to_raw` returns the value in storage form: sign-extended to 64 bits for
/// signed representations, zero-extended otherwise.
pub trait ProtoEnum: Copy {
    const REPR: EnumRepr;
    const TYPE_NAME: &'static str;

    fn to_raw(self) -> u64;

    fn from_raw(raw: u64) -> Option<Self>;
}

/// Write an enum field; the zero value is omitted unless `emit_default`.
pub fn write_enum<E: ProtoEnum>(
    writer: &mut ProtoWriter,
    field: u32,
    value: E,
    emit_default: bool,
) -> Result<()> {
    let wire = E::REPR.to_wire(value.to_raw());
    if wire == 0 && !emit_default {
        return Ok(());
    }
    writer.write_field_header(field, WireType::Varint)?;
    writer.write_varint(wire);
    Ok(())
}

/// Read an enum payload; unknown values are a format error.
pub fn read_enum<E: ProtoEnum>(reader: &mut ProtoReader<'_>, wire: WireType) -> Result<E> {
    let at = reader.offset();
    let raw = match wire {
        WireType::Varint | WireType::SignedVarint => reader.read_varint_u64()?,
        WireType::Fixed32 => u64::from(reader.read_fixed32()?),
        WireType::Fixed64 => reader.read_fixed64()?,
        _ => return Err(unsupported_read(reader, E::TYPE_NAME, wire)),
    };
    let raw = E::REPR.from_wire(raw)?;
    E::from_raw(raw).ok_or_else(|| {
        Error::format(
            at,
            format!("value {} is not defined for {}", raw as i64, E::TYPE_NAME),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Level {
        Low = -1,
        Off = 0,
        High = 1,
    }

    impl ProtoEnum for Level {
        const REPR: EnumRepr = EnumRepr::I8;
        const TYPE_NAME: &'static str = "Level";

        fn to_raw(self) -> u64 {
            self as i64 as u64
        }

        fn from_raw(raw: u64) -> Option<Self> {
            match raw as i64 {
                -1 => Some(Self::Low),
                0 => Some(Self::Off),
                1 => Some(Self::High),
                _ => None,
            }
        }
    }

    #[test]
    fn test_signed_repr_sign_extends() {
        assert_eq!(EnumRepr::I8.to_wire(0xFF), u64::MAX);
        assert_eq!(EnumRepr::U8.to_wire(0xFF), 0xFF);
        assert_eq!(EnumRepr::I16.to_wire(0x1_8000), 0xFFFF_FFFF_FFFF_8000);
        assert_eq!(EnumRepr::U64.to_wire(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_from_wire_range_checks() {
        assert_eq!(EnumRepr::I8.from_wire(u64::MAX).unwrap(), u64::MAX);
        assert!(EnumRepr::I8.from_wire(128).is_err());
        assert!(EnumRepr::U8.from_wire(256).is_err());
        assert_eq!(EnumRepr::U16.from_wire(65_535).unwrap(), 65_535);
        assert_eq!(EnumRepr::I32.from_wire(u64::from(u32::MAX)).unwrap(), u64::MAX);
    }

    #[test]
    fn test_enum_default_omitted_and_negative_roundtrip() {
        let mut writer = ProtoWriter::new();
        write_enum(&mut writer, 1, Level::Off, false).unwrap();
        assert!(writer.is_empty());

        write_enum(&mut writer, 1, Level::Low, false).unwrap();
        assert_eq!(writer.len(), 11);
        let bytes = writer.into_vec();

        let mut reader = ProtoReader::new(&bytes);
        let header = reader.read_field_header().unwrap().unwrap();
        assert_eq!(read_enum::<Level>(&mut reader, header.wire).unwrap(), Level::Low);
    }

    #[test]
    fn test_undefined_value_rejected() {
        let bytes = [0x05];
        assert!(matches!(
            read_enum::<Level>(&mut ProtoReader::new(&bytes), WireType::Varint),
            Err(Error::Format { .. })
        ));
        let bytes = [0xC8, 0x01];
        assert!(matches!(
            read_enum::<Level>(&mut ProtoReader::new(&bytes), WireType::Varint),
            Err(Error::Overflow { target: "i8" })
        ));
    }
}
