// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decimal surrogate over [`rust_decimal::Decimal`].
//!
//! ```text
//! field 1  varint  (mid << 32) | lo
//! field 2  varint  hi
//! field 3  varint  (scale << 1) | sign
//! ```
//!
//! Each field is omitted when zero, so `0m` has an empty body.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::sub_message_len;
use crate::config::{DECIMAL_FIELD_HIGH, DECIMAL_FIELD_LOW, DECIMAL_FIELD_SIGN_SCALE};
use crate::core::ser::varint::varint_len;
use crate::core::ser::{ProtoReader, ProtoWriter, SerializerFeatures, WireType};
use crate::error::{Error, Result};
use crate::scalar::{unsupported_read, unsupported_write, ProtoCodec};

/// Largest scale a decimal can carry.
pub const MAX_DECIMAL_SCALE: u32 = 28;

/// Bits 1..=8 of the sign-scale field; anything above is ignored.
const SCALE_MASK: u32 = 0x01FE;

/// The 96-bit mantissa, sign and scale of a decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecimalBits {
    pub lo: u32,
    pub mid: u32,
    pub hi: u32,
    pub negative: bool,
    pub scale: u32,
}

impl DecimalBits {
    pub fn from_decimal(value: &Decimal) -> Self {
        let mantissa = value.mantissa().unsigned_abs();
        Self {
            lo: mantissa as u32,
            mid: (mantissa >> 32) as u32,
            hi: (mantissa >> 64) as u32,
            negative: value.is_sign_negative(),
            scale: value.scale(),
        }
    }

    pub fn to_decimal(&self, offset: usize) -> Result<Decimal> {
        if self.scale > MAX_DECIMAL_SCALE {
            return Err(Error::format(
                offset,
                format!("decimal scale {} exceeds {MAX_DECIMAL_SCALE}", self.scale),
            ));
        }
        Ok(Decimal::from_parts(
            self.lo,
            self.mid,
            self.hi,
            self.negative,
            self.scale,
        ))
    }

    fn low_word(&self) -> u64 {
        (u64::from(self.mid) << 32) | u64::from(self.lo)
    }

    fn sign_scale(&self) -> u64 {
        (u64::from(self.scale) << 1) | u64::from(self.negative)
    }

    fn body_len(&self) -> usize {
        let field = |value: u64| if value == 0 { 0 } else { 1 + varint_len(value) };
        field(self.low_word()) + field(u64::from(self.hi)) + field(self.sign_scale())
    }
}

pub fn write_decimal_body(writer: &mut ProtoWriter, value: &Decimal) -> Result<()> {
    let bits = DecimalBits::from_decimal(value);
    let fields = [
        (DECIMAL_FIELD_LOW, bits.low_word()),
        (DECIMAL_FIELD_HIGH, u64::from(bits.hi)),
        (DECIMAL_FIELD_SIGN_SCALE, bits.sign_scale()),
    ];
    for (field, word) in fields {
        if word != 0 {
            writer.write_field_header(field, WireType::Varint)?;
            writer.write_varint(word);
        }
    }
    Ok(())
}

pub fn read_decimal_body(reader: &mut ProtoReader<'_>) -> Result<Decimal> {
    let start = reader.offset();
    let mut low = 0u64;
    let mut hi = 0u32;
    let mut sign_scale = 0u32;
    while let Some(header) = reader.read_field_header()? {
        match (header.field, header.wire) {
            (DECIMAL_FIELD_LOW, WireType::Varint) => low = reader.read_varint_u64()?,
            (DECIMAL_FIELD_HIGH, WireType::Varint) => hi = reader.read_varint_u32()?,
            (DECIMAL_FIELD_SIGN_SCALE, WireType::Varint) => {
                sign_scale = reader.read_varint_u32()?;
            }
            _ => reader.skip_field(header)?,
        }
    }
    let bits = DecimalBits {
        lo: low as u32,
        mid: (low >> 32) as u32,
        hi,
        negative: sign_scale & 1 == 1,
        scale: (sign_scale & SCALE_MASK) >> 1,
    };
    bits.to_decimal(start)
}

/// Text form used from compatibility level 300: the invariant decimal string.
pub fn write_decimal_text(writer: &mut ProtoWriter, value: &Decimal) {
    writer.write_str(&value.to_string());
}

pub fn read_decimal_text(reader: &mut ProtoReader<'_>) -> Result<Decimal> {
    let at = reader.offset();
    let text = reader.read_str()?;
    if text.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(text).map_err(|e| Error::format(at, format!("malformed decimal {text:?}: {e}")))
}

impl ProtoCodec for Decimal {
    const TYPE_NAME: &'static str = "System.Decimal";

    fn features() -> SerializerFeatures {
        SerializerFeatures::scalar(WireType::String)
    }

    fn read(reader: &mut ProtoReader<'_>, wire: WireType, _existing: Option<Self>) -> Result<Self> {
        match wire {
            WireType::String => reader.read_sub_item(read_decimal_body),
            _ => Err(unsupported_read(reader, Self::TYPE_NAME, wire)),
        }
    }

    fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()> {
        match wire {
            WireType::String => writer.write_sub_item(|w| write_decimal_body(w, self)),
            _ => Err(unsupported_write(Self::TYPE_NAME, wire)),
        }
    }

    fn measure(&self, wire: WireType) -> Option<usize> {
        (wire == WireType::String).then(|| sub_message_len(DecimalBits::from_decimal(self).body_len()))
    }

    fn is_default(&self) -> bool {
        self.is_zero()
    }
}
