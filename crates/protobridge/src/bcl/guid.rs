// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Guid surrogate.
//!
//! Binary body (bcl.proto `Guid`):
//!
//! ```text
//! field 1  fixed64  bytes 0..8 of the platform layout, little-endian
//! field 2  fixed64  bytes 8..16 of the platform layout, little-endian
//! ```
//!
//! The platform layout stores the first three groups little-endian and the
//! last eight bytes as written, so the text `12345678-2345-3456-...` starts
//! with bytes `78 56 34 12 45 23 56 34`.

use std::fmt;
use std::str::FromStr;

use super::sub_message_len;
use crate::config::{GuidFormat, GUID_FIELD_HIGH, GUID_FIELD_LOW};
use crate::core::ser::{ProtoReader, ProtoWriter, SerializerFeatures, WireType};
use crate::error::{Error, Result};
use crate::scalar::{unsupported_read, unsupported_write, ProtoCodec};

/// 128-bit identifier in the platform byte layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid([u8; 16]);

/// The two fixed64 halves written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuidHalves {
    pub low: u64,
    pub high: u64,
}

impl Guid {
    pub const EMPTY: Guid = Guid([0; 16]);

    /// From the platform (mixed-endian) byte layout.
    pub const fn from_bytes_le(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes_le(&self) -> [u8; 16] {
        self.0
    }

    /// From the 16 bytes in display order (as the hex digits read).
    pub fn from_bytes_be(display: [u8; 16]) -> Self {
        let mut bytes = display;
        bytes[0..4].reverse();
        bytes[4..6].reverse();
        bytes[6..8].reverse();
        Self(bytes)
    }

    pub fn to_bytes_be(&self) -> [u8; 16] {
        let mut display = self.0;
        display[0..4].reverse();
        display[4..6].reverse();
        display[6..8].reverse();
        display
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0; 16]
    }

    pub fn halves(&self) -> GuidHalves {
        let mut low = [0u8; 8];
        let mut high = [0u8; 8];
        low.copy_from_slice(&self.0[..8]);
        high.copy_from_slice(&self.0[8..]);
        GuidHalves {
            low: u64::from_le_bytes(low),
            high: u64::from_le_bytes(high),
        }
    }

    pub fn from_halves(halves: GuidHalves) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&halves.low.to_le_bytes());
        bytes[8..].copy_from_slice(&halves.high.to_le_bytes());
        Self(bytes)
    }

    /// Lowercase text in the requested layout.
    pub fn to_text(&self, format: GuidFormat) -> String {
        let digits = hex::encode(self.to_bytes_be());
        match format {
            GuidFormat::N => digits,
            GuidFormat::D => format!(
                "{}-{}-{}-{}-{}",
                &digits[0..8],
                &digits[8..12],
                &digits[12..16],
                &digits[16..20],
                &digits[20..32]
            ),
        }
    }

    /// Parse the 32-digit or the hyphenated 36-character form.
    pub fn parse(text: &str) -> Result<Self> {
        let digits: String = match text.len() {
            32 => text.to_owned(),
            36 => {
                let bytes = text.as_bytes();
                if [8, 13, 18, 23].iter().any(|&i| bytes[i] != b'-') {
                    return Err(Error::format(0, format!("malformed guid text {text:?}")));
                }
                text.split('-').collect()
            }
            len => return Err(Error::format(0, format!("guid text has length {len}"))),
        };
        let mut display = [0u8; 16];
        hex::decode_to_slice(&digits, &mut display)
            .map_err(|e| Error::format(0, format!("malformed guid text {text:?}: {e}")))?;
        Ok(Self::from_bytes_be(display))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text(GuidFormat::D))
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

impl FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Write the bcl body; the empty Guid writes nothing.
pub fn write_guid_body(writer: &mut ProtoWriter, guid: &Guid) -> Result<()> {
    if guid.is_empty() {
        return Ok(());
    }
    let GuidHalves { low, high } = guid.halves();
    writer.write_field_header(GUID_FIELD_LOW, WireType::Fixed64)?;
    writer.write_fixed64(low);
    writer.write_field_header(GUID_FIELD_HIGH, WireType::Fixed64)?;
    writer.write_fixed64(high);
    Ok(())
}

/// Read a bcl body up to the end of the current sub-item. Missing halves
/// are zero.
pub fn read_guid_body(reader: &mut ProtoReader<'_>) -> Result<Guid> {
    let mut halves = GuidHalves { low: 0, high: 0 };
    while let Some(header) = reader.read_field_header()? {
        match (header.field, header.wire) {
            (GUID_FIELD_LOW, WireType::Fixed64) => halves.low = reader.read_fixed64()?,
            (GUID_FIELD_HIGH, WireType::Fixed64) => halves.high = reader.read_fixed64()?,
            _ => reader.skip_field(header)?,
        }
    }
    Ok(Guid::from_halves(halves))
}

/// Write the text form as a length-delimited string payload.
pub fn write_guid_text(writer: &mut ProtoWriter, guid: &Guid, format: GuidFormat) {
    writer.write_str(&guid.to_text(format));
}

/// Read a text payload, detecting the layout from its length:
/// 0 (empty Guid), 16 (raw bytes in display order), 32 ("N") or 36 ("D").
pub fn read_guid_text(reader: &mut ProtoReader<'_>) -> Result<Guid> {
    let at = reader.offset();
    let payload = reader.read_bytes()?;
    let parsed = match payload.len() {
        0 => Ok(Guid::EMPTY),
        16 => Guid::parse(&hex::encode(payload)),
        32 | 36 => std::str::from_utf8(payload)
            .map_err(Error::from)
            .and_then(Guid::parse),
        len => Err(Error::format(at, format!("guid text has length {len}"))),
    };
    parsed.map_err(|err| match err {
        Error::Format { reason, .. } => Error::Format { offset: at, reason },
        other => other,
    })
}

impl ProtoCodec for Guid {
    const TYPE_NAME: &'static str = "System.Guid";

    fn features() -> SerializerFeatures {
        SerializerFeatures::scalar(WireType::String)
    }

    fn read(reader: &mut ProtoReader<'_>, wire: WireType, _existing: Option<Self>) -> Result<Self> {
        match wire {
            WireType::String => reader.read_sub_item(read_guid_body),
            _ => Err(unsupported_read(reader, Self::TYPE_NAME, wire)),
        }
    }

    fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()> {
        match wire {
            WireType::String => writer.write_sub_item(|w| write_guid_body(w, self)),
            _ => Err(unsupported_write(Self::TYPE_NAME, wire)),
        }
    }

    fn measure(&self, wire: WireType) -> Option<usize> {
        (wire == WireType::String).then(|| sub_message_len(if self.is_empty() { 0 } else { 18 }))
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }
}
