// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read/write cursors for protobuf buffers.
//!
//! [`ProtoReader`] borrows the input and never reads past the end of the
//! current sub-item. [`ProtoWriter`] appends to a growable buffer and
//! backpatches sub-item lengths once the body is known.

use super::varint::{decode_varint, encode_varint, zigzag_decode64, zigzag_encode64, VarintError};
use super::{FieldHeader, WireType};
use crate::config::{DEFAULT_MAX_DEPTH, MAX_FIELD_NUMBER};
use crate::core::rt::pool::WRITER_BUFFERS;
use crate::error::{Error, Result};

/// Generate little-endian fixed-width readers.
///
/// Each generated method checks the bytes are inside the current sub-item,
/// decodes them with `from_le_bytes()` and advances the offset.
macro_rules! impl_read_fixed {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type> {
            let bytes = self.take($size)?;
            let mut raw = [0u8; $size];
            raw.copy_from_slice(bytes);
            Ok(<$type>::from_le_bytes(raw))
        }
    };
}

/// Generate little-endian fixed-width writers.
macro_rules! impl_write_fixed {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    };
}

/// Marker returned by [`ProtoReader::begin_sub_item`]; hand it back to
/// [`ProtoReader::end_sub_item`].
#[must_use = "a sub-item must be closed with end_sub_item"]
#[derive(Debug)]
pub struct ReadToken {
    outer_end: usize,
}

/// Bounds-checked protobuf reader over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct ProtoReader<'a> {
    buffer: &'a [u8],
    offset: usize,
    end: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> ProtoReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_max_depth(buffer, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(buffer: &'a [u8], max_depth: usize) -> Self {
        Self {
            buffer,
            offset: 0,
            end: buffer.len(),
            depth: 0,
            max_depth,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left in the current sub-item.
    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.offset)
    }

    /// True at the end of the current sub-item (or of the buffer at root).
    pub fn is_eof(&self) -> bool {
        self.offset >= self.end
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::UnexpectedEof {
                offset: self.offset,
            });
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    impl_read_fixed!(read_fixed32, u32, 4);
    impl_read_fixed!(read_fixed64, u64, 8);

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_fixed32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_fixed64()?))
    }

    pub fn read_varint_u64(&mut self) -> Result<u64> {
        match decode_varint(&self.buffer[self.offset..self.end]) {
            Ok((value, consumed)) => {
                self.offset += consumed;
                Ok(value)
            }
            Err(VarintError::Truncated) => Err(Error::UnexpectedEof {
                offset: self.offset,
            }),
            Err(VarintError::Overlong) => Err(Error::format(
                self.offset,
                "varint longer than 10 bytes or overflowing 64 bits",
            )),
        }
    }

    pub fn read_varint_u32(&mut self) -> Result<u32> {
        let value = self.read_varint_u64()?;
        u32::try_from(value).map_err(|_| Error::Overflow { target: "u32" })
    }

    /// Accepts both the sign-extended 10-byte form and the 5-byte
    /// two's-complement form some encoders emit for negative values.
    pub fn read_varint_i32(&mut self) -> Result<i32> {
        let value = self.read_varint_u64()?;
        if let Ok(v) = i32::try_from(value as i64) {
            return Ok(v);
        }
        u32::try_from(value)
            .map(|v| v as i32)
            .map_err(|_| Error::Overflow { target: "i32" })
    }

    pub fn read_varint_i64(&mut self) -> Result<i64> {
        Ok(self.read_varint_u64()? as i64)
    }

    pub fn read_zigzag_i64(&mut self) -> Result<i64> {
        Ok(zigzag_decode64(self.read_varint_u64()?))
    }

    pub fn read_zigzag_i32(&mut self) -> Result<i32> {
        let value = self.read_zigzag_i64()?;
        i32::try_from(value).map_err(|_| Error::Overflow { target: "i32" })
    }

    /// Next field tag, or `None` at the end of the current sub-item.
    pub fn read_field_header(&mut self) -> Result<Option<FieldHeader>> {
        if self.is_eof() {
            return Ok(None);
        }
        let at = self.offset;
        let raw = self.read_varint_u64()?;
        let field = raw >> 3;
        if field == 0 || field > u64::from(MAX_FIELD_NUMBER) {
            return Err(Error::format(at, format!("invalid field number {field}")));
        }
        let bits = (raw & 7) as u32;
        let wire = WireType::from_tag_bits(bits)
            .ok_or_else(|| Error::format(at, format!("unknown wire type {bits}")))?;
        Ok(Some(FieldHeader {
            field: field as u32,
            wire,
        }))
    }

    /// Consume the next header only if it belongs to `field`.
    pub fn try_read_field_header(&mut self, field: u32) -> Result<Option<WireType>> {
        let start = self.offset;
        match self.read_field_header()? {
            Some(header) if header.field == field => Ok(Some(header.wire)),
            _ => {
                self.offset = start;
                Ok(None)
            }
        }
    }

    /// Length prefix of a length-delimited payload.
    pub fn read_length(&mut self) -> Result<usize> {
        let at = self.offset;
        let len = self.read_varint_u64()?;
        match usize::try_from(len) {
            Ok(len) if len <= self.remaining() => Ok(len),
            _ => Err(Error::UnexpectedEof { offset: at }),
        }
    }

    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_length()?;
        self.take(len)
    }

    pub fn read_str(&mut self) -> Result<&'a str> {
        Ok(std::str::from_utf8(self.read_bytes()?)?)
    }

    /// Enter a length-delimited sub-item; reads stop at its end until
    /// [`Self::end_sub_item`] is called.
    pub fn begin_sub_item(&mut self) -> Result<ReadToken> {
        let len = self.read_length()?;
        if self.depth >= self.max_depth {
            return Err(Error::format(
                self.offset,
                format!("maximum nesting depth {} exceeded", self.max_depth),
            ));
        }
        self.depth += 1;
        let token = ReadToken {
            outer_end: self.end,
        };
        self.end = self.offset + len;
        Ok(token)
    }

    /// Leave a sub-item, discarding any bytes the caller did not consume.
    pub fn end_sub_item(&mut self, token: ReadToken) -> Result<()> {
        if token.outer_end < self.end {
            return Err(Error::format(self.offset, "sub-item tokens closed out of order"));
        }
        self.offset = self.end;
        self.end = token.outer_end;
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    pub fn read_sub_item<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let token = self.begin_sub_item()?;
        let value = body(self)?;
        self.end_sub_item(token)?;
        Ok(value)
    }

    /// Skip the payload of a field whose header was just read.
    pub fn skip_field(&mut self, header: FieldHeader) -> Result<()> {
        match header.wire {
            WireType::Varint | WireType::SignedVarint => self.read_varint_u64().map(drop),
            WireType::Fixed64 => self.take(8).map(drop),
            WireType::Fixed32 => self.take(4).map(drop),
            WireType::String => self.read_bytes().map(drop),
            WireType::StartGroup => self.skip_group(header.field),
            WireType::EndGroup => Err(Error::format(
                self.offset,
                format!("unexpected end of group {}", header.field),
            )),
            WireType::None => Err(Error::format(self.offset, "cannot skip untyped field")),
        }
    }

    fn skip_group(&mut self, field: u32) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(Error::format(
                self.offset,
                format!("maximum nesting depth {} exceeded", self.max_depth),
            ));
        }
        self.depth += 1;
        loop {
            let Some(header) = self.read_field_header()? else {
                return Err(Error::UnexpectedEof {
                    offset: self.offset,
                });
            };
            if header.wire == WireType::EndGroup {
                if header.field != field {
                    return Err(Error::format(
                        self.offset,
                        format!("group {field} closed by end group {}", header.field),
                    ));
                }
                break;
            }
            self.skip_field(header)?;
        }
        self.depth -= 1;
        Ok(())
    }
}

/// Marker returned by [`ProtoWriter::start_sub_item`].
#[must_use = "a sub-item must be closed with end_sub_item"]
#[derive(Debug)]
pub struct WriteToken {
    start: usize,
}

/// Append-only protobuf writer.
///
/// Writers created with [`ProtoWriter::rent`] take their scratch buffer from
/// the shared writer pool and give it back on drop.
#[derive(Debug, Default)]
pub struct ProtoWriter {
    buffer: Vec<u8>,
    pooled: bool,
}

impl ProtoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            pooled: false,
        }
    }

    /// Writer backed by a recycled scratch buffer.
    pub fn rent() -> Self {
        let buffer = WRITER_BUFFERS.try_get().unwrap_or_default();
        Self {
            buffer,
            pooled: true,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Finished bytes. A rented scratch buffer is copied out so it can be
    /// recycled.
    pub fn into_vec(mut self) -> Vec<u8> {
        if self.pooled {
            self.buffer.as_slice().to_vec()
        } else {
            std::mem::take(&mut self.buffer)
        }
    }

    pub fn write_field_header(&mut self, field: u32, wire: WireType) -> Result<()> {
        if field == 0 || field > MAX_FIELD_NUMBER {
            return Err(Error::InvariantViolation {
                type_name: "field header".into(),
                detail: format!("field number {field} outside 1..={MAX_FIELD_NUMBER}"),
            });
        }
        let Some(bits) = wire.tag_bits() else {
            return Err(Error::InvariantViolation {
                type_name: "field header".into(),
                detail: format!("field {field} has no wire type"),
            });
        };
        self.write_varint(u64::from(field << 3 | bits));
        Ok(())
    }

    pub fn write_varint(&mut self, value: u64) {
        encode_varint(value, &mut self.buffer);
    }

    /// Plain varint of a signed value; negatives take 10 bytes.
    pub fn write_varint_i64(&mut self, value: i64) {
        self.write_varint(value as u64);
    }

    pub fn write_varint_i32(&mut self, value: i32) {
        self.write_varint_i64(i64::from(value));
    }

    pub fn write_zigzag_i64(&mut self, value: i64) {
        self.write_varint(zigzag_encode64(value));
    }

    pub fn write_zigzag_i32(&mut self, value: i32) {
        self.write_zigzag_i64(i64::from(value));
    }

    impl_write_fixed!(write_fixed32, u32);
    impl_write_fixed!(write_fixed64, u64);

    pub fn write_f32(&mut self, value: f32) {
        self.write_fixed32(value.to_bits());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_fixed64(value.to_bits());
    }

    /// Length-prefixed bytes.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_varint(data.len() as u64);
        self.buffer.extend_from_slice(data);
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    /// Bytes copied verbatim, no prefix.
    pub fn write_raw(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Open a length-delimited sub-item. One length byte is reserved and
    /// widened in [`Self::end_sub_item`] if the body needs more.
    pub fn start_sub_item(&mut self) -> WriteToken {
        let start = self.buffer.len();
        self.buffer.push(0);
        WriteToken { start }
    }

    pub fn end_sub_item(&mut self, token: WriteToken) -> Result<()> {
        let body_start = token.start + 1;
        let Some(body_len) = self.buffer.len().checked_sub(body_start) else {
            return Err(Error::InvariantViolation {
                type_name: "sub-item".into(),
                detail: "writer truncated below an open sub-item".into(),
            });
        };
        if body_len < 0x80 {
            self.buffer[token.start] = body_len as u8;
        } else {
            let mut prefix = Vec::with_capacity(5);
            encode_varint(body_len as u64, &mut prefix);
            self.buffer.splice(token.start..body_start, prefix);
        }
        Ok(())
    }

    pub fn write_sub_item(&mut self, body: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let token = self.start_sub_item();
        body(self)?;
        self.end_sub_item(token)
    }

    /// Header plus length-delimited body for `field`.
    pub fn write_message_field(
        &mut self,
        field: u32,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.write_field_header(field, WireType::String)?;
        self.write_sub_item(body)
    }
}

impl Drop for ProtoWriter {
    fn drop(&mut self) {
        if self.pooled {
            WRITER_BUFFERS.put(std::mem::take(&mut self.buffer));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_fixed_and_eof() {
        let buf = [0x78, 0x56, 0x34, 0x12, 0x01];
        let mut reader = ProtoReader::new(&buf);
        assert_eq!(reader.read_fixed32().unwrap(), 0x1234_5678);
        assert_eq!(reader.remaining(), 1);
        match reader.read_fixed32() {
            Err(Error::UnexpectedEof { offset }) => assert_eq!(offset, 4),
            other => panic!("expected eof, got {other:?}"),
        }
    }

    #[test]
    fn test_field_header_roundtrip() {
        let mut writer = ProtoWriter::new();
        writer.write_field_header(1, WireType::Varint).unwrap();
        writer.write_varint(150);
        assert_eq!(writer.as_slice(), &[0x08, 0x96, 0x01]);

        let bytes = writer.into_vec();
        let mut reader = ProtoReader::new(&bytes);
        let header = reader.read_field_header().unwrap().unwrap();
        assert_eq!(header.field, 1);
        assert_eq!(header.wire, WireType::Varint);
        assert_eq!(reader.read_varint_u64().unwrap(), 150);
        assert!(reader.read_field_header().unwrap().is_none());
    }

    #[test]
    fn test_header_rejects_field_zero_and_bad_wire() {
        let mut reader = ProtoReader::new(&[0x00]);
        assert!(matches!(reader.read_field_header(), Err(Error::Format { .. })));

        let mut reader = ProtoReader::new(&[0x0E]);
        assert!(matches!(reader.read_field_header(), Err(Error::Format { .. })));
    }

    #[test]
    fn test_writer_rejects_invalid_field_number() {
        let mut writer = ProtoWriter::new();
        assert!(writer.write_field_header(0, WireType::Varint).is_err());
        assert!(writer
            .write_field_header(MAX_FIELD_NUMBER + 1, WireType::Varint)
            .is_err());
        assert!(writer.write_field_header(1, WireType::None).is_err());
        assert!(writer.write_field_header(MAX_FIELD_NUMBER, WireType::Fixed32).is_ok());
    }

    #[test]
    fn test_negative_varint_is_sign_extended() {
        let mut writer = ProtoWriter::new();
        writer.write_varint_i32(-1);
        assert_eq!(writer.len(), 10);

        let bytes = writer.into_vec();
        let mut reader = ProtoReader::new(&bytes);
        assert_eq!(reader.read_varint_i32().unwrap(), -1);
    }

    #[test]
    fn test_five_byte_negative_i32_accepted() {
        let mut writer = ProtoWriter::new();
        writer.write_varint(u64::from(u32::MAX));
        let bytes = writer.into_vec();
        let mut reader = ProtoReader::new(&bytes);
        assert_eq!(reader.read_varint_i32().unwrap(), -1);
    }

    #[test]
    fn test_sub_item_backpatches_long_lengths() {
        let payload = vec![0xAB; 300];
        let mut writer = ProtoWriter::new();
        writer
            .write_message_field(2, |w| {
                w.write_raw(&payload);
                Ok(())
            })
            .unwrap();
        let bytes = writer.into_vec();
        // tag, 2-byte length (300 = 0xAC 0x02), body
        assert_eq!(&bytes[..3], &[0x12, 0xAC, 0x02]);
        assert_eq!(bytes.len(), 3 + 300);

        let mut reader = ProtoReader::new(&bytes);
        let header = reader.read_field_header().unwrap().unwrap();
        assert_eq!(header.field, 2);
        let body = reader.read_bytes().unwrap();
        assert_eq!(body, payload.as_slice());
    }

    #[test]
    fn test_sub_item_limits_reads() {
        // field 1: sub-item [08 01], then field 2 varint 5
        let bytes = [0x0A, 0x02, 0x08, 0x01, 0x10, 0x05];
        let mut reader = ProtoReader::new(&bytes);
        reader.read_field_header().unwrap();
        let token = reader.begin_sub_item().unwrap();
        assert_eq!(reader.depth(), 1);
        let inner = reader.read_field_header().unwrap().unwrap();
        assert_eq!(inner.field, 1);
        assert_eq!(reader.read_varint_u64().unwrap(), 1);
        assert!(reader.read_field_header().unwrap().is_none());
        reader.end_sub_item(token).unwrap();

        let outer = reader.read_field_header().unwrap().unwrap();
        assert_eq!(outer.field, 2);
    }

    #[test]
    fn test_depth_limit() {
        // three nested empty-ish sub-items
        let bytes = [0x0A, 0x04, 0x0A, 0x02, 0x0A, 0x00];
        let mut reader = ProtoReader::with_max_depth(&bytes, 2);
        reader.read_field_header().unwrap();
        let _a = reader.begin_sub_item().unwrap();
        reader.read_field_header().unwrap();
        let _b = reader.begin_sub_item().unwrap();
        reader.read_field_header().unwrap();
        assert!(matches!(reader.begin_sub_item(), Err(Error::Format { .. })));
    }

    #[test]
    fn test_try_read_field_header_leaves_other_fields() {
        let bytes = [0x08, 0x01, 0x10, 0x02];
        let mut reader = ProtoReader::new(&bytes);
        assert_eq!(reader.try_read_field_header(2).unwrap(), None);
        assert_eq!(reader.offset(), 0);
        assert_eq!(reader.try_read_field_header(1).unwrap(), Some(WireType::Varint));
        assert_eq!(reader.read_varint_u64().unwrap(), 1);
        assert_eq!(reader.try_read_field_header(2).unwrap(), Some(WireType::Varint));
    }

    #[test]
    fn test_skip_group() {
        // field 3 start group { field 1 varint 7, field 2 fixed32 }, end group 3, field 4 varint 1
        let bytes = [
            0x1B, 0x08, 0x07, 0x15, 0x01, 0x02, 0x03, 0x04, 0x1C, 0x20, 0x01,
        ];
        let mut reader = ProtoReader::new(&bytes);
        let header = reader.read_field_header().unwrap().unwrap();
        assert_eq!(header.wire, WireType::StartGroup);
        reader.skip_field(header).unwrap();
        let next = reader.read_field_header().unwrap().unwrap();
        assert_eq!(next.field, 4);
    }

    #[test]
    fn test_skip_group_mismatched_end() {
        let bytes = [0x1B, 0x24];
        let mut reader = ProtoReader::new(&bytes);
        let header = reader.read_field_header().unwrap().unwrap();
        assert!(matches!(reader.skip_field(header), Err(Error::Format { .. })));
    }

    #[test]
    fn test_invalid_utf8_string() {
        let bytes = [0x02, 0xC3, 0x28];
        let mut reader = ProtoReader::new(&bytes);
        assert!(matches!(reader.read_str(), Err(Error::Utf8(_))));
    }

    #[test]
    fn test_rented_writer_returns_owned_bytes() {
        let mut writer = ProtoWriter::rent();
        writer.write_str("hello");
        let bytes = writer.into_vec();
        assert_eq!(bytes, b"\x05hello");
    }
}
