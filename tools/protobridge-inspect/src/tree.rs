// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-less field tree of a protobuf payload.

use protobridge::core::ser::varint::zigzag_decode64;
use protobridge::core::ser::{ProtoReader, WireType};
use protobridge::{Error, Result};

/// One decoded field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub number: u32,
    /// Byte offset of the field tag.
    pub offset: usize,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    /// Length-delimited payload that parses completely as fields.
    Message(Vec<Field>),
    Text(String),
    Bytes(Vec<u8>),
    Group(Vec<Field>),
}

/// Decode `bytes` into a field tree. Length-delimited payloads are shown
/// as nested messages when they parse cleanly, else as text or bytes.
pub fn decode_tree(bytes: &[u8], max_depth: usize) -> Result<Vec<Field>> {
    let mut reader = ProtoReader::new(bytes);
    let fields = read_fields(&mut reader, 0, max_depth, None)?;
    Ok(fields)
}

fn read_fields(
    reader: &mut ProtoReader<'_>,
    depth: usize,
    max_depth: usize,
    group: Option<u32>,
) -> Result<Vec<Field>> {
    if depth > max_depth {
        return Err(Error::format(reader.offset(), format!("maximum nesting depth {max_depth} exceeded")));
    }
    let mut fields = Vec::new();
    loop {
        let offset = reader.offset();
        let Some(header) = reader.read_field_header()? else {
            return match group {
                Some(number) => Err(Error::format(offset, format!("group {number} is not closed"))),
                None => Ok(fields),
            };
        };
        let payload = match header.wire {
            WireType::Varint | WireType::SignedVarint => Payload::Varint(reader.read_varint_u64()?),
            WireType::Fixed64 => Payload::Fixed64(reader.read_fixed64()?),
            WireType::Fixed32 => Payload::Fixed32(reader.read_fixed32()?),
            WireType::String => classify(reader.read_bytes()?, depth, max_depth),
            WireType::StartGroup => Payload::Group(read_fields(reader, depth + 1, max_depth, Some(header.field))?),
            WireType::EndGroup => {
                if group == Some(header.field) {
                    return Ok(fields);
                }
                return Err(Error::format(offset, format!("unexpected end of group {}", header.field)));
            }
            WireType::None => return Err(Error::format(offset, "untyped field")),
        };
        fields.push(Field {
            number: header.field,
            offset,
            payload,
        });
    }
}

fn classify(data: &[u8], depth: usize, max_depth: usize) -> Payload {
    if !data.is_empty() {
        let mut inner = ProtoReader::new(data);
        if let Ok(fields) = read_fields(&mut inner, depth + 1, max_depth, None) {
            // printable text that happens to parse is still text
            let printable = std::str::from_utf8(data).is_ok_and(is_printable);
            if !printable {
                return Payload::Message(fields);
            }
        }
    }
    match std::str::from_utf8(data) {
        Ok(text) if is_printable(text) => Payload::Text(text.to_owned()),
        _ => Payload::Bytes(data.to_vec()),
    }
}

fn is_printable(text: &str) -> bool {
    text.chars().all(|c| !c.is_control() || c == '\n' || c == '\t')
}

/// Signed readings of a varint: two's complement and zigzag.
pub fn varint_views(value: u64) -> (i64, i64) {
    (value as i64, zigzag_decode64(value))
}
