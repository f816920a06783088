// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Repeated fields, packed and unpacked.

use crate::core::rt::ReadBuffer;
use crate::core::ser::{ProtoReader, ProtoWriter, WireType};
use crate::error::Result;
use crate::scalar::ProtoCodec;

/// Write every element at `field`.
///
/// Unpacked: one tagged entry per element, default elements included.
/// Packed (only honoured for numeric wire types): one length-delimited
/// block holding the bare payloads.
pub fn write_repeated<T: ProtoCodec>(
    writer: &mut ProtoWriter,
    field: u32,
    items: &[T],
    wire: WireType,
    packed: bool,
) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    if packed && wire.is_packable() {
        return writer.write_message_field(field, |w| {
            items.iter().try_for_each(|item| item.write(w, wire))
        });
    }
    for item in items {
        writer.write_field_header(field, wire)?;
        item.write(writer, wire)?;
    }
    Ok(())
}

/// Consume the run of entries for `field` that starts with the header just
/// read (`header_wire`), appending each element to `buffer`.
///
/// Packed blocks are accepted for packable declared wire types whatever the
/// writer chose, and packed and unpacked entries may be mixed.
pub fn read_repeated_with<T, F>(
    reader: &mut ProtoReader<'_>,
    field: u32,
    header_wire: WireType,
    declared: WireType,
    buffer: &mut ReadBuffer<T>,
    mut read_one: F,
) -> Result<()>
where
    T: Send + 'static,
    F: FnMut(&mut ProtoReader<'_>, WireType) -> Result<T>,
{
    let mut wire = header_wire;
    loop {
        if wire == WireType::String && declared.is_packable() {
            reader.read_sub_item(|r| {
                while !r.is_eof() {
                    buffer.push(read_one(r, declared)?)?;
                }
                Ok(())
            })?;
        } else {
            buffer.push(read_one(reader, wire.hint(declared))?)?;
        }
        match reader.try_read_field_header(field)? {
            Some(next) => wire = next,
            None => return Ok(()),
        }
    }
}

/// [`read_repeated_with`] for codec types, collected into a `Vec`.
pub fn read_repeated<T: ProtoCodec + Send + 'static>(
    reader: &mut ProtoReader<'_>,
    field: u32,
    header_wire: WireType,
    declared: WireType,
) -> Result<Vec<T>> {
    let mut buffer = ReadBuffer::new();
    read_repeated_with(reader, field, header_wire, declared, &mut buffer, |r, wire| {
        T::read(r, wire, None)
    })?;
    Ok(buffer.into_vec())
}
