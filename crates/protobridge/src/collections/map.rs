// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Map fields: one length-delimited entry message per pair, key at field 1
//! and value at field 2. Default keys and values are elided inside the
//! entry, so `(0, "")` travels as an empty entry and still counts.

use crate::config::{MAP_FIELD_KEY, MAP_FIELD_VALUE};
use crate::core::ser::{ProtoReader, ProtoWriter, WireType};
use crate::error::{Error, Result};
use crate::scalar::{read_field, write_field, ProtoCodec};

/// Write one entry per pair, in iteration order.
pub fn write_map<'a, K, V, I>(
    writer: &mut ProtoWriter,
    field: u32,
    entries: I,
    key_wire: WireType,
    value_wire: WireType,
) -> Result<()>
where
    K: ProtoCodec + 'a,
    V: ProtoCodec + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    for (key, value) in entries {
        writer.write_message_field(field, |w| {
            write_field(w, MAP_FIELD_KEY, key, key_wire, false)?;
            write_field(w, MAP_FIELD_VALUE, value, value_wire, false)
        })?;
    }
    Ok(())
}

/// Read one entry payload; a missing key or value is its type default.
pub fn read_map_entry<K, V>(
    reader: &mut ProtoReader<'_>,
    key_wire: WireType,
    value_wire: WireType,
) -> Result<(K, V)>
where
    K: ProtoCodec + Default,
    V: ProtoCodec + Default,
{
    reader.read_sub_item(|r| {
        let mut key = None;
        let mut value = None;
        while let Some(header) = r.read_field_header()? {
            match header.field {
                MAP_FIELD_KEY => key = Some(read_field(r, header.wire, key_wire, key.take())?),
                MAP_FIELD_VALUE => {
                    value = Some(read_field(r, header.wire, value_wire, value.take())?)
                }
                _ => r.skip_field(header)?,
            }
        }
        Ok((key.unwrap_or_default(), value.unwrap_or_default()))
    })
}

/// Consume the run of entries for `field` into `map`. With a keyed
/// collection a repeated key keeps the last value.
pub fn read_map<K, V, M>(
    reader: &mut ProtoReader<'_>,
    field: u32,
    header_wire: WireType,
    key_wire: WireType,
    value_wire: WireType,
    map: &mut M,
) -> Result<()>
where
    K: ProtoCodec + Default,
    V: ProtoCodec + Default,
    M: Extend<(K, V)>,
{
    let mut wire = header_wire;
    loop {
        if wire != WireType::String {
            return Err(Error::format(
                reader.offset(),
                format!("map entry for field {field} must be length-delimited, found {wire}"),
            ));
        }
        map.extend(std::iter::once(read_map_entry(reader, key_wire, value_wire)?));
        match reader.try_read_field_header(field)? {
            Some(next) => wire = next,
            None => return Ok(()),
        }
    }
}
