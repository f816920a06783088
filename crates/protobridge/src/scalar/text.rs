// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-delimited scalars: UTF-8 strings and raw bytes.

use super::{unsupported_read, unsupported_write, ProtoCodec};
use crate::core::ser::varint::varint_len;
use crate::core::ser::{ProtoReader, ProtoWriter, SerializerFeatures, WireType};
use crate::error::Result;

fn delimited_len(len: usize) -> usize {
    varint_len(len as u64) + len
}

impl ProtoCodec for String {
    const TYPE_NAME: &'static str = "string";

    fn features() -> SerializerFeatures {
        SerializerFeatures::scalar(WireType::String)
    }

    fn read(reader: &mut ProtoReader<'_>, wire: WireType, _existing: Option<Self>) -> Result<Self> {
        match wire {
            WireType::String => Ok(reader.read_str()?.to_owned()),
            _ => Err(unsupported_read(reader, "string", wire)),
        }
    }

    fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()> {
        match wire {
            WireType::String => {
                writer.write_str(self);
                Ok(())
            }
            _ => Err(unsupported_write("string", wire)),
        }
    }

    fn measure(&self, wire: WireType) -> Option<usize> {
        (wire == WireType::String).then(|| delimited_len(self.len()))
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

impl ProtoCodec for Vec<u8> {
    const TYPE_NAME: &'static str = "bytes";

    fn features() -> SerializerFeatures {
        SerializerFeatures::scalar(WireType::String)
    }

    fn read(reader: &mut ProtoReader<'_>, wire: WireType, _existing: Option<Self>) -> Result<Self> {
        match wire {
            WireType::String => Ok(reader.read_bytes()?.to_vec()),
            _ => Err(unsupported_read(reader, "bytes", wire)),
        }
    }

    fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()> {
        match wire {
            WireType::String => {
                writer.write_bytes(self);
                Ok(())
            }
            _ => Err(unsupported_write("bytes", wire)),
        }
    }

    fn measure(&self, wire: WireType) -> Option<usize> {
        (wire == WireType::String).then(|| delimited_len(self.len()))
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }
}
