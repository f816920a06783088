// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Booleans, integers and floats.
//!
//! Integers read from any numeric wire type and are range-checked into the
//! target width; floats accept the other float width.

use super::{unsupported_read, unsupported_write, ProtoCodec};
use crate::core::ser::varint::{varint_len, zigzag_encode64};
use crate::core::ser::{ProtoReader, ProtoWriter, SerializerFeatures, WireType};
use crate::error::{Error, Result};

macro_rules! impl_signed_codec {
    ($type:ty, $name:literal, $read_varint:expr) => {
        impl ProtoCodec for $type {
            const TYPE_NAME: &'static str = $name;

            fn features() -> SerializerFeatures {
                SerializerFeatures::scalar(WireType::Varint)
            }

            fn read(reader: &mut ProtoReader<'_>, wire: WireType, _existing: Option<Self>) -> Result<Self> {
                let wide: i64 = match wire {
                    WireType::Varint => ($read_varint)(reader)?,
                    WireType::SignedVarint => reader.read_zigzag_i64()?,
                    WireType::Fixed32 => i64::from(reader.read_fixed32()? as i32),
                    WireType::Fixed64 => reader.read_fixed64()? as i64,
                    _ => return Err(unsupported_read(reader, $name, wire)),
                };
                <$type>::try_from(wide).map_err(|_| Error::Overflow { target: $name })
            }

            fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()> {
                let wide = i64::from(*self);
                match wire {
                    WireType::Varint => writer.write_varint_i64(wide),
                    WireType::SignedVarint => writer.write_zigzag_i64(wide),
                    WireType::Fixed32 => {
                        let narrow = i32::try_from(wide).map_err(|_| Error::Overflow { target: "fixed32" })?;
                        writer.write_fixed32(narrow as u32);
                    }
                    WireType::Fixed64 => writer.write_fixed64(wide as u64),
                    _ => return Err(unsupported_write($name, wire)),
                }
                Ok(())
            }

            fn measure(&self, wire: WireType) -> Option<usize> {
                let wide = i64::from(*self);
                match wire {
                    WireType::Varint => Some(varint_len(wide as u64)),
                    WireType::SignedVarint => Some(varint_len(zigzag_encode64(wide))),
                    WireType::Fixed32 => i32::try_from(wide).ok().map(|_| 4),
                    WireType::Fixed64 => Some(8),
                    _ => None,
                }
            }

            fn is_default(&self) -> bool {
                *self == 0
            }
        }
    };
}

macro_rules! impl_unsigned_codec {
    ($type:ty, $name:literal) => {
        impl ProtoCodec for $type {
            const TYPE_NAME: &'static str = $name;

            fn features() -> SerializerFeatures {
                SerializerFeatures::scalar(WireType::Varint)
            }

            fn read(reader: &mut ProtoReader<'_>, wire: WireType, _existing: Option<Self>) -> Result<Self> {
                let wide: u64 = match wire {
                    WireType::Varint => reader.read_varint_u64()?,
                    WireType::SignedVarint => u64::try_from(reader.read_zigzag_i64()?)
                        .map_err(|_| Error::Overflow { target: $name })?,
                    WireType::Fixed32 => u64::from(reader.read_fixed32()?),
                    WireType::Fixed64 => reader.read_fixed64()?,
                    _ => return Err(unsupported_read(reader, $name, wire)),
                };
                <$type>::try_from(wide).map_err(|_| Error::Overflow { target: $name })
            }

            fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()> {
                let wide = u64::from(*self);
                match wire {
                    WireType::Varint => writer.write_varint(wide),
                    WireType::SignedVarint => {
                        let signed = i64::try_from(wide).map_err(|_| Error::Overflow { target: "sint64" })?;
                        writer.write_zigzag_i64(signed);
                    }
                    WireType::Fixed32 => {
                        let narrow = u32::try_from(wide).map_err(|_| Error::Overflow { target: "fixed32" })?;
                        writer.write_fixed32(narrow);
                    }
                    WireType::Fixed64 => writer.write_fixed64(wide),
                    _ => return Err(unsupported_write($name, wire)),
                }
                Ok(())
            }

            fn measure(&self, wire: WireType) -> Option<usize> {
                let wide = u64::from(*self);
                match wire {
                    WireType::Varint => Some(varint_len(wide)),
                    WireType::SignedVarint => i64::try_from(wide)
                        .ok()
                        .map(|signed| varint_len(zigzag_encode64(signed))),
                    WireType::Fixed32 => u32::try_from(wide).ok().map(|_| 4),
                    WireType::Fixed64 => Some(8),
                    _ => None,
                }
            }

            fn is_default(&self) -> bool {
                *self == 0
            }
        }
    };
}

fn read_varint_narrow(reader: &mut ProtoReader<'_>) -> Result<i64> {
    reader.read_varint_i32().map(i64::from)
}

fn read_varint_wide(reader: &mut ProtoReader<'_>) -> Result<i64> {
    reader.read_varint_i64()
}

impl_signed_codec!(i8, "i8", read_varint_narrow);
impl_signed_codec!(i16, "i16", read_varint_narrow);
impl_signed_codec!(i32, "i32", read_varint_narrow);
impl_signed_codec!(i64, "i64", read_varint_wide);

impl_unsigned_codec!(u8, "u8");
impl_unsigned_codec!(u16, "u16");
impl_unsigned_codec!(u32, "u32");
impl_unsigned_codec!(u64, "u64");

impl ProtoCodec for bool {
    const TYPE_NAME: &'static str = "bool";

    fn features() -> SerializerFeatures {
        SerializerFeatures::scalar(WireType::Varint)
    }

    fn read(reader: &mut ProtoReader<'_>, wire: WireType, _existing: Option<Self>) -> Result<Self> {
        match wire {
            WireType::Varint | WireType::SignedVarint => Ok(reader.read_varint_u64()? != 0),
            _ => Err(unsupported_read(reader, "bool", wire)),
        }
    }

    fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()> {
        match wire {
            WireType::Varint => {
                writer.write_varint(u64::from(*self));
                Ok(())
            }
            _ => Err(unsupported_write("bool", wire)),
        }
    }

    fn measure(&self, wire: WireType) -> Option<usize> {
        (wire == WireType::Varint).then_some(1)
    }

    fn is_default(&self) -> bool {
        !*self
    }
}

fn narrow_f64(value: f64) -> Result<f32> {
    if value.is_finite() && value.abs() > f64::from(f32::MAX) {
        return Err(Error::Overflow { target: "f32" });
    }
    Ok(value as f32)
}

impl ProtoCodec for f32 {
    const TYPE_NAME: &'static str = "f32";

    fn features() -> SerializerFeatures {
        SerializerFeatures::scalar(WireType::Fixed32)
    }

    fn read(reader: &mut ProtoReader<'_>, wire: WireType, _existing: Option<Self>) -> Result<Self> {
        match wire {
            WireType::Fixed32 => reader.read_f32(),
            WireType::Fixed64 => narrow_f64(reader.read_f64()?),
            _ => Err(unsupported_read(reader, "f32", wire)),
        }
    }

    fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()> {
        match wire {
            WireType::Fixed32 => writer.write_f32(*self),
            WireType::Fixed64 => writer.write_f64(f64::from(*self)),
            _ => return Err(unsupported_write("f32", wire)),
        }
        Ok(())
    }

    fn measure(&self, wire: WireType) -> Option<usize> {
        match wire {
            WireType::Fixed32 => Some(4),
            WireType::Fixed64 => Some(8),
            _ => None,
        }
    }

    fn is_default(&self) -> bool {
        *self == 0.0
    }
}

impl ProtoCodec for f64 {
    const TYPE_NAME: &'static str = "f64";

    fn features() -> SerializerFeatures {
        SerializerFeatures::scalar(WireType::Fixed64)
    }

    fn read(reader: &mut ProtoReader<'_>, wire: WireType, _existing: Option<Self>) -> Result<Self> {
        match wire {
            WireType::Fixed64 => reader.read_f64(),
            WireType::Fixed32 => Ok(f64::from(reader.read_f32()?)),
            _ => Err(unsupported_read(reader, "f64", wire)),
        }
    }

    fn write(&self, writer: &mut ProtoWriter, wire: WireType) -> Result<()> {
        match wire {
            WireType::Fixed64 => writer.write_f64(*self),
            WireType::Fixed32 => writer.write_f32(narrow_f64(*self)?),
            _ => return Err(unsupported_write("f64", wire)),
        }
        Ok(())
    }

    fn measure(&self, wire: WireType) -> Option<usize> {
        match wire {
            WireType::Fixed64 => Some(8),
            WireType::Fixed32 => Some(4),
            _ => None,
        }
    }

    fn is_default(&self) -> bool {
        *self == 0.0
    }
}
