// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single-field payloads of scalar, surrogate and enum values.
//!
//! The effective encoding of a payload depends on the member's
//! [`DataFormat`] and on the model's compatibility level; both are folded
//! into one [`Payload`] before any bytes are touched.

use crate::bcl::{
    read_decimal_text, read_guid_text, write_date_time_body, write_decimal_text, write_guid_text,
    DateTime, Duration, Guid, TimeSpan, Timestamp,
};
use crate::config::{CompatibilityLevel, ModelOptions};
use crate::core::ser::{ProtoReader, ProtoWriter, WireType};
use crate::dynamic::{DataFormat, EnumDescriptor, ScalarKind, SurrogateKind, Value};
use crate::error::{Error, Result};
use crate::scalar::ProtoCodec;
use rust_decimal::Decimal;

/// Value kinds encoded as the payload of one field.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PayloadKind<'a> {
    Scalar(ScalarKind),
    Surrogate(SurrogateKind),
    Enum(&'a EnumDescriptor),
}

/// Length-delimited layouts a surrogate can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurrogateForm {
    Bcl,
    Text,
    WellKnown,
}

/// A payload kind with its encoding resolved for one member.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Payload<'a> {
    kind: PayloadKind<'a>,
    wire: WireType,
    form: SurrogateForm,
    options: &'a ModelOptions,
}

impl<'a> Payload<'a> {
    pub(crate) fn new(kind: PayloadKind<'a>, format: DataFormat, options: &'a ModelOptions) -> Self {
        let wire = match kind {
            PayloadKind::Scalar(k) => match format {
                DataFormat::ZigZag if k.is_signed_integer() => WireType::SignedVarint,
                DataFormat::FixedSize if matches!(k, ScalarKind::I64 | ScalarKind::U64) => WireType::Fixed64,
                DataFormat::FixedSize if k.is_integer() => WireType::Fixed32,
                _ => k.default_wire(),
            },
            PayloadKind::Surrogate(SurrogateKind::DateTime | SurrogateKind::TimeSpan)
                if format == DataFormat::FixedSize =>
            {
                WireType::Fixed64
            }
            PayloadKind::Surrogate(_) => WireType::String,
            PayloadKind::Enum(_) => WireType::Varint,
        };
        let level = options.compatibility_level;
        let form = match (kind, format) {
            (PayloadKind::Surrogate(SurrogateKind::Guid | SurrogateKind::Decimal), DataFormat::Text) => {
                SurrogateForm::Text
            }
            (PayloadKind::Surrogate(SurrogateKind::DateTime | SurrogateKind::TimeSpan), DataFormat::WellKnown) => {
                SurrogateForm::WellKnown
            }
            (PayloadKind::Surrogate(SurrogateKind::Guid | SurrogateKind::Decimal), DataFormat::Default)
                if level >= CompatibilityLevel::Level300 =>
            {
                SurrogateForm::Text
            }
            (PayloadKind::Surrogate(SurrogateKind::DateTime | SurrogateKind::TimeSpan), DataFormat::Default)
                if level >= CompatibilityLevel::Level240 =>
            {
                SurrogateForm::WellKnown
            }
            _ => SurrogateForm::Bcl,
        };
        Self {
            kind,
            wire,
            form,
            options,
        }
    }

    /// Wire type written in the field header.
    pub(crate) fn wire(&self) -> WireType {
        self.wire
    }

    pub(crate) fn default_value(&self) -> Value {
        default_value(self.kind)
    }

    /// True when `value` is the kind's default. A value of the wrong shape
    /// is never a default, so the mismatch surfaces on write.
    pub(crate) fn is_default(&self, value: &Value) -> bool {
        matches(self.kind, value) && *value == default_value(self.kind)
    }

    pub(crate) fn write(&self, writer: &mut ProtoWriter, value: &Value) -> Result<()> {
        let wire = self.wire;
        match (self.kind, value) {
            (PayloadKind::Scalar(ScalarKind::Bool), Value::Bool(v)) => v.write(writer, wire),
            (PayloadKind::Scalar(ScalarKind::I8), Value::I8(v)) => v.write(writer, wire),
            (PayloadKind::Scalar(ScalarKind::I16), Value::I16(v)) => v.write(writer, wire),
            (PayloadKind::Scalar(ScalarKind::I32), Value::I32(v)) => v.write(writer, wire),
            (PayloadKind::Scalar(ScalarKind::I64), Value::I64(v)) => v.write(writer, wire),
            (PayloadKind::Scalar(ScalarKind::U8), Value::U8(v)) => v.write(writer, wire),
            (PayloadKind::Scalar(ScalarKind::U16), Value::U16(v)) => v.write(writer, wire),
            (PayloadKind::Scalar(ScalarKind::U32), Value::U32(v)) => v.write(writer, wire),
            (PayloadKind::Scalar(ScalarKind::U64), Value::U64(v)) => v.write(writer, wire),
            (PayloadKind::Scalar(ScalarKind::F32), Value::F32(v)) => v.write(writer, wire),
            (PayloadKind::Scalar(ScalarKind::F64), Value::F64(v)) => v.write(writer, wire),
            (PayloadKind::Scalar(ScalarKind::String), Value::String(v)) => v.write(writer, wire),
            (PayloadKind::Scalar(ScalarKind::Bytes), Value::Bytes(v)) => v.write(writer, wire),
            (PayloadKind::Surrogate(SurrogateKind::Guid), Value::Guid(v)) => match self.form {
                SurrogateForm::Text => {
                    write_guid_text(writer, v, self.options.guid_format);
                    Ok(())
                }
                _ => v.write(writer, wire),
            },
            (PayloadKind::Surrogate(SurrogateKind::Decimal), Value::Decimal(v)) => match self.form {
                SurrogateForm::Text => {
                    write_decimal_text(writer, v);
                    Ok(())
                }
                _ => v.write(writer, wire),
            },
            (PayloadKind::Surrogate(SurrogateKind::DateTime), Value::DateTime(v)) => {
                match (wire, self.form) {
                    (WireType::Fixed64, _) => v.write(writer, wire),
                    (_, SurrogateForm::WellKnown) => Timestamp::from_date_time(*v).write(writer, wire),
                    _ => writer.write_sub_item(|w| {
                        write_date_time_body(w, *v, self.options.include_date_time_kind)
                    }),
                }
            }
            (PayloadKind::Surrogate(SurrogateKind::TimeSpan), Value::TimeSpan(v)) => {
                match (wire, self.form) {
                    (WireType::Fixed64, _) => v.write(writer, wire),
                    (_, SurrogateForm::WellKnown) => Duration::from_time_span(*v).write(writer, wire),
                    _ => v.write(writer, wire),
                }
            }
            (PayloadKind::Enum(desc), Value::Enum(raw)) => {
                writer.write_varint(desc.repr.to_wire(*raw));
                Ok(())
            }
            (kind, value) => Err(mismatch(kind_name(kind), value)),
        }
    }

    /// Read one payload; `wire` is the header's wire type.
    pub(crate) fn read(&self, reader: &mut ProtoReader<'_>, wire: WireType) -> Result<Value> {
        let wire = wire.hint(self.wire);
        let value = match self.kind {
            PayloadKind::Scalar(kind) => match kind {
                ScalarKind::Bool => Value::Bool(bool::read(reader, wire, None)?),
                ScalarKind::I8 => Value::I8(i8::read(reader, wire, None)?),
                ScalarKind::I16 => Value::I16(i16::read(reader, wire, None)?),
                ScalarKind::I32 => Value::I32(i32::read(reader, wire, None)?),
                ScalarKind::I64 => Value::I64(i64::read(reader, wire, None)?),
                ScalarKind::U8 => Value::U8(u8::read(reader, wire, None)?),
                ScalarKind::U16 => Value::U16(u16::read(reader, wire, None)?),
                ScalarKind::U32 => Value::U32(u32::read(reader, wire, None)?),
                ScalarKind::U64 => Value::U64(u64::read(reader, wire, None)?),
                ScalarKind::F32 => Value::F32(f32::read(reader, wire, None)?),
                ScalarKind::F64 => Value::F64(f64::read(reader, wire, None)?),
                ScalarKind::String => Value::String(String::read(reader, wire, None)?),
                ScalarKind::Bytes => Value::Bytes(Vec::<u8>::read(reader, wire, None)?),
            },
            PayloadKind::Surrogate(SurrogateKind::Guid) => Value::Guid(match (wire, self.form) {
                (WireType::String, SurrogateForm::Text) => read_guid_text(reader)?,
                _ => Guid::read(reader, wire, None)?,
            }),
            PayloadKind::Surrogate(SurrogateKind::Decimal) => Value::Decimal(match (wire, self.form) {
                (WireType::String, SurrogateForm::Text) => read_decimal_text(reader)?,
                _ => Decimal::read(reader, wire, None)?,
            }),
            PayloadKind::Surrogate(SurrogateKind::DateTime) => Value::DateTime(match (wire, self.form) {
                (WireType::String, SurrogateForm::WellKnown) => {
                    Timestamp::read(reader, wire, None)?.to_date_time()?
                }
                _ => DateTime::read(reader, wire, None)?,
            }),
            PayloadKind::Surrogate(SurrogateKind::TimeSpan) => Value::TimeSpan(match (wire, self.form) {
                (WireType::String, SurrogateForm::WellKnown) => {
                    Duration::read(reader, wire, None)?.to_time_span()?
                }
                _ => TimeSpan::read(reader, wire, None)?,
            }),
            PayloadKind::Enum(desc) => {
                let at = reader.offset();
                let raw = match wire {
                    WireType::Varint | WireType::SignedVarint => reader.read_varint_u64()?,
                    WireType::Fixed32 => u64::from(reader.read_fixed32()?),
                    WireType::Fixed64 => reader.read_fixed64()?,
                    _ => {
                        return Err(Error::format(
                            at,
                            format!("cannot read enum from wire type {wire}"),
                        ))
                    }
                };
                Value::Enum(desc.repr.from_wire(raw)?)
            }
        };
        Ok(value)
    }

    /// Shape check used by deep clone.
    pub(crate) fn check(&self, value: &Value) -> Result<()> {
        if matches(self.kind, value) {
            Ok(())
        } else {
            Err(mismatch(kind_name(self.kind), value))
        }
    }
}

fn default_value(kind: PayloadKind<'_>) -> Value {
    match kind {
        PayloadKind::Scalar(k) => k.default_value(),
        PayloadKind::Surrogate(k) => k.default_value(),
        PayloadKind::Enum(_) => Value::Enum(0),
    }
}

fn matches(kind: PayloadKind<'_>, value: &Value) -> bool {
    matches!(
        (kind, value),
        (PayloadKind::Scalar(ScalarKind::Bool), Value::Bool(_))
            | (PayloadKind::Scalar(ScalarKind::I8), Value::I8(_))
            | (PayloadKind::Scalar(ScalarKind::I16), Value::I16(_))
            | (PayloadKind::Scalar(ScalarKind::I32), Value::I32(_))
            | (PayloadKind::Scalar(ScalarKind::I64), Value::I64(_))
            | (PayloadKind::Scalar(ScalarKind::U8), Value::U8(_))
            | (PayloadKind::Scalar(ScalarKind::U16), Value::U16(_))
            | (PayloadKind::Scalar(ScalarKind::U32), Value::U32(_))
            | (PayloadKind::Scalar(ScalarKind::U64), Value::U64(_))
            | (PayloadKind::Scalar(ScalarKind::F32), Value::F32(_))
            | (PayloadKind::Scalar(ScalarKind::F64), Value::F64(_))
            | (PayloadKind::Scalar(ScalarKind::String), Value::String(_))
            | (PayloadKind::Scalar(ScalarKind::Bytes), Value::Bytes(_))
            | (PayloadKind::Surrogate(SurrogateKind::Guid), Value::Guid(_))
            | (PayloadKind::Surrogate(SurrogateKind::Decimal), Value::Decimal(_))
            | (PayloadKind::Surrogate(SurrogateKind::DateTime), Value::DateTime(_))
            | (PayloadKind::Surrogate(SurrogateKind::TimeSpan), Value::TimeSpan(_))
            | (PayloadKind::Enum(_), Value::Enum(_))
    )
}

fn kind_name(kind: PayloadKind<'_>) -> &'static str {
    match kind {
        PayloadKind::Scalar(k) => k.type_name(),
        PayloadKind::Surrogate(k) => k.type_name(),
        PayloadKind::Enum(_) => "enum",
    }
}

pub(crate) fn mismatch(expected: &str, value: &Value) -> Error {
    Error::mismatch(expected, value.kind_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcl::{DateTimeKind, EnumRepr};
    use crate::dynamic::EnumVariant;

    fn roundtrip(payload: &Payload<'_>, value: &Value) -> (Vec<u8>, Value) {
        let mut writer = ProtoWriter::new();
        payload.write(&mut writer, value).unwrap();
        let bytes = writer.into_vec();
        let back = payload.read(&mut ProtoReader::new(&bytes), payload.wire()).unwrap();
        (bytes, back)
    }

    #[test]
    fn test_zigzag_and_fixed_formats() {
        let options = ModelOptions::default();
        let zigzag = Payload::new(PayloadKind::Scalar(ScalarKind::I32), DataFormat::ZigZag, &options);
        assert_eq!(zigzag.wire(), WireType::SignedVarint);
        let (bytes, back) = roundtrip(&zigzag, &Value::I32(-1));
        assert_eq!(bytes, [0x01]);
        assert_eq!(back, Value::I32(-1));

        let fixed = Payload::new(PayloadKind::Scalar(ScalarKind::U64), DataFormat::FixedSize, &options);
        assert_eq!(fixed.wire(), WireType::Fixed64);
        let fixed = Payload::new(PayloadKind::Scalar(ScalarKind::I16), DataFormat::FixedSize, &options);
        assert_eq!(fixed.wire(), WireType::Fixed32);

        // zigzag has no meaning for unsigned kinds
        let plain = Payload::new(PayloadKind::Scalar(ScalarKind::U32), DataFormat::ZigZag, &options);
        assert_eq!(plain.wire(), WireType::Varint);
    }

    #[test]
    fn test_level_300_writes_guid_as_text() {
        let options = ModelOptions::builder()
            .compatibility_level(CompatibilityLevel::Level300)
            .build();
        let guid = Guid::parse("12345678-2345-3456-4567-56789a6789ab").unwrap();
        let payload = Payload::new(PayloadKind::Surrogate(SurrogateKind::Guid), DataFormat::Default, &options);
        let (bytes, back) = roundtrip(&payload, &Value::Guid(guid));
        assert_eq!(bytes[0], 36);
        assert_eq!(&bytes[1..], b"12345678-2345-3456-4567-56789a6789ab");
        assert_eq!(back, Value::Guid(guid));
    }

    #[test]
    fn test_level_240_uses_timestamp() {
        let options = ModelOptions::builder()
            .compatibility_level(CompatibilityLevel::Level240)
            .build();
        let payload = Payload::new(PayloadKind::Surrogate(SurrogateKind::DateTime), DataFormat::Default, &options);
        let instant = DateTime::from_unix_ticks(10_000_000, DateTimeKind::Utc).unwrap();
        let (bytes, back) = roundtrip(&payload, &Value::DateTime(instant));
        assert_eq!(bytes, [0x02, 0x08, 0x01]);
        assert_eq!(back, Value::DateTime(instant));
    }

    #[test]
    fn test_date_time_kind_follows_options() {
        let options = ModelOptions::builder().include_date_time_kind(true).build();
        let payload = Payload::new(PayloadKind::Surrogate(SurrogateKind::DateTime), DataFormat::Default, &options);
        let instant = DateTime::from_unix_ticks(0, DateTimeKind::Utc).unwrap();
        let (bytes, back) = roundtrip(&payload, &Value::DateTime(instant));
        // zero days since the epoch: only the kind field remains
        assert_eq!(bytes, [0x02, 0x18, 0x01]);
        assert_eq!(back, Value::DateTime(instant));
    }

    #[test]
    fn test_enum_payload_sign_extends() {
        let options = ModelOptions::default();
        let desc = EnumDescriptor::new(vec![EnumVariant::new("Gone", -1)]).with_repr(EnumRepr::I8);
        let payload = Payload::new(PayloadKind::Enum(&desc), DataFormat::Default, &options);
        let raw = desc.raw_of(-1);
        let (bytes, back) = roundtrip(&payload, &Value::Enum(raw));
        assert_eq!(bytes.len(), 10);
        assert_eq!(back, Value::Enum(raw));
        assert!(payload.is_default(&Value::Enum(0)));
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let options = ModelOptions::default();
        let payload = Payload::new(PayloadKind::Scalar(ScalarKind::I32), DataFormat::Default, &options);
        let mut writer = ProtoWriter::new();
        let err = payload.write(&mut writer, &Value::from("x")).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref found, .. } if found == "string"));
        assert!(!payload.is_default(&Value::I64(0)));
        assert!(payload.is_default(&Value::I32(0)));
    }
}
