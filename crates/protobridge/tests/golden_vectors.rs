// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unreadable_literal)] // Wire vectors
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Literal wire vectors.
//!
//! Every vector is checked three ways: the encoder produces exactly these
//! bytes, the decoder reads them back to the same value, and re-encoding the
//! decoded value is byte-identical.

use protobridge::bcl::{DateTime, DateTimeKind, Guid, GuidHalves, TimeSpan};
use protobridge::dynamic::{EnumBuilder, MessageBuilder, MessageValue, Value};
use protobridge::{CompatibilityLevel, GuidFormat, ModelOptions, TypeModel};
use rust_decimal::Decimal;
use std::str::FromStr;

fn unhex(text: &str) -> Vec<u8> {
    let digits: String = text.split_whitespace().collect();
    hex::decode(digits).unwrap()
}

/// Encode, compare against `expected_hex`, decode, re-encode.
fn golden(model: &TypeModel, type_name: &str, value: &Value, expected_hex: &str) {
    let expected = unhex(expected_hex);
    let encoded = model.serialize(type_name, value).unwrap();
    assert_eq!(
        hex::encode(&encoded),
        hex::encode(&expected),
        "{type_name}: encoded bytes differ"
    );
    assert_eq!(model.measure(type_name, value).unwrap(), expected.len());

    let decoded = model.deserialize(type_name, &encoded).unwrap();
    assert_eq!(&decoded, value, "{type_name}: roundtrip value mismatch");

    let re_encoded = model.serialize(type_name, &decoded).unwrap();
    assert_eq!(re_encoded, encoded, "{type_name}: re-encoded bytes differ");
}

// ============================================================================
// Guid
// ============================================================================

#[test]
fn golden_guid_halves() {
    let guid = Guid::parse("12345678-2345-3456-4567-56789a6789ab").unwrap();
    assert_eq!(
        guid.halves(),
        GuidHalves {
            low: 0x3456234512345678,
            high: 0xAB89679A78566745,
        }
    );
    // halves are the platform 16-byte layout split into little-endian words
    let bytes = guid.to_bytes_le();
    assert_eq!(u64::from_le_bytes(bytes[..8].try_into().unwrap()), 0x3456234512345678);
    assert_eq!(u64::from_le_bytes(bytes[8..].try_into().unwrap()), 0xAB89679A78566745);
}

#[test]
fn golden_guid_bcl_root() {
    let model = TypeModel::new();
    let guid = Guid::parse("12345678-2345-3456-4567-56789a6789ab").unwrap();
    golden(
        &model,
        "System.Guid",
        &Value::Guid(guid),
        "0a 12 09 78 56 34 12 45 23 56 34 11 45 67 56 78 9a 67 89 ab",
    );
}

#[test]
fn golden_guid_text_root() {
    let options = ModelOptions::builder()
        .compatibility_level(CompatibilityLevel::Level300)
        .guid_format(GuidFormat::N)
        .build();
    let model = TypeModel::with_options(options);
    let guid = Guid::parse("12345678-2345-3456-4567-56789a6789ab").unwrap();
    let mut expected = String::from("0a 20 ");
    expected.push_str(&hex::encode("123456782345345645675678".to_owned() + "9a6789ab"));
    golden(&model, "System.Guid", &Value::Guid(guid), &expected);
}

#[test]
fn golden_empty_guid_writes_nothing() {
    let model = TypeModel::new();
    golden(&model, "System.Guid", &Value::Guid(Guid::EMPTY), "");
}

// ============================================================================
// Decimal
// ============================================================================

#[test]
fn golden_decimal_sign_and_scale() {
    let model = TypeModel::new();
    // mantissa 15 at field 1, (scale 1 << 1) at field 3
    golden(
        &model,
        "System.Decimal",
        &Value::Decimal(Decimal::from_str("1.5").unwrap()),
        "0a 04 08 0f 18 02",
    );
    // sign bit joins the scale field
    golden(
        &model,
        "System.Decimal",
        &Value::Decimal(Decimal::from_str("-1.5").unwrap()),
        "0a 04 08 0f 18 03",
    );
}

#[test]
fn golden_decimal_high_word() {
    let model = TypeModel::new();
    // 2^64: low word zero (omitted), hi = 1
    golden(
        &model,
        "System.Decimal",
        &Value::Decimal(Decimal::from_str("18446744073709551616").unwrap()),
        "0a 02 10 01",
    );
}

#[test]
fn golden_decimal_max_scale_one() {
    let model = TypeModel::new();
    let one = Decimal::from_str("1.0000000000000000000000000000").unwrap();
    assert_eq!(one.scale(), 28);
    let bytes = model.serialize("System.Decimal", &Value::Decimal(one)).unwrap();
    // trailing field 3: (28 << 1) = 56
    assert_eq!(&bytes[bytes.len() - 2..], &[0x18, 0x38]);
    let back = model.deserialize("System.Decimal", &bytes).unwrap();
    match back {
        Value::Decimal(d) => {
            assert_eq!(d, one);
            assert_eq!(d.scale(), 28);
        }
        other => panic!("expected decimal, got {other:?}"),
    }
}

// ============================================================================
// DateTime / TimeSpan
// ============================================================================

#[test]
fn golden_time_span_scales() {
    let model = TypeModel::new();
    // 1 day: value 1, scale Days omitted
    golden(
        &model,
        "System.TimeSpan",
        &Value::TimeSpan(TimeSpan::from_seconds(86_400).unwrap()),
        "0a 02 08 02",
    );
    // 90 minutes: value 90 zigzag = 180, scale Minutes = 2
    golden(
        &model,
        "System.TimeSpan",
        &Value::TimeSpan(TimeSpan::from_seconds(5_400).unwrap()),
        "0a 05 08 b4 01 10 02",
    );
    // -1 tick: zigzag 1, scale Ticks = 5
    golden(
        &model,
        "System.TimeSpan",
        &Value::TimeSpan(TimeSpan::from_ticks(-1)),
        "0a 04 08 01 10 05",
    );
}

#[test]
fn golden_time_span_min_max() {
    let model = TypeModel::new();
    golden(&model, "System.TimeSpan", &Value::TimeSpan(TimeSpan::MAX), "0a 04 08 02 10 0f");
    golden(&model, "System.TimeSpan", &Value::TimeSpan(TimeSpan::MIN), "0a 04 08 01 10 0f");
}

#[test]
fn golden_date_time_epoch_and_max() {
    let model = TypeModel::new();
    // zero days from the epoch: empty body
    let epoch = DateTime::unix_epoch(DateTimeKind::Unspecified);
    golden(&model, "System.DateTime", &Value::DateTime(epoch), "0a 00");
    golden(
        &model,
        "System.DateTime",
        &Value::DateTime(DateTime::MAX),
        "0a 04 08 02 10 0f",
    );
}

#[test]
fn golden_date_time_kind_field() {
    let options = ModelOptions::builder().include_date_time_kind(true).build();
    let model = TypeModel::with_options(options);
    let day = DateTime::from_unix_ticks(864_000_000_000, DateTimeKind::Utc).unwrap();
    golden(&model, "System.DateTime", &Value::DateTime(day), "0a 04 08 02 18 01");
}

#[test]
fn golden_date_time_min_max_drop_kind() {
    let options = ModelOptions::builder().include_date_time_kind(true).build();
    let model = TypeModel::with_options(options);
    for (value, body) in [
        (DateTime::MIN, "0a 04 08 01 10 0f"),
        (DateTime::MAX, "0a 04 08 02 10 0f"),
    ] {
        let tagged = Value::DateTime(value.with_kind(DateTimeKind::Utc));
        let bytes = model.serialize("System.DateTime", &tagged).unwrap();
        assert_eq!(hex::encode(&bytes), hex::encode(unhex(body)));
        assert_eq!(model.measure("System.DateTime", &tagged).unwrap(), bytes.len());
        // the sentinel comes back unspecified
        golden(&model, "System.DateTime", &Value::DateTime(value), body);
    }
}

// ============================================================================
// Enums and messages
// ============================================================================

#[test]
fn golden_enum_sign_extension() {
    let model = TypeModel::new();
    model.register(
        EnumBuilder::new("Shop.Priority")
            .variant_value("Low", -1)
            .variant_value("Normal", 0)
            .variant_value("High", 1)
            .build(),
    );
    model.register(MessageBuilder::new("Shop.Task").field(1, "priority", "Shop.Priority").build());

    let low = MessageValue::new("Shop.Task").with("priority", Value::Enum(u64::MAX));
    golden(
        &model,
        "Shop.Task",
        &Value::Message(low),
        "08 ff ff ff ff ff ff ff ff ff 01",
    );
    let normal = MessageValue::new("Shop.Task").with("priority", Value::Enum(0));
    golden(&model, "Shop.Task", &Value::Message(normal), "");
}

#[test]
fn golden_nested_message() {
    let model = TypeModel::new();
    model.register(
        MessageBuilder::new("Geo.Point")
            .field(1, "x", "System.Int32")
            .field(2, "y", "System.Int32")
            .build(),
    );
    model.register(
        MessageBuilder::new("Geo.Segment")
            .field(1, "from", "Geo.Point")
            .field(2, "to", "Geo.Point")
            .field(3, "label", "System.String")
            .build(),
    );
    let segment = MessageValue::new("Geo.Segment")
        .with("from", MessageValue::new("Geo.Point").with("x", 1i32).with("y", 0i32))
        .with("to", MessageValue::new("Geo.Point").with("x", 150i32).with("y", 2i32))
        .with("label", "ab");
    golden(
        &model,
        "Geo.Segment",
        &Value::Message(segment),
        "0a 02 08 01 12 05 08 96 01 10 02 1a 02 61 62",
    );
}
