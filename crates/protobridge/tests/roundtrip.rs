// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unreadable_literal)] // Boundary constants
#![allow(clippy::float_cmp)] // Exact float round trips
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::too_many_lines)] // Scenario tests

//! Round trips through the type model: scalars, surrogates, collections,
//! inheritance and merge semantics.

use protobridge::bcl::{read_enum, write_enum, DateTime, DateTimeKind, EnumRepr, Guid, ProtoEnum, TimeSpan};
use protobridge::core::ser::{FeatureOptions, ProtoReader, ProtoWriter, WireType};
use protobridge::dynamic::{
    DataFormat, EnumBuilder, FieldDescriptor, MessageBuilder, MessageValue, ScalarKind, TypeDescriptor,
    TypeKind, Value,
};
use protobridge::scalar::{read_field, write_field};
use protobridge::{CompatibilityLevel, Error, ModelOptions, TypeModel};
use rust_decimal::Decimal;
use std::str::FromStr;

fn roundtrip(model: &TypeModel, type_name: &str, value: &Value) -> Vec<u8> {
    let bytes = model.serialize(type_name, value).unwrap();
    let back = model.deserialize(type_name, &bytes).unwrap();
    assert_eq!(&back, value, "{type_name} did not round trip");
    bytes
}

fn shop_model() -> TypeModel {
    let model = TypeModel::new();
    model.register(
        EnumBuilder::new("Shop.Priority")
            .variant("Normal")
            .variant("Rush")
            .build(),
    );
    model.register(
        MessageBuilder::new("Shop.Order")
            .field(1, "id", "System.Guid")
            .field(2, "amount", "System.Decimal")
            .field(3, "priority", "Shop.Priority")
            .optional_field(4, "discount", "System.Int32")
            .repeated_field(5, "tags", "System.String")
            .build(),
    );
    model
}

// ============================================================================
// Scalars and surrogates
// ============================================================================

#[test]
fn test_scalar_boundaries() {
    let model = TypeModel::new();
    let cases: Vec<(&str, Value)> = vec![
        ("System.Int32", Value::I32(0)),
        ("System.Int32", Value::I32(-1)),
        ("System.Int32", Value::I32(i32::MIN)),
        ("System.Int32", Value::I32(i32::MAX)),
        ("System.Int64", Value::I64(i64::MIN)),
        ("System.Int64", Value::I64(i64::MAX)),
        ("System.UInt64", Value::U64(u64::MAX)),
        ("System.SByte", Value::I8(i8::MIN)),
        ("System.Byte", Value::U8(u8::MAX)),
        ("System.Int16", Value::I16(-300)),
        ("System.UInt16", Value::U16(u16::MAX)),
        ("System.Boolean", Value::Bool(true)),
        ("System.Single", Value::F32(-0.5)),
        ("System.Double", Value::F64(f64::MAX)),
        ("System.String", Value::String("héllo".into())),
        ("System.Byte[]", Value::Bytes(vec![0, 1, 255])),
    ];
    for (type_name, value) in &cases {
        roundtrip(&model, type_name, value);
    }
}

#[test]
fn test_negative_plain_varint_is_ten_bytes() {
    let model = TypeModel::new();
    let bytes = roundtrip(&model, "System.Int32", &Value::I32(-1));
    assert_eq!(bytes.len(), 1 + 10);
    let bytes = roundtrip(&model, "int", &Value::I32(-2));
    assert_eq!(bytes[0], 0x08);
    assert_eq!(bytes.len(), 11);
}

#[test]
fn test_surrogate_boundaries() {
    let model = TypeModel::new();
    let cases = [
        Value::DateTime(DateTime::MIN),
        Value::DateTime(DateTime::MAX),
        Value::DateTime(DateTime::unix_epoch(DateTimeKind::Unspecified)),
        Value::TimeSpan(TimeSpan::MIN),
        Value::TimeSpan(TimeSpan::MAX),
        Value::TimeSpan(TimeSpan::ZERO),
        Value::TimeSpan(TimeSpan::from_ticks(-12_345)),
    ];
    for value in &cases {
        let name = match value {
            Value::DateTime(_) => "System.DateTime",
            _ => "System.TimeSpan",
        };
        roundtrip(&model, name, value);
    }
    roundtrip(&model, "System.Guid", &Value::Guid(Guid::EMPTY));
    roundtrip(&model, "System.Guid", &Value::Guid(Guid::parse("6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap()));
    roundtrip(&model, "System.Decimal", &Value::Decimal(Decimal::ZERO));
    roundtrip(&model, "decimal", &Value::Decimal(Decimal::from_str("1.0000000000000000000000000000").unwrap()));
    roundtrip(&model, "System.Decimal", &Value::Decimal(Decimal::MAX));
    roundtrip(&model, "System.Decimal", &Value::Decimal(Decimal::MIN));
}

#[test]
fn test_static_codec_boundaries() {
    for value in [0i64, -1, i64::MIN, i64::MAX] {
        for wire in [WireType::Varint, WireType::SignedVarint, WireType::Fixed64] {
            let mut writer = ProtoWriter::new();
            write_field(&mut writer, 7, &value, wire, true).unwrap();
            let bytes = writer.into_vec();
            let mut reader = ProtoReader::new(&bytes);
            let header = reader.read_field_header().unwrap().unwrap();
            assert_eq!(header.field, 7);
            let back: i64 = read_field(&mut reader, header.wire, wire, None).unwrap();
            assert_eq!(back, value, "{value} via {wire}");
        }
    }
}

#[test]
fn test_well_known_time_forms() {
    let options = ModelOptions::builder()
        .compatibility_level(CompatibilityLevel::Level240)
        .build();
    let model = TypeModel::with_options(options);

    // 1.5 s after the epoch: seconds 1, nanos 500_000_000
    let instant = DateTime::from_unix_ticks(15_000_000, DateTimeKind::Utc).unwrap();
    let bytes = roundtrip(&model, "System.DateTime", &Value::DateTime(instant));
    assert_eq!(bytes, [0x0A, 0x08, 0x08, 0x01, 0x10, 0x80, 0xCA, 0xB5, 0xEE, 0x01]);

    let span = TimeSpan::from_millis(-1_500).unwrap();
    roundtrip(&model, "System.TimeSpan", &Value::TimeSpan(span));
}

#[test]
fn test_fixed_size_time_member() {
    let model = TypeModel::new();
    model.register(
        MessageBuilder::new("Log.Entry")
            .field_as(1, "at", "System.DateTime", DataFormat::FixedSize)
            .build(),
    );
    let at = DateTime::from_unix_ticks(1, DateTimeKind::Unspecified).unwrap();
    let entry = Value::Message(MessageValue::new("Log.Entry").with("at", at));
    let bytes = roundtrip(&model, "Log.Entry", &entry);
    assert_eq!(bytes[0], 0x09);
    assert_eq!(&bytes[1..], &1u64.to_le_bytes());
}

// ============================================================================
// Default elision
// ============================================================================

#[test]
fn test_default_members_write_nothing() {
    let model = shop_model();
    let order = MessageValue::new("Shop.Order")
        .with("id", Guid::EMPTY)
        .with("amount", Decimal::ZERO)
        .with("priority", Value::Enum(0))
        .with("tags", Value::List(Vec::new()));
    let bytes = model.serialize("Shop.Order", &Value::Message(order.clone())).unwrap();
    assert!(bytes.is_empty());

    // zero bytes decode to defaults, never null
    let back = model.deserialize("Shop.Order", &[]).unwrap();
    assert_eq!(back, Value::Message(order));
    assert_eq!(back.get_field("discount"), None);
}

#[test]
fn test_optional_member_keeps_presence() {
    let model = shop_model();
    let with_zero = MessageValue::new("Shop.Order").with("discount", 0i32);
    let bytes = model.serialize("Shop.Order", &Value::Message(with_zero)).unwrap();
    assert_eq!(bytes, [0x20, 0x00]);
    let back = model.deserialize("Shop.Order", &bytes).unwrap();
    assert_eq!(back.get_field("discount"), Some(&Value::I32(0)));

    let without = MessageValue::new("Shop.Order").with("discount", Value::Null);
    assert!(model.serialize("Shop.Order", &Value::Message(without)).unwrap().is_empty());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Off,
    On,
}

impl ProtoEnum for Mode {
    const REPR: EnumRepr = EnumRepr::U8;
    const TYPE_NAME: &'static str = "Mode";

    fn to_raw(self) -> u64 {
        self as u64
    }

    fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(Self::Off),
            1 => Some(Self::On),
            _ => None,
        }
    }
}

#[test]
fn test_static_enum_zero_is_elided() {
    let mut writer = ProtoWriter::new();
    write_enum(&mut writer, 1, Mode::Off, false).unwrap();
    assert!(writer.is_empty());
    write_enum(&mut writer, 1, Mode::On, false).unwrap();
    let bytes = writer.into_vec();
    assert_eq!(bytes, [0x08, 0x01]);

    let mut reader = ProtoReader::new(&[0x02]);
    assert!(matches!(read_enum::<Mode>(&mut reader, WireType::Varint), Err(Error::Format { .. })));
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn test_map_keeps_default_entry() {
    let model = TypeModel::new();
    model.register(TypeDescriptor::map("Shop.Labels", "System.Int32", "System.String"));
    let labels = Value::Map(vec![
        (Value::I32(1), "abc".into()),
        (Value::I32(0), "".into()),
        (Value::I32(2), "def".into()),
    ]);
    let bytes = roundtrip(&model, "Shop.Labels", &labels);
    assert_eq!(
        bytes,
        [
            0x0A, 0x07, 0x08, 0x01, 0x12, 0x03, b'a', b'b', b'c', //
            0x0A, 0x00, //
            0x0A, 0x07, 0x08, 0x02, 0x12, 0x03, b'd', b'e', b'f',
        ]
    );
    let back = model.deserialize("Shop.Labels", &bytes).unwrap();
    let entries = back.as_map().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1], (Value::I32(0), Value::String(String::new())));
}

#[test]
fn test_map_member_with_message_values() {
    let model = TypeModel::new();
    model.register(
        MessageBuilder::new("Geo.Point")
            .field(1, "x", "System.Int32")
            .field(2, "y", "System.Int32")
            .build(),
    );
    model.register(TypeDescriptor::map("Geo.Places", "System.String", "Geo.Point"));
    model.register(MessageBuilder::new("Geo.Atlas").field(3, "places", "Geo.Places").build());

    let point = |x: i32, y: i32| Value::Message(MessageValue::new("Geo.Point").with("x", x).with("y", y));
    let atlas = Value::Message(MessageValue::new("Geo.Atlas").with(
        "places",
        Value::Map(vec![("home".into(), point(1, 2)), ("origin".into(), point(0, 0))]),
    ));
    roundtrip(&model, "Geo.Atlas", &atlas);
}

#[test]
fn test_map_repeated_key_keeps_last_value() {
    let model = TypeModel::new();
    model.register(TypeDescriptor::map("Shop.Labels", "System.Int32", "System.String"));
    // (1, "a") (2, "b") (1, "c")
    let bytes = [
        0x0A, 0x05, 0x08, 0x01, 0x12, 0x01, b'a', //
        0x0A, 0x05, 0x08, 0x02, 0x12, 0x01, b'b', //
        0x0A, 0x05, 0x08, 0x01, 0x12, 0x01, b'c',
    ];
    let back = model.deserialize("Shop.Labels", &bytes).unwrap();
    assert_eq!(
        back.as_map().unwrap(),
        &[(Value::I32(1), Value::from("c")), (Value::I32(2), Value::from("b"))]
    );

    // the same key split across runs of a member, with another field between
    model.register(
        MessageBuilder::new("Shop.Shelf")
            .field(1, "labels", "Shop.Labels")
            .field(2, "note", "System.String")
            .build(),
    );
    let bytes = [
        0x0A, 0x05, 0x08, 0x01, 0x12, 0x01, b'a', //
        0x12, 0x01, b'x', //
        0x0A, 0x05, 0x08, 0x01, 0x12, 0x01, b'z',
    ];
    let shelf = model.deserialize("Shop.Shelf", &bytes).unwrap();
    assert_eq!(
        shelf.get_field("labels").and_then(Value::as_map).unwrap(),
        &[(Value::I32(1), Value::from("z"))]
    );
    assert_eq!(shelf.get_field("note"), Some(&Value::from("x")));
}

#[test]
fn test_cleared_map_keeps_every_run_of_one_read() {
    let model = TypeModel::new();
    model.register(
        TypeDescriptor::map("Shop.Stock", "System.Int32", "System.Int32")
            .with_options(FeatureOptions::CLEAR_COLLECTION),
    );
    model.register(
        MessageBuilder::new("Shop.Depot")
            .field(1, "stock", "Shop.Stock")
            .field(2, "site", "System.String")
            .build(),
    );
    let mut slot = Some(Value::Message(
        MessageValue::new("Shop.Depot").with("stock", Value::Map(vec![(Value::I32(9), Value::I32(9))])),
    ));
    // (1, 5), site "s", (2, 7)
    let bytes = [
        0x0A, 0x04, 0x08, 0x01, 0x10, 0x05, //
        0x12, 0x01, b's', //
        0x0A, 0x04, 0x08, 0x02, 0x10, 0x07,
    ];
    model.deserialize_into("Shop.Depot", &bytes, &mut slot, false).unwrap();
    let stock = slot.as_ref().and_then(|v| v.get_field("stock")).and_then(Value::as_map).unwrap();
    assert_eq!(
        stock,
        &[(Value::I32(1), Value::I32(5)), (Value::I32(2), Value::I32(7))]
    );
}

#[test]
fn test_large_map_decode_scales_linearly() {
    use std::time::{Duration, Instant};

    let model = TypeModel::new();
    model.register(TypeDescriptor::map("Shop.Counts", "System.Int32", "System.Int32"));
    let encode = |n: i32| {
        let entries = (1..=n).map(|i| (Value::I32(i), Value::I32(i))).collect();
        model.serialize("Shop.Counts", &Value::Map(entries)).unwrap()
    };
    let fastest = |bytes: &[u8], n: usize| {
        (0..3)
            .map(|_| {
                let start = Instant::now();
                let back = model.deserialize("Shop.Counts", bytes).unwrap();
                let elapsed = start.elapsed();
                assert_eq!(back.as_map().unwrap().len(), n);
                elapsed
            })
            .min()
            .unwrap_or(Duration::ZERO)
    };

    let small = encode(10_000);
    let large = encode(80_000);
    let small_time = fastest(&small, 10_000).max(Duration::from_micros(100));
    let large_time = fastest(&large, 80_000);
    // 8x the entries; a quadratic decode would take about 64x as long
    assert!(
        large_time < small_time * 32,
        "80k entries took {large_time:?}, 10k took {small_time:?}"
    );
}

#[test]
fn test_nested_lists_round_trip() {
    let model = TypeModel::new();
    let grid = Value::List(vec![
        Value::List(vec![Value::I32(1), Value::I32(2)]),
        Value::List(Vec::new()),
        Value::List(vec![Value::I32(0)]),
    ]);
    let bytes = roundtrip(&model, "System.Int32[][]", &grid);
    // empty inner list is still framed
    assert!(bytes.windows(2).any(|w| w == [0x0A, 0x00]));
}

#[test]
fn test_packed_member() {
    let model = TypeModel::new();
    model.register(
        MessageBuilder::new("Stats")
            .field_with(FieldDescriptor::new(1, "samples", "System.Int32[]").packed(true))
            .repeated_field(2, "names", "System.String")
            .build(),
    );
    let stats = Value::Message(
        MessageValue::new("Stats")
            .with("samples", Value::List(vec![3i32.into(), 270i32.into(), 86942i32.into()]))
            .with("names", Value::List(vec!["a".into()])),
    );
    let bytes = roundtrip(&model, "Stats", &stats);
    assert_eq!(
        bytes,
        [0x0A, 0x06, 0x03, 0x8E, 0x02, 0x9E, 0xA7, 0x05, 0x12, 0x01, b'a']
    );

    // the unpacked form of the same field reads the same
    let unpacked = [0x08, 0x03, 0x08, 0x8E, 0x02, 0x08, 0x9E, 0xA7, 0x05];
    let back = model.deserialize("Stats", &unpacked).unwrap();
    assert_eq!(back.get_field("samples"), stats.get_field("samples"));
}

#[test]
fn test_packed_by_default_option() {
    let options = ModelOptions::builder().pack_repeated_by_default(true).build();
    let model = TypeModel::with_options(options);
    let bytes = roundtrip(&model, "System.Int64[]", &Value::List(vec![1i64.into(), 2i64.into()]));
    assert_eq!(bytes, [0x0A, 0x02, 0x01, 0x02]);

    let strings = roundtrip(&model, "System.String[]", &Value::List(vec!["x".into()]));
    assert_eq!(strings, [0x0A, 0x01, b'x']);
}

#[test]
fn test_null_element_is_rejected() {
    let model = TypeModel::new();
    let err = model
        .serialize("System.String[]", &Value::List(vec!["a".into(), Value::Null]))
        .unwrap_err();
    assert!(matches!(err, Error::NullElement { .. }));
}

#[test]
fn test_merge_appends_unless_cleared() {
    let model = TypeModel::new();
    model.register(MessageBuilder::new("Doc").repeated_field(1, "tags", "System.String").build());
    let existing = || Some(Value::Message(MessageValue::new("Doc").with("tags", Value::List(vec!["old".into()]))));
    let bytes = [0x0A, 0x03, b'n', b'e', b'w'];

    let mut slot = existing();
    model.deserialize_into("Doc", &bytes, &mut slot, false).unwrap();
    let tags = slot.as_ref().and_then(|v| v.get_field("tags")).and_then(Value::as_list).unwrap();
    assert_eq!(tags, &[Value::from("old"), Value::from("new")]);

    let model = TypeModel::new();
    model.register(TypeDescriptor::repeated("System.String").with_options(FeatureOptions::CLEAR_COLLECTION));
    model.register(MessageBuilder::new("Doc").repeated_field(1, "tags", "System.String").build());
    let mut slot = existing();
    model.deserialize_into("Doc", &bytes, &mut slot, false).unwrap();
    let tags = slot.as_ref().and_then(|v| v.get_field("tags")).and_then(Value::as_list).unwrap();
    assert_eq!(tags, &[Value::from("new")]);
}

// ============================================================================
// Messages
// ============================================================================

#[test]
fn test_inheritance_three_levels() {
    let model = TypeModel::new();
    model.register(
        MessageBuilder::new("Zoo.Animal")
            .field(1, "name", "System.String")
            .subtype(5, "Zoo.Dog")
            .build(),
    );
    model.register(
        MessageBuilder::new("Zoo.Dog")
            .base("Zoo.Animal")
            .field(1, "good", "System.Boolean")
            .subtype(6, "Zoo.Puppy")
            .build(),
    );
    model.register(
        MessageBuilder::new("Zoo.Puppy")
            .base("Zoo.Dog")
            .field(1, "age_weeks", "System.UInt32")
            .build(),
    );

    let puppy = Value::Message(
        MessageValue::new("Zoo.Puppy")
            .with("name", "rex")
            .with("good", true)
            .with("age_weeks", 9u32),
    );
    let bytes = roundtrip(&model, "Zoo.Animal", &puppy);
    assert_eq!(
        bytes,
        [0x2A, 0x06, 0x32, 0x02, 0x08, 0x09, 0x08, 0x01, 0x0A, 0x03, b'r', b'e', b'x']
    );

    // a plain animal stays an animal
    let animal = Value::Message(MessageValue::new("Zoo.Animal").with("name", "cat"));
    roundtrip(&model, "Zoo.Animal", &animal);
}

#[test]
fn test_wrapped_value_member() {
    let model = TypeModel::new();
    model.register(
        TypeDescriptor::new("Shop.Quantity", TypeKind::Scalar(ScalarKind::I32))
            .with_options(FeatureOptions::WRAPPED_VALUE),
    );
    model.register(MessageBuilder::new("Shop.Line").field(3, "qty", "Shop.Quantity").build());

    let line = Value::Message(MessageValue::new("Shop.Line").with("qty", 5i32));
    let bytes = roundtrip(&model, "Shop.Line", &line);
    assert_eq!(bytes, [0x1A, 0x02, 0x08, 0x05]);

    let root = roundtrip(&model, "Shop.Quantity", &Value::I32(5));
    assert_eq!(root, [0x0A, 0x02, 0x08, 0x05]);
}

#[test]
fn test_unknown_fields_and_groups_are_skipped() {
    let model = shop_model();
    // field 9 varint, field 10 group { field 1 varint }, field 4 = 7
    let bytes = [0x48, 0x01, 0x53, 0x08, 0x02, 0x54, 0x20, 0x07];
    let back = model.deserialize("Shop.Order", &bytes).unwrap();
    assert_eq!(back.get_field("discount"), Some(&Value::I32(7)));
}

#[test]
fn test_depth_limit() {
    let options = ModelOptions::builder().max_depth(2).build();
    let model = TypeModel::with_options(options);
    model.register(MessageBuilder::new("Node").field(1, "child", "Node").build());
    let bytes = [0x0A, 0x04, 0x0A, 0x02, 0x0A, 0x00];
    assert!(matches!(model.deserialize("Node", &bytes), Err(Error::Format { .. })));

    let model = TypeModel::new();
    model.register(MessageBuilder::new("Node").field(1, "child", "Node").build());
    let back = model.deserialize("Node", &bytes).unwrap();
    let depth = std::iter::successors(Some(&back), |v| v.get_field("child")).count();
    assert_eq!(depth, 4);
}

#[test]
fn test_deep_clone() {
    let model = shop_model();
    let order = Value::Message(
        MessageValue::new("Shop.Order")
            .with("id", Guid::parse("6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap())
            .with("tags", Value::List(vec!["a".into()]))
            .with("not_modelled", 1i32),
    );
    let copy = model.deep_clone("Shop.Order", &order).unwrap();
    assert_eq!(copy.get_field("id"), order.get_field("id"));
    assert_eq!(copy.get_field("tags"), order.get_field("tags"));
    assert_eq!(copy.get_field("not_modelled"), None);

    let err = model.deep_clone("Shop.Order", &Value::I32(1)).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));

    let bad = Value::Message(MessageValue::new("Shop.Order").with("amount", "12"));
    assert!(matches!(model.deep_clone("Shop.Order", &bad), Err(Error::TypeMismatch { .. })));
}
