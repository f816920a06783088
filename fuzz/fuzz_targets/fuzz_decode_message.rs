// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use protobridge::dynamic::{MessageBuilder, TypeDescriptor};
use protobridge::{ModelOptions, TypeModel};

fn model() -> TypeModel {
    let model = TypeModel::with_options(ModelOptions::builder().max_depth(16).build());
    model.register(
        MessageBuilder::new("Fuzz.Node")
            .field(1, "name", "System.String")
            .field(2, "child", "Fuzz.Node")
            .repeated_field(3, "values", "System.Int32")
            .field(4, "tags", "Fuzz.Tags")
            .field(5, "stamp", "System.DateTime")
            .subtype(10, "Fuzz.Leaf")
            .build(),
    );
    model.register(
        MessageBuilder::new("Fuzz.Leaf")
            .base("Fuzz.Node")
            .field(1, "weight", "System.Double")
            .build(),
    );
    model.register(TypeDescriptor::map("Fuzz.Tags", "System.String", "System.Int64"));
    model
}

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must never panic
    let _ = model().deserialize("Fuzz.Node", data);
});
