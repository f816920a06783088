// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use protobridge::TypeModel;

const SURROGATES: [&str; 5] = [
    "System.Guid",
    "System.Decimal",
    "System.DateTime",
    "System.TimeSpan",
    "System.Int64[]",
];

fuzz_target!(|data: &[u8]| {
    let model = TypeModel::new();
    for name in SURROGATES {
        // Anything that decodes must encode again
        if let Ok(value) = model.deserialize(name, data) {
            assert!(model.serialize(name, &value).is_ok(), "{name}: decoded value failed to encode");
        }
    }
});
