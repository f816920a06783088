// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Repeated and map fields for statically typed elements.

pub mod map;
pub mod repeated;

pub use map::{read_map, read_map_entry, write_map};
pub use repeated::{read_repeated, read_repeated_with, write_repeated};
