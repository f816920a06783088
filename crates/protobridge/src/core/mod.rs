// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Core building blocks: wire primitives (`ser`) and buffer recycling (`rt`).

pub mod rt;
pub mod ser;
