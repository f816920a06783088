// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resource recycling: scratch-object pools and pooled read buffers.

pub mod array_pool;
pub mod pool;
pub mod read_buffer;

pub use array_pool::ArrayPool;
pub use pool::{Pool, Recycle};
pub use read_buffer::ReadBuffer;
