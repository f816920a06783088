// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Base-128 varints and zigzag mapping.
//!
//! Varints are little-endian groups of 7 bits, high bit set on every byte
//! except the last. A `u64` needs at most 10 bytes; the 10th byte may only
//! carry bit 63.

use crate::config::MAX_VARINT_LEN;

/// Why a varint could not be decoded. Offsets are attached by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// Buffer ended before the terminating byte.
    Truncated,
    /// More than 10 bytes, or a 10th byte with bits beyond 63.
    Overlong,
}

/// Append `value` as a varint.
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Encoded size of `value` in bytes (1..=10).
pub const fn varint_len(value: u64) -> usize {
    // bits needed, rounded up to groups of 7; zero still takes one byte
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Decode a varint from the start of `buf`, returning the value and the
/// number of bytes consumed.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut value = 0u64;
    for (i, &byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(VarintError::Overlong);
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        Err(VarintError::Overlong)
    } else {
        Err(VarintError::Truncated)
    }
}

/// Zigzag-map a signed 32-bit value so small magnitudes stay small.
#[inline]
pub const fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
pub const fn zigzag_decode32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

#[inline]
pub const fn zigzag_encode64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
pub const fn zigzag_decode64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        encode_varint(value, &mut out);
        out
    }

    #[test]
    fn test_encode_known_vectors() {
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(1), vec![0x01]);
        assert_eq!(encoded(127), vec![0x7F]);
        assert_eq!(encoded(128), vec![0x80, 0x01]);
        assert_eq!(encoded(150), vec![0x96, 0x01]);
        assert_eq!(encoded(16_383), vec![0xFF, 0x7F]);
        assert_eq!(encoded(16_384), vec![0x80, 0x80, 0x01]);
        assert_eq!(
            encoded(u64::MAX),
            vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
        );
    }

    #[test]
    fn test_varint_len_matches_encoding() {
        for value in [0, 1, 127, 128, 16_383, 16_384, u64::from(u32::MAX), u64::MAX] {
            assert_eq!(varint_len(value), encoded(value).len(), "value {value}");
        }
    }

    #[test]
    fn test_decode_reports_consumed_bytes() {
        let buf = [0x96, 0x01, 0xFF];
        assert_eq!(decode_varint(&buf), Ok((150, 2)));
    }

    #[test]
    fn test_decode_truncated() {
        assert_eq!(decode_varint(&[]), Err(VarintError::Truncated));
        assert_eq!(decode_varint(&[0x80, 0x80]), Err(VarintError::Truncated));
    }

    #[test]
    fn test_decode_rejects_overlong() {
        // 11 bytes
        let mut buf = vec![0x80; 10];
        buf.push(0x01);
        assert_eq!(decode_varint(&buf), Err(VarintError::Overlong));

        // 10th byte carries more than bit 63
        let mut buf = vec![0xFF; 9];
        buf.push(0x02);
        assert_eq!(decode_varint(&buf), Err(VarintError::Overlong));
    }

    #[test]
    fn test_zigzag_known_vectors() {
        assert_eq!(zigzag_encode32(0), 0);
        assert_eq!(zigzag_encode32(-1), 1);
        assert_eq!(zigzag_encode32(1), 2);
        assert_eq!(zigzag_encode32(-2), 3);
        assert_eq!(zigzag_encode32(i32::MAX), u32::MAX - 1);
        assert_eq!(zigzag_encode32(i32::MIN), u32::MAX);
        assert_eq!(zigzag_encode64(i64::MIN), u64::MAX);
        assert_eq!(zigzag_decode64(u64::MAX), i64::MIN);
        assert_eq!(zigzag_decode32(3), -2);
    }

    #[test]
    fn test_zigzag_widths_agree() {
        for n in [0, 1, -1, 63, -64, i32::MAX, i32::MIN] {
            assert_eq!(u64::from(zigzag_encode32(n)), zigzag_encode64(i64::from(n)));
        }
    }
}
