//! Static DEFLATE tables (RFC 1951 Sections 3.2.5 - 3.2.7).
//!
//! Fixed Huffman code lengths, the base / extra-bit tables that turn
//! length and distance symbols into values, and the permutation in which a
//! dynamic block transmits its code length code lengths.

use crate::huffman::{DISTANCE_ALPHABET_SIZE, HuffmanTree, LITLEN_ALPHABET_SIZE};
use arcpeek_core::error::Result;
use std::sync::OnceLock;

/// First length symbol.
pub const FIRST_LENGTH_SYMBOL: u16 = 257;

/// Last length symbol defined by RFC 1951.
pub const LAST_LENGTH_SYMBOL: u16 = 285;

/// Number of distance symbols defined by RFC 1951 (0-29).
pub const DISTANCE_SYMBOLS: u16 = 30;

/// Length symbol base values, indexed by `symbol - 257`.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264
    11, 13, 15, 17, // 265-268
    19, 23, 27, 31, // 269-272
    35, 43, 51, 59, // 273-276
    67, 83, 99, 115, // 277-280
    131, 163, 195, 227, // 281-284
    258, // 285
];

/// Extra bits following each length symbol, indexed by `symbol - 257`.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, // 257-264
    1, 1, 1, 1, // 265-268
    2, 2, 2, 2, // 269-272
    3, 3, 3, 3, // 273-276
    4, 4, 4, 4, // 277-280
    5, 5, 5, 5, // 281-284
    0, // 285
];

/// Distance symbol base values.
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, // 0-3
    5, 7, // 4-5
    9, 13, // 6-7
    17, 25, // 8-9
    33, 49, // 10-11
    65, 97, // 12-13
    129, 193, // 14-15
    257, 385, // 16-17
    513, 769, // 18-19
    1025, 1537, // 20-21
    2049, 3073, // 22-23
    4097, 6145, // 24-25
    8193, 12289, // 26-27
    16385, 24577, // 28-29
];

/// Extra bits following each distance symbol.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12,
    13, 13,
];

/// Order in which code length code lengths are transmitted (Section 3.2.7).
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Fixed literal/length code lengths (Section 3.2.6).
///
/// | symbols | bits |
/// |---------|------|
/// | 0-143   | 8    |
/// | 144-255 | 9    |
/// | 256-279 | 7    |
/// | 280-287 | 8    |
pub const FIXED_LITLEN_LENGTHS: [u8; LITLEN_ALPHABET_SIZE] = {
    let mut lengths = [8u8; LITLEN_ALPHABET_SIZE];
    let mut i = 144;
    while i < 256 {
        lengths[i] = 9;
        i += 1;
    }
    while i < 280 {
        lengths[i] = 7;
        i += 1;
    }
    lengths
};

/// Fixed distance code lengths: every one of the 32 symbols is 5 bits.
///
/// Symbols 30 and 31 take part in the code but never appear in valid data.
pub const FIXED_DISTANCE_LENGTHS: [u8; DISTANCE_ALPHABET_SIZE] = [5; DISTANCE_ALPHABET_SIZE];

/// The fixed literal/length tree, built once.
pub fn fixed_litlen_tree() -> Result<&'static HuffmanTree> {
    static TREE: OnceLock<HuffmanTree> = OnceLock::new();
    cached_tree(&TREE, &FIXED_LITLEN_LENGTHS)
}

/// The fixed distance tree, built once.
pub fn fixed_distance_tree() -> Result<&'static HuffmanTree> {
    static TREE: OnceLock<HuffmanTree> = OnceLock::new();
    cached_tree(&TREE, &FIXED_DISTANCE_LENGTHS)
}

fn cached_tree(
    cell: &'static OnceLock<HuffmanTree>,
    lengths: &[u8],
) -> Result<&'static HuffmanTree> {
    if let Some(tree) = cell.get() {
        return Ok(tree);
    }
    let tree = HuffmanTree::from_code_lengths(lengths)?;
    Ok(cell.get_or_init(|| tree))
}

/// Base value and extra bit count for a length symbol (257-285).
#[inline]
pub fn length_params(symbol: u16) -> Option<(u16, u8)> {
    if !(FIRST_LENGTH_SYMBOL..=LAST_LENGTH_SYMBOL).contains(&symbol) {
        return None;
    }
    let index = (symbol - FIRST_LENGTH_SYMBOL) as usize;
    Some((LENGTH_BASE[index], LENGTH_EXTRA_BITS[index]))
}

/// Base value and extra bit count for a distance symbol (0-29).
#[inline]
pub fn distance_params(symbol: u16) -> Option<(u16, u8)> {
    if symbol >= DISTANCE_SYMBOLS {
        return None;
    }
    let index = symbol as usize;
    Some((DISTANCE_BASE[index], DISTANCE_EXTRA_BITS[index]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_litlen_lengths() {
        assert!(FIXED_LITLEN_LENGTHS[..144].iter().all(|&l| l == 8));
        assert!(FIXED_LITLEN_LENGTHS[144..256].iter().all(|&l| l == 9));
        assert!(FIXED_LITLEN_LENGTHS[256..280].iter().all(|&l| l == 7));
        assert!(FIXED_LITLEN_LENGTHS[280..].iter().all(|&l| l == 8));
    }

    #[test]
    fn test_fixed_trees() {
        let litlen = fixed_litlen_tree().unwrap();
        assert_eq!(litlen.symbol_count(), 288);
        assert_eq!(litlen.max_code_length(), 9);

        let distance = fixed_distance_tree().unwrap();
        assert_eq!(distance.symbol_count(), 32);

        // Cached: same allocation on the second call
        assert!(std::ptr::eq(litlen, fixed_litlen_tree().unwrap()));
    }

    #[test]
    fn test_fixed_litlen_codes() {
        // Section 3.2.6: 256 is 0000000, 0 is 00110000, 144 is 110010000
        let codes = fixed_litlen_tree().unwrap().codes();
        let find = |symbol: u16| codes.iter().find(|c| c.symbol == symbol).copied().unwrap();

        assert_eq!((find(256).code, find(256).length), (0b0000000, 7));
        assert_eq!((find(0).code, find(0).length), (0b0011_0000, 8));
        assert_eq!((find(144).code, find(144).length), (0b1_1001_0000, 9));
        assert_eq!((find(280).code, find(280).length), (0b1100_0000, 8));
    }

    #[test]
    fn test_length_params() {
        assert_eq!(length_params(257), Some((3, 0)));
        assert_eq!(length_params(264), Some((10, 0)));
        assert_eq!(length_params(265), Some((11, 1)));
        assert_eq!(length_params(284), Some((227, 5)));
        assert_eq!(length_params(285), Some((258, 0)));
        assert_eq!(length_params(286), None);
        assert_eq!(length_params(256), None);
    }

    #[test]
    fn test_distance_params() {
        assert_eq!(distance_params(0), Some((1, 0)));
        assert_eq!(distance_params(4), Some((5, 1)));
        assert_eq!(distance_params(29), Some((24577, 13)));
        assert_eq!(distance_params(30), None);
        assert_eq!(distance_params(31), None);
    }

    #[test]
    fn test_tables_are_contiguous() {
        // 284 overlaps 285 (227 + 31 = 258), so stop before it
        for i in 0..27 {
            assert_eq!(
                LENGTH_BASE[i] + (1 << LENGTH_EXTRA_BITS[i]),
                LENGTH_BASE[i + 1],
                "length gap after symbol {}",
                257 + i
            );
        }
        for i in 0..29 {
            assert_eq!(
                DISTANCE_BASE[i] as u32 + (1u32 << DISTANCE_EXTRA_BITS[i]),
                DISTANCE_BASE[i + 1] as u32,
                "distance gap after symbol {}",
                i
            );
        }
    }
}
