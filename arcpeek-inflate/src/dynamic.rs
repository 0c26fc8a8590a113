//! Dynamic Huffman table header (RFC 1951 Section 3.2.7).
//!
//! A dynamic block starts with the code lengths of its own literal/length
//! and distance codes, themselves Huffman coded with a small "code length"
//! alphabet:
//!
//! | symbol | meaning                                         |
//! |--------|-------------------------------------------------|
//! | 0-15   | literal code length                             |
//! | 16     | repeat previous length 3-6 times (2 extra bits) |
//! | 17     | repeat zero 3-10 times (3 extra bits)           |
//! | 18     | repeat zero 11-138 times (7 extra bits)         |

use crate::huffman::{CODELEN_ALPHABET_SIZE, END_OF_BLOCK, HuffmanTree};
use crate::tables::CODE_LENGTH_ORDER;
use arcpeek_core::BitReader;
use arcpeek_core::error::{ArcPeekError, Result};

/// Most literal/length codes a dynamic header may declare.
pub const MAX_LITLEN_CODES: usize = 286;

/// Most distance codes a dynamic header may declare.
pub const MAX_DISTANCE_CODES: usize = 30;

/// The three counts at the start of a dynamic block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicHeader {
    /// Number of literal/length codes (HLIT + 257).
    pub litlen_codes: usize,
    /// Number of distance codes (HDIST + 1).
    pub distance_codes: usize,
    /// Number of code length codes (HCLEN + 4).
    pub codelen_codes: usize,
}

impl DynamicHeader {
    /// Read HLIT, HDIST and HCLEN.
    pub fn read(reader: &mut BitReader<'_>) -> Result<Self> {
        let litlen_codes = reader.read_bits(5)? as usize + 257;
        let distance_codes = reader.read_bits(5)? as usize + 1;
        let codelen_codes = reader.read_bits(4)? as usize + 4;

        if litlen_codes > MAX_LITLEN_CODES {
            return Err(ArcPeekError::corrupted(
                reader.byte_position() as u64,
                format!("too many literal/length codes: {}", litlen_codes),
            ));
        }
        if distance_codes > MAX_DISTANCE_CODES {
            return Err(ArcPeekError::corrupted(
                reader.byte_position() as u64,
                format!("too many distance codes: {}", distance_codes),
            ));
        }

        Ok(Self {
            litlen_codes,
            distance_codes,
            codelen_codes,
        })
    }
}

/// Read a dynamic block header and build its literal/length and distance trees.
pub fn read_dynamic_trees(reader: &mut BitReader<'_>) -> Result<(HuffmanTree, HuffmanTree)> {
    let header = DynamicHeader::read(reader)?;

    let mut codelen_lengths = [0u8; CODELEN_ALPHABET_SIZE];
    for &symbol in CODE_LENGTH_ORDER.iter().take(header.codelen_codes) {
        codelen_lengths[symbol] = reader.read_bits(3)? as u8;
    }
    let codelen_tree = HuffmanTree::from_code_lengths(&codelen_lengths)?;

    let lengths = read_code_lengths(
        reader,
        &codelen_tree,
        header.litlen_codes + header.distance_codes,
    )?;
    let (litlen_lengths, distance_lengths) = lengths.split_at(header.litlen_codes);
    if litlen_lengths[usize::from(END_OF_BLOCK)] == 0 {
        return Err(ArcPeekError::malformed_huffman(
            reader.bit_position(),
            "dynamic block has no end-of-block code",
        ));
    }

    log::trace!(
        "dynamic header: {} literal/length, {} distance, {} code length codes",
        header.litlen_codes,
        header.distance_codes,
        header.codelen_codes
    );

    Ok((
        HuffmanTree::from_code_lengths(litlen_lengths)?,
        HuffmanTree::from_code_lengths(distance_lengths)?,
    ))
}

/// Decode `count` code lengths, expanding the run-length symbols.
fn read_code_lengths(
    reader: &mut BitReader<'_>,
    codelen_tree: &HuffmanTree,
    count: usize,
) -> Result<Vec<u8>> {
    let mut lengths = Vec::with_capacity(count);

    while lengths.len() < count {
        let symbol = codelen_tree.decode(reader)?;

        let (value, repeat) = match symbol {
            0..=15 => (symbol as u8, 1),
            16 => {
                let Some(&previous) = lengths.last() else {
                    return Err(ArcPeekError::corrupted(
                        reader.byte_position() as u64,
                        "repeat code 16 with no previous length",
                    ));
                };
                (previous, reader.read_bits(2)? as usize + 3)
            }
            17 => (0, reader.read_bits(3)? as usize + 3),
            18 => (0, reader.read_bits(7)? as usize + 11),
            _ => {
                return Err(ArcPeekError::malformed_huffman(
                    reader.bit_position(),
                    format!("invalid code length symbol {}", symbol),
                ));
            }
        };

        if lengths.len() + repeat > count {
            return Err(ArcPeekError::corrupted(
                reader.byte_position() as u64,
                format!(
                    "code length run of {} overflows {} declared lengths",
                    repeat, count
                ),
            ));
        }
        lengths.resize(lengths.len() + repeat, value);
    }

    Ok(lengths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcpeek_core::ErrorKind;

    /// Packs fields LSB-first, the way a DEFLATE encoder emits them.
    #[derive(Default)]
    struct BitSink {
        bytes: Vec<u8>,
        bit: u32,
    }

    impl BitSink {
        fn put(&mut self, value: u32, count: u32) {
            for i in 0..count {
                if self.bit % 8 == 0 {
                    self.bytes.push(0);
                }
                let last = self.bytes.len() - 1;
                self.bytes[last] |= (((value >> i) & 1) as u8) << (self.bit % 8);
                self.bit += 1;
            }
        }

        /// Huffman codes go out most significant bit first.
        fn put_code(&mut self, code: u32, length: u32) {
            for i in (0..length).rev() {
                self.put((code >> i) & 1, 1);
            }
        }
    }

    /// Code length alphabet where symbols 1, 3, 16, 17 and 18 are in use.
    ///
    /// Lengths: 1 -> 2, 3 -> 2, 16 -> 2, 17 -> 3, 18 -> 3, giving the
    /// canonical codes 1 = 00, 3 = 01, 16 = 10, 17 = 110, 18 = 111.
    fn write_codelen_header(sink: &mut BitSink, hlit: u32, hdist: u32) {
        sink.put(hlit, 5);
        sink.put(hdist, 5);
        // Transmit 19 code length code lengths
        sink.put(15, 4);
        for &symbol in &CODE_LENGTH_ORDER {
            let length = match symbol {
                1 | 3 | 16 => 2,
                17 | 18 => 3,
                _ => 0,
            };
            sink.put(length, 3);
        }
    }

    #[test]
    fn test_run_length_expansion() {
        // 257 litlen + 1 distance = 258 lengths:
        // 3, then 16 x6 (repeat 3) => 7 threes,
        // 18 x138 zeros, 18 x102 zeros, 17 x9 zeros => 256 total,
        // then 3 (symbol 256), then 1 (distance 0)
        let mut sink = BitSink::default();
        write_codelen_header(&mut sink, 0, 0);
        sink.put_code(0b01, 2);
        sink.put_code(0b10, 2);
        sink.put(3, 2);
        sink.put_code(0b111, 3);
        sink.put(127, 7);
        sink.put_code(0b111, 3);
        sink.put(91, 7);
        sink.put_code(0b110, 3);
        sink.put(6, 3);
        sink.put_code(0b01, 2);
        sink.put_code(0b00, 2);

        let mut reader = BitReader::new(&sink.bytes);
        let (litlen, distance) = read_dynamic_trees(&mut reader).unwrap();

        let symbols: Vec<u16> = litlen.codes().iter().map(|c| c.symbol).collect();
        assert_eq!(symbols, vec![0, 1, 2, 3, 4, 5, 6, 256]);
        assert_eq!(distance.symbol_count(), 1);
    }

    #[test]
    fn test_missing_end_of_block() {
        // 257 zero litlen lengths, then distance 0 = 1
        let mut sink = BitSink::default();
        write_codelen_header(&mut sink, 0, 0);
        sink.put_code(0b111, 3);
        sink.put(127, 7);
        sink.put_code(0b111, 3);
        sink.put(108, 7);
        sink.put_code(0b00, 2);

        let mut reader = BitReader::new(&sink.bytes);
        let err = read_dynamic_trees(&mut reader).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedHuffmanCode);
    }

    #[test]
    fn test_repeat_without_previous() {
        let mut sink = BitSink::default();
        write_codelen_header(&mut sink, 0, 0);
        sink.put_code(0b10, 2);
        sink.put(0, 2);

        let mut reader = BitReader::new(&sink.bytes);
        let err = read_dynamic_trees(&mut reader).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptedStream);
    }

    #[test]
    fn test_run_overflow() {
        // 258 lengths declared; 18 x138 twice overflows
        let mut sink = BitSink::default();
        write_codelen_header(&mut sink, 0, 0);
        sink.put_code(0b111, 3);
        sink.put(127, 7);
        sink.put_code(0b111, 3);
        sink.put(127, 7);

        let mut reader = BitReader::new(&sink.bytes);
        let err = read_dynamic_trees(&mut reader).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptedStream);
    }

    #[test]
    fn test_too_many_codes() {
        // HLIT = 30 => 287 literal/length codes
        let mut sink = BitSink::default();
        sink.put(30, 5);
        sink.put(0, 5);
        sink.put(0, 4);
        let mut reader = BitReader::new(&sink.bytes);
        let err = DynamicHeader::read(&mut reader).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptedStream);

        // HDIST = 30 => 31 distance codes
        let mut sink = BitSink::default();
        sink.put(0, 5);
        sink.put(30, 5);
        sink.put(0, 4);
        let mut reader = BitReader::new(&sink.bytes);
        let err = DynamicHeader::read(&mut reader).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptedStream);
    }

    #[test]
    fn test_header_counts() {
        let mut sink = BitSink::default();
        sink.put(29, 5);
        sink.put(29, 5);
        sink.put(15, 4);
        let mut reader = BitReader::new(&sink.bytes);
        let header = DynamicHeader::read(&mut reader).unwrap();
        assert_eq!(
            header,
            DynamicHeader {
                litlen_codes: 286,
                distance_codes: 30,
                codelen_codes: 19,
            }
        );
    }

    #[test]
    fn test_truncated_header() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        let err = read_dynamic_trees(&mut reader).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEndOfStream);
    }
}
