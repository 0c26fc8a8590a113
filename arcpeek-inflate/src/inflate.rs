//! DEFLATE decompression (inflate).
//!
//! The engine is a small state machine over one in-memory buffer:
//!
//! ```text
//! ReadBlockHeader ─┬─> StoredBlock  ─┐
//!                  ├─> FixedBlock   ─┼─> ReadBlockHeader | Done
//!                  └─> DynamicBlock ─┘
//! ```
//!
//! It stops after the block whose final flag is set. Output accumulates in a
//! single `Vec<u8>`, which doubles as the LZ77 history window: a
//! back-reference may reach anywhere into what has been produced so far.

use crate::dynamic::read_dynamic_trees;
use crate::huffman::{END_OF_BLOCK, HuffmanTree};
use crate::tables::{distance_params, fixed_distance_tree, fixed_litlen_tree, length_params};
use arcpeek_core::error::{ArcPeekError, Result};
use arcpeek_core::{BitReader, DecodeOptions, StoredLengthPolicy};

/// Block compression type (BTYPE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// BTYPE 00: raw bytes.
    Stored,
    /// BTYPE 01: fixed Huffman codes.
    FixedHuffman,
    /// BTYPE 10: Huffman codes transmitted in the block.
    DynamicHuffman,
}

/// The three header bits that start every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// BFINAL: this is the last block of the stream.
    pub is_final: bool,
    /// BTYPE.
    pub kind: BlockKind,
}

impl BlockHeader {
    /// Read BFINAL and BTYPE. The reserved type 3 is rejected.
    pub fn read(reader: &mut BitReader<'_>) -> Result<Self> {
        let is_final = reader.next_bit()? == 1;
        let kind = match reader.read_bits(2)? {
            0 => BlockKind::Stored,
            1 => BlockKind::FixedHuffman,
            2 => BlockKind::DynamicHuffman,
            _ => {
                return Err(ArcPeekError::corrupted(
                    reader.byte_position() as u64,
                    "reserved block type 3",
                ));
            }
        };
        Ok(Self { is_final, kind })
    }
}

/// Engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadBlockHeader,
    Block(BlockKind),
    Done,
}

/// Result of inflating a stream embedded in a larger buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inflated {
    /// Decompressed bytes.
    pub data: Vec<u8>,
    /// Input bytes consumed, up to and including the byte holding the last
    /// bit of the final block.
    pub consumed: usize,
}

/// DEFLATE decompressor.
#[derive(Debug)]
pub struct Inflater {
    options: DecodeOptions,
    output: Vec<u8>,
    state: State,
    final_block: bool,
    blocks: usize,
}

impl Inflater {
    /// Create a decompressor with default (strict) options.
    pub fn new() -> Self {
        Self::with_options(DecodeOptions::default())
    }

    /// Create a decompressor with the given options.
    pub fn with_options(options: DecodeOptions) -> Self {
        Self {
            options,
            output: Vec::new(),
            state: State::ReadBlockHeader,
            final_block: false,
            blocks: 0,
        }
    }

    /// Run the state machine until the final block has been decoded.
    pub fn inflate(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        loop {
            self.state = match self.state {
                State::ReadBlockHeader => {
                    let header = BlockHeader::read(reader)?;
                    log::trace!(
                        "block {} at bit {}: {:?}{}",
                        self.blocks,
                        reader.bit_position() - 3,
                        header.kind,
                        if header.is_final { " (final)" } else { "" }
                    );
                    self.final_block = header.is_final;
                    self.blocks += 1;
                    State::Block(header.kind)
                }
                State::Block(kind) => {
                    match kind {
                        BlockKind::Stored => self.inflate_stored(reader)?,
                        BlockKind::FixedHuffman => self.inflate_huffman(
                            reader,
                            fixed_litlen_tree()?,
                            fixed_distance_tree()?,
                        )?,
                        BlockKind::DynamicHuffman => {
                            let (litlen, distance) = read_dynamic_trees(reader)?;
                            self.inflate_huffman(reader, &litlen, &distance)?
                        }
                    }
                    if self.final_block {
                        State::Done
                    } else {
                        State::ReadBlockHeader
                    }
                }
                State::Done => return Ok(()),
            };
        }
    }

    /// Decompress a stored block.
    fn inflate_stored(&mut self, reader: &mut BitReader<'_>) -> Result<()> {
        reader.align_to_byte();

        let len = reader.read_bits(16)? as u16;
        let nlen = reader.read_bits(16)? as u16;

        if len != !nlen {
            match self.options.stored_length {
                StoredLengthPolicy::Strict => {
                    return Err(ArcPeekError::corrupted(
                        reader.byte_position() as u64 - 4,
                        format!(
                            "stored block LEN {:#06x} does not match NLEN {:#06x}",
                            len, nlen
                        ),
                    ));
                }
                StoredLengthPolicy::Lenient => {
                    log::debug!("ignoring stored block LEN/NLEN mismatch ({} vs {})", len, !nlen);
                }
            }
        }

        self.reserve(len as usize)?;
        reader.read_raw_bytes(len as usize, &mut self.output)
    }

    /// Decode literal/length and distance symbols until end of block.
    fn inflate_huffman(
        &mut self,
        reader: &mut BitReader<'_>,
        litlen_tree: &HuffmanTree,
        distance_tree: &HuffmanTree,
    ) -> Result<()> {
        loop {
            let symbol = litlen_tree.decode(reader)?;

            if symbol < END_OF_BLOCK {
                self.reserve(1)?;
                self.output.push(symbol as u8);
                continue;
            }
            if symbol == END_OF_BLOCK {
                return Ok(());
            }

            let Some((base, extra_bits)) = length_params(symbol) else {
                return Err(ArcPeekError::corrupted(
                    reader.byte_position() as u64,
                    format!("invalid literal/length symbol {}", symbol),
                ));
            };
            let length = base as usize + reader.read_bits(extra_bits)? as usize;

            let distance_symbol = distance_tree.decode(reader)?;
            let Some((base, extra_bits)) = distance_params(distance_symbol) else {
                return Err(ArcPeekError::corrupted(
                    reader.byte_position() as u64,
                    format!("invalid distance symbol {}", distance_symbol),
                ));
            };
            let distance = base as usize + reader.read_bits(extra_bits)? as usize;

            self.copy_match(reader, distance, length)?;
        }
    }

    /// Replay `length` bytes starting `distance` bytes back.
    ///
    /// Overlapping references (distance < length) repeat the most recent
    /// bytes, so the copy runs forward one byte at a time.
    fn copy_match(
        &mut self,
        reader: &BitReader<'_>,
        distance: usize,
        length: usize,
    ) -> Result<()> {
        if distance > self.output.len() {
            return Err(ArcPeekError::corrupted(
                reader.byte_position() as u64,
                format!(
                    "distance {} reaches before start of output ({} bytes)",
                    distance,
                    self.output.len()
                ),
            ));
        }
        self.reserve(length)?;

        let start = self.output.len() - distance;
        if distance >= length {
            self.output.extend_from_within(start..start + length);
        } else {
            for i in 0..length {
                let byte = self.output[start + i];
                self.output.push(byte);
            }
        }

        Ok(())
    }

    /// Enforce `max_output_size` before appending `additional` bytes.
    fn reserve(&mut self, additional: usize) -> Result<()> {
        match self.options.max_output_size {
            Some(limit) if self.output.len() + additional > limit => {
                Err(ArcPeekError::output_limit(limit))
            }
            _ => Ok(()),
        }
    }

    /// Whether the final block has been decoded.
    pub fn is_finished(&self) -> bool {
        self.state == State::Done
    }

    /// Number of block headers read so far.
    pub fn block_count(&self) -> usize {
        self.blocks
    }

    /// Get the decompressed output.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Take ownership of the decompressed output.
    pub fn into_output(self) -> Vec<u8> {
        self.output
    }

    /// Discard all output and start over, keeping the options.
    pub fn reset(&mut self) {
        self.output.clear();
        self.state = State::ReadBlockHeader;
        self.final_block = false;
        self.blocks = 0;
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

/// Decompress a raw DEFLATE stream with default options.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    inflate_with_options(data, DecodeOptions::default())
}

/// Decompress a raw DEFLATE stream.
///
/// Bytes after the final block are ignored.
pub fn inflate_with_options(data: &[u8], options: DecodeOptions) -> Result<Vec<u8>> {
    inflate_stream(data, options).map(|inflated| inflated.data)
}

/// Decompress a DEFLATE stream at the start of `data` and report how many
/// input bytes it occupied.
pub fn inflate_stream(data: &[u8], options: DecodeOptions) -> Result<Inflated> {
    let mut reader = BitReader::new(data);
    let mut inflater = Inflater::with_options(options);
    inflater.inflate(&mut reader)?;

    let consumed = reader.byte_position();
    log::debug!(
        "inflated {} bytes from {} in {} block(s)",
        inflater.output.len(),
        consumed,
        inflater.blocks
    );

    Ok(Inflated {
        data: inflater.into_output(),
        consumed,
    })
}
