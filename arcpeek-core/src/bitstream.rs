//! Bit-level reading over an in-memory buffer.
//!
//! [`BitReader`] is a forward-only cursor over a byte slice. It is the
//! foundation every decoder in arcpeek reads through: DEFLATE block headers,
//! Huffman codes, extra bits and stored-block payloads.
//!
//! # Bit Ordering
//!
//! DEFLATE packs data elements starting from the least significant bit of
//! each byte. Multi-bit fields are read LSB-first: the first bit read becomes
//! bit 0 of the result, the second bit 1, and so on.
//!
//! # Example
//!
//! ```
//! use arcpeek_core::bitstream::BitReader;
//!
//! // 0xB5 = 0b1011_0101
//! let data = [0xB5, 0xFF];
//! let mut reader = BitReader::new(&data);
//! assert_eq!(reader.next_bit().unwrap(), 1);
//! assert_eq!(reader.read_bits(3).unwrap(), 0b010);
//! reader.align_to_byte();
//! assert_eq!(reader.read_bits(8).unwrap(), 0xFF);
//! assert!(reader.read_bits(1).is_err());
//! ```

use crate::error::{ArcPeekError, Result};

/// A bit-level reader over a byte slice.
///
/// Bytes are pulled from the slice into a 64-bit register one at a time as
/// bits are requested. The cursor only moves forward and never reads past
/// the end of the slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// Source buffer.
    data: &'a [u8],
    /// Index of the next byte to load into the register.
    position: usize,
    /// Bit register (LSB-first).
    buffer: u64,
    /// Number of valid bits in the register.
    bits_in_buffer: u8,
    /// Total bits consumed (for error reporting).
    total_bits_read: u64,
}

impl<'a> BitReader<'a> {
    /// Create a new `BitReader` starting at the first byte of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            buffer: 0,
            bits_in_buffer: 0,
            total_bits_read: 0,
        }
    }

    /// Get the underlying buffer.
    pub fn get_ref(&self) -> &'a [u8] {
        self.data
    }

    /// Get the total number of bits consumed so far.
    pub fn bit_position(&self) -> u64 {
        self.total_bits_read
    }

    /// Number of bytes consumed, counting a partially read byte as consumed.
    ///
    /// After the final DEFLATE block this is the offset of whatever follows
    /// the compressed stream (a GZIP trailer, for instance).
    pub fn byte_position(&self) -> usize {
        self.position - (self.bits_in_buffer / 8) as usize
    }

    /// Number of whole bytes still available, including buffered ones.
    pub fn remaining_bytes(&self) -> usize {
        (self.data.len() - self.position) + (self.bits_in_buffer / 8) as usize
    }

    /// Ensure at least `count` bits are available in the register.
    #[inline]
    fn fill_buffer(&mut self, count: u8) -> Result<()> {
        debug_assert!(count <= 32, "Cannot fill more than 32 bits at once");

        while self.bits_in_buffer < count {
            let Some(&byte) = self.data.get(self.position) else {
                let missing_bits = (count - self.bits_in_buffer) as usize;
                return Err(ArcPeekError::unexpected_end(
                    self.position,
                    missing_bits.div_ceil(8),
                ));
            };
            self.buffer |= (byte as u64) << self.bits_in_buffer;
            self.bits_in_buffer += 8;
            self.position += 1;
        }

        Ok(())
    }

    /// Consume a single bit and return it as 0 or 1.
    #[inline]
    pub fn next_bit(&mut self) -> Result<u8> {
        self.fill_buffer(1)?;

        let bit = (self.buffer & 1) as u8;
        self.buffer >>= 1;
        self.bits_in_buffer -= 1;
        self.total_bits_read += 1;

        Ok(bit)
    }

    /// Read up to 32 bits, least significant bit first.
    ///
    /// The first bit consumed lands in bit 0 of the result.
    #[inline]
    pub fn read_bits(&mut self, count: u8) -> Result<u32> {
        debug_assert!(count <= 32, "Cannot read more than 32 bits at once");

        if count == 0 {
            return Ok(0);
        }

        self.fill_buffer(count)?;

        let mask = (1u64 << count).wrapping_sub(1);
        let result = (self.buffer & mask) as u32;

        self.buffer >>= count;
        self.bits_in_buffer -= count;
        self.total_bits_read += count as u64;

        Ok(result)
    }

    /// Discard the unread bits of the current byte.
    pub fn align_to_byte(&mut self) {
        let remainder = self.bits_in_buffer % 8;
        if remainder > 0 {
            self.buffer >>= remainder;
            self.bits_in_buffer -= remainder;
            self.total_bits_read += remainder as u64;
        }
    }

    /// Copy `count` byte-aligned bytes to `output` without bit decoding.
    ///
    /// The reader must be byte-aligned. Nothing is copied if fewer than
    /// `count` bytes remain.
    pub fn read_raw_bytes(&mut self, count: usize, output: &mut Vec<u8>) -> Result<()> {
        debug_assert!(self.bits_in_buffer % 8 == 0, "Reader is not byte-aligned");

        let available = self.remaining_bytes();
        if count > available {
            return Err(ArcPeekError::unexpected_end(
                self.byte_position(),
                count - available,
            ));
        }

        output.reserve(count);

        // Drain whole bytes still sitting in the register first
        let mut remaining = count;
        while self.bits_in_buffer >= 8 && remaining > 0 {
            output.push((self.buffer & 0xFF) as u8);
            self.buffer >>= 8;
            self.bits_in_buffer -= 8;
            remaining -= 1;
        }

        let end = self.position + remaining;
        output.extend_from_slice(&self.data[self.position..end]);
        self.position = end;
        self.total_bits_read += count as u64 * 8;

        Ok(())
    }
}
