//! GZIP format support (RFC 1952).
//!
//! A GZIP file is one or more members, each a header, a raw DEFLATE stream
//! and a CRC-32 + ISIZE trailer.
//!
//! ## Example
//!
//! ```rust
//! use arcpeek_archive::gzip;
//!
//! // "Hello" in a stored DEFLATE block, wrapped in a member
//! let mut data = vec![0x1F, 0x8B, 8, 0, 0, 0, 0, 0, 0, 3];
//! data.extend_from_slice(&[0x01, 0x05, 0x00, 0xFA, 0xFF]);
//! data.extend_from_slice(b"Hello");
//! data.extend_from_slice(&arcpeek_core::Crc32::compute(b"Hello").to_le_bytes());
//! data.extend_from_slice(&5u32.to_le_bytes());
//!
//! let file = gzip::decompress(&data).unwrap();
//! assert_eq!(file.data, b"Hello");
//! ```

mod header;
mod member;

pub use header::{
    CM_DEFLATE, CompressionLevelHint, GZIP_HEADER_SIZE, GZIP_MAGIC, GzipHeader, GzipOs, flags,
};
pub use member::{GZIP_TRAILER_SIZE, GzipFile, GzipMember, GzipTrailer, decode_members};

use arcpeek_core::DecodeOptions;
use arcpeek_core::error::Result;

/// Decompress a GZIP buffer with strict options.
pub fn decompress(data: &[u8]) -> Result<GzipFile> {
    decode_members(data, DecodeOptions::default())
}

/// Decompress a GZIP buffer.
pub fn decompress_with_options(data: &[u8], options: DecodeOptions) -> Result<GzipFile> {
    decode_members(data, options)
}

/// Parse only the first member's header.
pub fn read_header(data: &[u8]) -> Result<GzipHeader> {
    GzipHeader::parse(data, 0, false)
}
