//! # arcpeek Core
//!
//! Core components shared by the arcpeek crates:
//!
//! - [`bitstream`]: forward-only bit reader over an in-memory buffer
//! - [`crc`]: CRC-32 checksum
//! - [`options`]: decoding configuration
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! arcpeek is a layered decoder stack. Everything operates on a buffer that
//! is already fully resident in memory.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L4: Host                                                │
//! │     arcpeek CLI                                         │
//! ├─────────────────────────────────────────────────────────┤
//! │ L3: Container                                           │
//! │     ZIP central directory + tree, GZIP members          │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Codec                                               │
//! │     Inflate (canonical Huffman + LZ77 replay)           │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: BitStream (this crate)                              │
//! │     BitReader, CRC-32, options, errors                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use arcpeek_core::bitstream::BitReader;
//! use arcpeek_core::crc::Crc32;
//!
//! let data = [0xAB, 0xCD];
//! let mut reader = BitReader::new(&data);
//! assert_eq!(reader.read_bits(12).unwrap(), 0xDAB);
//!
//! assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod crc;
pub mod error;
pub mod options;

// Re-exports for convenience
pub use bitstream::BitReader;
pub use crc::Crc32;
pub use error::{ArcPeekError, ErrorKind, Result};
pub use options::{DecodeOptions, StoredLengthPolicy};
