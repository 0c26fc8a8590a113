//! # arcpeek Inflate
//!
//! DEFLATE decompression (RFC 1951) for the arcpeek container parsers.
//!
//! All three block types are supported:
//! - Stored (uncompressed) blocks
//! - Fixed Huffman codes
//! - Dynamic Huffman codes
//!
//! Huffman codes are decoded with an explicit binary tree kept in an arena
//! ([`huffman::HuffmanTree`]), walked one bit at a time.
//!
//! ## Example
//!
//! ```rust
//! use arcpeek_inflate::inflate;
//!
//! // Stored block holding "Hello"
//! let compressed = [0x01, 0x05, 0x00, 0xFA, 0xFF, b'H', b'e', b'l', b'l', b'o'];
//! assert_eq!(inflate(&compressed).unwrap(), b"Hello");
//! ```
//!
//! Container formats that carry data after the DEFLATE stream use
//! [`inflate_stream`], which also reports how many input bytes the stream
//! occupied.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod dynamic;
pub mod huffman;
pub mod inflate;
pub mod tables;

// Re-exports
pub use huffman::{HuffmanCode, HuffmanNode, HuffmanTree};
pub use inflate::{
    BlockHeader, BlockKind, Inflated, Inflater, inflate, inflate_stream, inflate_with_options,
};
