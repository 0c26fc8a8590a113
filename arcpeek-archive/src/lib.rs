//! # arcpeek Archive
//!
//! Container format support for arcpeek.
//!
//! - **ZIP**: end of central directory (with Zip64), central directory,
//!   local header cross-validation, and a directory tree with lazily
//!   decoded, memoized file contents
//! - **GZIP**: member headers, multi-member files, CRC-32 / ISIZE trailers
//!
//! Both parsers work on a buffer that is already fully in memory and hand
//! their DEFLATE payloads to `arcpeek-inflate`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use arcpeek_archive::detect::ArchiveFormat;
//! use arcpeek_archive::zip::read_zip;
//!
//! let data = std::fs::read("archive.zip").unwrap();
//! assert_eq!(ArchiveFormat::from_magic(&data), ArchiveFormat::Zip);
//!
//! let tree = read_zip(&data).unwrap();
//! for path in tree.files() {
//!     let content = tree.read(&path).unwrap();
//!     println!("{}: {} bytes", path, content.len());
//! }
//! ```
//!
//! ## Features
//!
//! - `parallel`: decode all entries of an archive on the rayon thread pool
//!   ([`ZipArchive::decode_all_parallel`], [`ArchiveTree::read_all_parallel`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cursor;
pub mod detect;
pub mod gzip;
pub mod zip;

// Re-exports
pub use detect::ArchiveFormat;
pub use gzip::{GzipFile, GzipHeader};
pub use zip::{ArchiveTree, CentralDirectoryEntry, TreeListing, TreeNode, ZipArchive};
