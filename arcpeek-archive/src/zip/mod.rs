//! ZIP archive format support.
//!
//! Reading follows the PKWARE APPNOTE: the end of central directory record
//! is located by a backward scan, the central directory is parsed in full,
//! and each local file header is read and cross-checked against its central
//! record only when that entry is decoded.

mod archive;
mod central;
mod eocd;
mod local;
mod meta;
mod tree;

pub use archive::ZipArchive;
pub use central::{
    CENTRAL_DIR_HEADER_SIG, CentralDirectoryEntry, ExtraFields, Zip64Fields, find_extra_field,
    parse_central_directory_entries,
};
pub use eocd::{
    END_OF_CENTRAL_DIR_SIG, EndOfCentralDirectory, locate_end_of_central_directory,
};
pub use local::{LOCAL_FILE_HEADER_SIG, LocalFileHeader};
pub use meta::{
    CompressionMethod, DeflateOption, DosDateTime, GeneralPurposeFlags, HostSystem, ZipVersion,
};
pub use tree::{ArchiveTree, DirectoryNode, FileNode, TreeListing, TreeNode};

use arcpeek_core::error::Result;

/// Open a ZIP archive and build its directory tree.
pub fn read_zip(data: &[u8]) -> Result<ArchiveTree<'_>> {
    ZipArchive::open(data).map(ArchiveTree::new)
}
