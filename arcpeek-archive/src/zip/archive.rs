//! ZIP archive over an in-memory buffer.

use super::central::{CentralDirectoryEntry, parse_central_directory_entries};
use super::eocd::EndOfCentralDirectory;
use super::local::{LOCAL_FILE_HEADER_SIZE, LocalFileHeader};
use super::meta::CompressionMethod;
use super::tree::ArchiveTree;
use arcpeek_core::error::{ArcPeekError, Result};
use arcpeek_core::{Crc32, DecodeOptions};
use arcpeek_inflate::inflate_with_options;

/// A parsed ZIP archive.
///
/// Opening reads the end of central directory and every central directory
/// record. Local headers and payloads are only touched by
/// [`decode_entry`](Self::decode_entry).
#[derive(Debug, Clone)]
pub struct ZipArchive<'a> {
    data: &'a [u8],
    eocd: EndOfCentralDirectory,
    entries: Vec<CentralDirectoryEntry>,
    options: DecodeOptions,
}

impl<'a> ZipArchive<'a> {
    /// Open an archive with strict options.
    pub fn open(data: &'a [u8]) -> Result<Self> {
        Self::open_with_options(data, DecodeOptions::default())
    }

    /// Open an archive.
    pub fn open_with_options(data: &'a [u8], options: DecodeOptions) -> Result<Self> {
        let eocd = EndOfCentralDirectory::locate(data)?;
        let entries = parse_central_directory_entries(data, &eocd)?;
        Ok(Self {
            data,
            eocd,
            entries,
            options,
        })
    }

    /// The raw archive bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// End of central directory record.
    pub fn eocd(&self) -> &EndOfCentralDirectory {
        &self.eocd
    }

    /// Central directory entries in archive order.
    pub fn entries(&self) -> &[CentralDirectoryEntry] {
        &self.entries
    }

    /// Options used for decoding.
    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry with exactly this name.
    pub fn entry_by_name(&self, name: &str) -> Option<&CentralDirectoryEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Decode the entry with this name.
    pub fn decode_by_name(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .entry_by_name(name)
            .ok_or_else(|| ArcPeekError::entry_not_found(name))?;
        self.decode_entry(entry)
    }

    /// Decode one entry.
    ///
    /// The local header is parsed and cross-validated first. Stored entries
    /// are copied, deflated entries are inflated, and the CRC-32 of the
    /// result is checked when verification is on.
    pub fn decode_entry(&self, entry: &CentralDirectoryEntry) -> Result<Vec<u8>> {
        let header_offset = usize::try_from(entry.local_header_offset)
            .map_err(|_| ArcPeekError::unexpected_end(self.data.len(), LOCAL_FILE_HEADER_SIZE))?;
        let local = LocalFileHeader::parse(self.data, header_offset)?;
        local.validate_against(entry)?;

        if entry.flags.is_encrypted() {
            return Err(ArcPeekError::encrypted(entry.name.as_str()));
        }

        let payload = self.payload(&local, entry)?;
        log::debug!(
            "decoding {:?}: {} bytes at {} ({})",
            entry.name,
            payload.len(),
            local.data_offset(),
            entry.method
        );

        let data = match entry.method {
            CompressionMethod::Stored => {
                if let Some(limit) = self.options.max_output_size {
                    if payload.len() > limit {
                        return Err(ArcPeekError::output_limit(limit));
                    }
                }
                payload.to_vec()
            }
            CompressionMethod::Deflated => inflate_with_options(payload, self.options)?,
            other => {
                return Err(ArcPeekError::unsupported_method(format!(
                    "ZIP method {} ({})",
                    other.to_u16(),
                    other
                )));
            }
        };

        if self.options.verify_checksums {
            let computed = Crc32::compute(&data);
            if computed != entry.crc32 {
                return Err(ArcPeekError::crc_mismatch(entry.crc32, computed));
            }
        }

        Ok(data)
    }

    /// Decode every entry in archive order.
    pub fn decode_all(&self) -> Vec<Result<Vec<u8>>> {
        self.entries
            .iter()
            .map(|entry| self.decode_entry(entry))
            .collect()
    }

    /// Decode every entry on the rayon thread pool.
    ///
    /// Results are in archive order, identical to [`decode_all`](Self::decode_all).
    #[cfg(feature = "parallel")]
    pub fn decode_all_parallel(&self) -> Vec<Result<Vec<u8>>> {
        use rayon::prelude::*;

        self.entries
            .par_iter()
            .map(|entry| self.decode_entry(entry))
            .collect()
    }

    /// Build the directory tree of this archive.
    pub fn into_tree(self) -> ArchiveTree<'a> {
        ArchiveTree::new(self)
    }

    /// Compressed payload of an entry.
    fn payload(&self, local: &LocalFileHeader, entry: &CentralDirectoryEntry) -> Result<&'a [u8]> {
        let start = local.data_offset();
        let len = usize::try_from(entry.compressed_size).unwrap_or(usize::MAX);
        let available = self.data.len().saturating_sub(start);
        if len > available {
            return Err(ArcPeekError::unexpected_end(
                start.min(self.data.len()),
                len - available,
            ));
        }
        Ok(&self.data[start..start + len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcpeek_core::ErrorKind;

    /// Single-entry archive with a stored payload.
    fn stored_zip(name: &str, payload: &[u8], flags: u16, method: u16) -> Vec<u8> {
        let crc = Crc32::compute(payload);
        let mut out = Vec::new();

        out.extend_from_slice(b"PK\x03\x04");
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&[0, 0, 0x21, 0]);
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(payload);

        let cd_offset = out.len();
        out.extend_from_slice(b"PK\x01\x02");
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&[0, 0, 0x21, 0]);
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&[0; 12]);
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        let cd_size = out.len() - cd_offset;

        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&(cd_size as u32).to_le_bytes());
        out.extend_from_slice(&(cd_offset as u32).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    #[test]
    fn test_open_and_decode_stored() {
        let data = stored_zip("a.txt", b"hi", 0, 0);
        let archive = ZipArchive::open(&data).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.entries()[0].name, "a.txt");
        assert_eq!(archive.decode_by_name("a.txt").unwrap(), b"hi");
    }

    #[test]
    fn test_entry_not_found() {
        let data = stored_zip("a.txt", b"hi", 0, 0);
        let archive = ZipArchive::open(&data).unwrap();
        let err = archive.decode_by_name("b.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EntryNotFound);
    }

    #[test]
    fn test_encrypted_entry() {
        let data = stored_zip("secret.txt", b"xx", 0x0001, 0);
        let archive = ZipArchive::open(&data).unwrap();
        let err = archive.decode_by_name("secret.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EncryptedEntry);
    }

    #[test]
    fn test_unsupported_method() {
        let data = stored_zip("a.bz2", b"BZh", 0, 12);
        let archive = ZipArchive::open(&data).unwrap();
        let err = archive.decode_by_name("a.bz2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedCompressionMethod);
        assert!(err.to_string().contains("ZIP method 12 (BZIP2)"));
    }

    #[test]
    fn test_crc_verified() {
        let mut data = stored_zip("a.txt", b"hi", 0, 0);
        // Corrupt the payload, leaving both headers consistent
        let payload_at = 30 + 5;
        data[payload_at] = b'H';

        let archive = ZipArchive::open(&data).unwrap();
        let err = archive.decode_by_name("a.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CrcMismatch);

        let archive = ZipArchive::open_with_options(&data, DecodeOptions::LENIENT).unwrap();
        assert_eq!(archive.decode_by_name("a.txt").unwrap(), b"Hi");
    }

    #[test]
    fn test_stored_output_limit() {
        let data = stored_zip("a.txt", b"hello", 0, 0);
        let options = DecodeOptions::new().max_output_size(Some(4));
        let archive = ZipArchive::open_with_options(&data, options).unwrap();
        let err = archive.decode_by_name("a.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutputLimitExceeded);
    }

    #[test]
    fn test_decode_all() {
        let data = stored_zip("a.txt", b"hi", 0, 0);
        let archive = ZipArchive::open(&data).unwrap();
        let results = archive.decode_all();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap(), b"hi");
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_decode_all_parallel() {
        let data = stored_zip("a.txt", b"hi", 0, 0);
        let archive = ZipArchive::open(&data).unwrap();
        let results = archive.decode_all_parallel();
        assert_eq!(results[0].as_ref().unwrap(), b"hi");
    }
}
