//! Local file headers and their cross-validation against the central directory.

use super::central::{CentralDirectoryEntry, ZIP64_MARKER_32, Zip64Fields};
use super::meta::CompressionMethod;
use crate::cursor::ByteCursor;
use arcpeek_core::error::{ArcPeekError, Result};

/// Local file header signature (`PK\x03\x04`).
pub const LOCAL_FILE_HEADER_SIG: [u8; 4] = [b'P', b'K', 3, 4];

/// Fixed part of a local file header.
pub const LOCAL_FILE_HEADER_SIZE: usize = 30;

/// A local file header, read only when an entry's content is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    /// Offset of the header in the buffer.
    pub offset: usize,
    /// Minimum version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flag.
    pub flags: u16,
    /// Compression method.
    pub method: CompressionMethod,
    /// DOS last modification time.
    pub last_mod_time: u16,
    /// DOS last modification date.
    pub last_mod_date: u16,
    /// CRC-32 (zero when a data descriptor follows the payload).
    pub crc32: u32,
    /// Compressed size.
    pub compressed_size: u64,
    /// Uncompressed size.
    pub uncompressed_size: u64,
    /// Length of the file name.
    pub name_length: u16,
    /// Length of the extra field.
    pub extra_length: u16,
}

impl LocalFileHeader {
    /// Parse the header at `offset`.
    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let mut cursor = ByteCursor::new(data, offset);
        if cursor.array::<4>()? != LOCAL_FILE_HEADER_SIG {
            return Err(ArcPeekError::not_a_zip(format!(
                "no local file header signature at offset {}",
                offset
            )));
        }

        let version_needed = cursor.u16_le()?;
        let flags = cursor.u16_le()?;
        let method = CompressionMethod::from_u16(cursor.u16_le()?);
        let last_mod_time = cursor.u16_le()?;
        let last_mod_date = cursor.u16_le()?;
        let crc32 = cursor.u32_le()?;
        let compressed_size = cursor.u32_le()?;
        let uncompressed_size = cursor.u32_le()?;
        let name_length = cursor.u16_le()?;
        let extra_length = cursor.u16_le()?;

        // Sizes may live in a Zip64 extra field. A short extra field is left
        // to the payload range check.
        let extra = cursor
            .skip(name_length as usize)
            .and_then(|_| cursor.bytes(extra_length as usize))
            .unwrap_or_default();
        let wide = Zip64Fields::parse(
            extra,
            uncompressed_size == ZIP64_MARKER_32,
            compressed_size == ZIP64_MARKER_32,
            false,
            false,
        );

        Ok(Self {
            offset,
            version_needed,
            flags,
            method,
            last_mod_time,
            last_mod_date,
            crc32,
            compressed_size: wide.compressed_size.unwrap_or(compressed_size as u64),
            uncompressed_size: wide.uncompressed_size.unwrap_or(uncompressed_size as u64),
            name_length,
            extra_length,
        })
    }

    /// Offset of the first payload byte.
    pub fn data_offset(&self) -> usize {
        self.offset
            + LOCAL_FILE_HEADER_SIZE
            + self.name_length as usize
            + self.extra_length as usize
    }

    /// Check that this header describes the same file as `entry`.
    ///
    /// Method, CRC-32, both sizes and the file name length must agree. With
    /// the data descriptor flag set, a local CRC or size of zero means the
    /// real value follows the payload and that field is not compared.
    pub fn validate_against(&self, entry: &CentralDirectoryEntry) -> Result<()> {
        let deferred = entry.flags.has_data_descriptor();
        let mismatch = |field, central: u64, local: u64| {
            ArcPeekError::header_mismatch(entry.name.as_str(), field, central, local)
        };

        if self.method != entry.method {
            return Err(mismatch(
                "compression method",
                entry.method.to_u16() as u64,
                self.method.to_u16() as u64,
            ));
        }

        let checks = [
            ("crc32", entry.crc32 as u64, self.crc32 as u64),
            ("compressed size", entry.compressed_size, self.compressed_size),
            ("uncompressed size", entry.uncompressed_size, self.uncompressed_size),
        ];
        for (field, central, local) in checks {
            if central != local && !(deferred && local == 0) {
                return Err(mismatch(field, central, local));
            }
        }

        if self.name_length as usize != entry.raw_name.len() {
            return Err(mismatch(
                "file name length",
                entry.raw_name.len() as u64,
                self.name_length as u64,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::meta::GeneralPurposeFlags;
    use arcpeek_core::ErrorKind;

    fn local_header(flags: u16, crc: u32, sizes: (u32, u32), name: &str) -> Vec<u8> {
        let mut out = LOCAL_FILE_HEADER_SIG.to_vec();
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&8u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0x21u16.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&sizes.0.to_le_bytes());
        out.extend_from_slice(&sizes.1.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out
    }

    fn central(flags: u16, crc: u32, sizes: (u64, u64), name: &str) -> CentralDirectoryEntry {
        CentralDirectoryEntry {
            record_offset: 0,
            version_made_by: 20,
            version_needed: 20,
            flags: GeneralPurposeFlags::new(flags, CompressionMethod::Deflated),
            method: CompressionMethod::Deflated,
            last_mod_time: 0,
            last_mod_date: 0x21,
            crc32: crc,
            compressed_size: sizes.0,
            uncompressed_size: sizes.1,
            disk_number_start: 0,
            internal_attributes: 0,
            external_attributes: 0,
            local_header_offset: 0,
            raw_name: name.as_bytes().to_vec(),
            name: name.to_string(),
            extra: Vec::new(),
            comment: Vec::new(),
        }
    }

    #[test]
    fn test_parse_and_data_offset() {
        let data = local_header(0, 0x1234, (5, 7), "file.txt");
        let header = LocalFileHeader::parse(&data, 0).unwrap();
        assert_eq!(header.method, CompressionMethod::Deflated);
        assert_eq!(header.compressed_size, 5);
        assert_eq!(header.uncompressed_size, 7);
        assert_eq!(header.data_offset(), 30 + 8);
    }

    #[test]
    fn test_matching_headers() {
        let data = local_header(0, 0x1234, (5, 7), "file.txt");
        let header = LocalFileHeader::parse(&data, 0).unwrap();
        header
            .validate_against(&central(0, 0x1234, (5, 7), "file.txt"))
            .unwrap();
    }

    #[test]
    fn test_crc_mismatch() {
        let data = local_header(0, 0x1234, (5, 7), "file.txt");
        let header = LocalFileHeader::parse(&data, 0).unwrap();
        let err = header
            .validate_against(&central(0, 0x9999, (5, 7), "file.txt"))
            .unwrap_err();
        assert!(matches!(
            err,
            ArcPeekError::HeaderMismatch {
                field: "crc32",
                central: 0x9999,
                local: 0x1234,
                ..
            }
        ));
    }

    #[test]
    fn test_size_and_name_mismatch() {
        let data = local_header(0, 0x1234, (5, 7), "file.txt");
        let header = LocalFileHeader::parse(&data, 0).unwrap();

        let err = header
            .validate_against(&central(0, 0x1234, (6, 7), "file.txt"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HeaderMismatch);

        let err = header
            .validate_against(&central(0, 0x1234, (5, 7), "file2.txt"))
            .unwrap_err();
        assert!(err.to_string().contains("file name length"));
    }

    #[test]
    fn test_data_descriptor_skips_zero_fields() {
        let data = local_header(0x0008, 0, (0, 0), "stream.bin");
        let header = LocalFileHeader::parse(&data, 0).unwrap();
        header
            .validate_against(&central(0x0008, 0xABCD, (10, 20), "stream.bin"))
            .unwrap();

        // Without the flag the same zeros are a mismatch
        let data = local_header(0, 0, (0, 0), "stream.bin");
        let header = LocalFileHeader::parse(&data, 0).unwrap();
        let err = header
            .validate_against(&central(0, 0xABCD, (10, 20), "stream.bin"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HeaderMismatch);
    }

    #[test]
    fn test_bad_signature() {
        let mut data = local_header(0, 0, (0, 0), "x");
        data[3] = 9;
        let err = LocalFileHeader::parse(&data, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAZipFile);
    }
}
