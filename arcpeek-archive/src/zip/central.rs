//! Central directory file headers (APPNOTE 4.3.12).

use super::eocd::EndOfCentralDirectory;
use super::meta::{CompressionMethod, DosDateTime, GeneralPurposeFlags, HostSystem, ZipVersion};
use crate::cursor::ByteCursor;
use arcpeek_core::error::{ArcPeekError, Result};

/// Central directory file header signature (`PK\x01\x02`).
pub const CENTRAL_DIR_HEADER_SIG: [u8; 4] = [b'P', b'K', 1, 2];

/// Fixed part of a central directory record.
pub const CENTRAL_DIR_HEADER_SIZE: usize = 46;

/// Zip64 extended information extra field id.
pub const ZIP64_EXTRA_FIELD_ID: u16 = 0x0001;

/// Value of a 32-bit field whose real value lives in the Zip64 extra field.
pub const ZIP64_MARKER_32: u32 = 0xFFFF_FFFF;

/// Value of a 16-bit field whose real value lives in the Zip64 extra field.
pub const ZIP64_MARKER_16: u16 = 0xFFFF;

/// One record of the central directory.
///
/// Sizes and the local header offset are already widened from the Zip64
/// extra field when the 32-bit fields were saturated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryEntry {
    /// Offset of this record in the buffer.
    pub record_offset: usize,
    /// Raw "version made by".
    pub version_made_by: u16,
    /// Minimum version needed to extract.
    pub version_needed: u16,
    /// General purpose bit flag.
    pub flags: GeneralPurposeFlags,
    /// Compression method.
    pub method: CompressionMethod,
    /// DOS last modification time.
    pub last_mod_time: u16,
    /// DOS last modification date.
    pub last_mod_date: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Compressed size.
    pub compressed_size: u64,
    /// Uncompressed size.
    pub uncompressed_size: u64,
    /// Disk on which the entry starts.
    pub disk_number_start: u32,
    /// Internal file attributes.
    pub internal_attributes: u16,
    /// External file attributes (host dependent).
    pub external_attributes: u32,
    /// Offset of the local file header in the buffer.
    pub local_header_offset: u64,
    /// File name bytes as stored.
    pub raw_name: Vec<u8>,
    /// File name decoded for display and tree building.
    pub name: String,
    /// Extra field.
    pub extra: Vec<u8>,
    /// File comment bytes.
    pub comment: Vec<u8>,
}

impl CentralDirectoryEntry {
    /// Parse the record starting at `offset`.
    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let mut cursor = ByteCursor::new(data, offset);
        if cursor.array::<4>()? != CENTRAL_DIR_HEADER_SIG {
            return Err(ArcPeekError::not_a_zip(format!(
                "no central directory signature at offset {}",
                offset
            )));
        }

        let version_made_by = cursor.u16_le()?;
        let version_needed = cursor.u16_le()?;
        let flag_bits = cursor.u16_le()?;
        let method = CompressionMethod::from_u16(cursor.u16_le()?);
        let last_mod_time = cursor.u16_le()?;
        let last_mod_date = cursor.u16_le()?;
        let crc32 = cursor.u32_le()?;
        let compressed_size = cursor.u32_le()?;
        let uncompressed_size = cursor.u32_le()?;
        let name_len = cursor.u16_le()? as usize;
        let extra_len = cursor.u16_le()? as usize;
        let comment_len = cursor.u16_le()? as usize;
        let disk_number_start = cursor.u16_le()?;
        let internal_attributes = cursor.u16_le()?;
        let external_attributes = cursor.u32_le()?;
        let local_header_offset = cursor.u32_le()?;

        let raw_name = cursor.bytes(name_len)?.to_vec();
        let extra = cursor.bytes(extra_len)?.to_vec();
        let comment = cursor.bytes(comment_len)?.to_vec();

        let wide = Zip64Fields::parse(
            &extra,
            uncompressed_size == ZIP64_MARKER_32,
            compressed_size == ZIP64_MARKER_32,
            local_header_offset == ZIP64_MARKER_32,
            disk_number_start == ZIP64_MARKER_16,
        );

        Ok(Self {
            record_offset: offset,
            version_made_by,
            version_needed,
            flags: GeneralPurposeFlags::new(flag_bits, method),
            method,
            last_mod_time,
            last_mod_date,
            crc32,
            compressed_size: wide.compressed_size.unwrap_or(compressed_size as u64),
            uncompressed_size: wide.uncompressed_size.unwrap_or(uncompressed_size as u64),
            disk_number_start: wide.disk_number_start.unwrap_or(disk_number_start as u32),
            internal_attributes,
            external_attributes,
            local_header_offset: wide.local_header_offset.unwrap_or(local_header_offset as u64),
            name: String::from_utf8_lossy(&raw_name).into_owned(),
            raw_name,
            extra,
            comment,
        })
    }

    /// Size of this record including its variable-length fields.
    pub fn record_size(&self) -> usize {
        CENTRAL_DIR_HEADER_SIZE + self.raw_name.len() + self.extra.len() + self.comment.len()
    }

    /// Blocks of the extra field, in stored order.
    pub fn extra_fields(&self) -> ExtraFields<'_> {
        ExtraFields::new(&self.extra)
    }

    /// The file comment as text.
    pub fn comment_text(&self) -> String {
        String::from_utf8_lossy(&self.comment).into_owned()
    }

    /// Host system that created the entry.
    pub fn host_system(&self) -> HostSystem {
        HostSystem::from_version_made_by(self.version_made_by).0
    }

    /// ZIP specification version the creator supports.
    pub fn made_by_version(&self) -> ZipVersion {
        HostSystem::from_version_made_by(self.version_made_by).1
    }

    /// Decoded modification timestamp.
    pub fn modified(&self) -> DosDateTime {
        DosDateTime::from_dos(self.last_mod_time, self.last_mod_date)
    }

    /// Names ending in `/` are explicit directory entries.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Unix permission bits, when the entry was made on a Unix host.
    pub fn unix_mode(&self) -> Option<u32> {
        (self.host_system().0 == 3 && self.external_attributes >> 16 != 0)
            .then_some(self.external_attributes >> 16)
    }
}

/// Parse every central directory record named by `eocd`.
///
/// Records are read back to back from the central directory offset; each
/// advances the cursor by 46 bytes plus its name, extra and comment lengths.
pub fn parse_central_directory_entries(
    data: &[u8],
    eocd: &EndOfCentralDirectory,
) -> Result<Vec<CentralDirectoryEntry>> {
    let mut offset = usize::try_from(eocd.central_directory_offset).map_err(|_| {
        ArcPeekError::not_a_zip(format!(
            "central directory offset {} overflows",
            eocd.central_directory_offset
        ))
    })?;

    // Each record needs at least 46 bytes, which bounds the preallocation
    let capacity = (eocd.total_entries as usize).min(data.len() / CENTRAL_DIR_HEADER_SIZE);
    let mut entries = Vec::with_capacity(capacity);

    for _ in 0..eocd.total_entries {
        let entry = CentralDirectoryEntry::parse(data, offset)?;
        log::trace!(
            "central entry {:?}: {}, {} -> {} bytes, local header at {}",
            entry.name,
            entry.method,
            entry.compressed_size,
            entry.uncompressed_size,
            entry.local_header_offset
        );
        offset += entry.record_size();
        entries.push(entry);
    }

    log::debug!("parsed {} central directory entries", entries.len());
    Ok(entries)
}

/// Values widened by a Zip64 extended information extra field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Zip64Fields {
    /// Uncompressed size.
    pub uncompressed_size: Option<u64>,
    /// Compressed size.
    pub compressed_size: Option<u64>,
    /// Local header offset.
    pub local_header_offset: Option<u64>,
    /// Starting disk number.
    pub disk_number_start: Option<u32>,
}

impl Zip64Fields {
    /// Read the Zip64 extra field (id 0x0001) out of `extra`.
    ///
    /// The field holds only the values whose header fields were saturated,
    /// always in the order uncompressed size, compressed size, local header
    /// offset, disk number (APPNOTE 4.5.3). Missing or short fields leave
    /// the corresponding value unset.
    pub fn parse(
        extra: &[u8],
        uncompressed: bool,
        compressed: bool,
        header_offset: bool,
        disk: bool,
    ) -> Self {
        let mut fields = Self::default();
        if !(uncompressed || compressed || header_offset || disk) {
            return fields;
        }

        let Some(body) = find_extra_field(extra, ZIP64_EXTRA_FIELD_ID) else {
            return fields;
        };
        let mut cursor = ByteCursor::new(body, 0);

        if uncompressed {
            fields.uncompressed_size = cursor.u64_le().ok();
        }
        if compressed {
            fields.compressed_size = cursor.u64_le().ok();
        }
        if header_offset {
            fields.local_header_offset = cursor.u64_le().ok();
        }
        if disk {
            fields.disk_number_start = cursor.u32_le().ok();
        }
        fields
    }
}

/// Iterator over the `(header id, body)` blocks of an extra field.
///
/// Iteration stops at the first block whose declared size runs past the
/// end of the field.
#[derive(Debug, Clone)]
pub struct ExtraFields<'a> {
    cursor: ByteCursor<'a>,
}

impl<'a> ExtraFields<'a> {
    /// Walk the blocks of `extra`.
    pub fn new(extra: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor::new(extra, 0),
        }
    }
}

impl<'a> Iterator for ExtraFields<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let block = (|| {
            let header_id = self.cursor.u16_le().ok()?;
            let size = self.cursor.u16_le().ok()?;
            let body = self.cursor.bytes(size as usize).ok()?;
            Some((header_id, body))
        })();
        if block.is_none() {
            self.cursor = ByteCursor::new(&[], 0);
        }
        block
    }
}

impl std::iter::FusedIterator for ExtraFields<'_> {}

/// Body of the first extra field block with the given header id.
pub fn find_extra_field(extra: &[u8], id: u16) -> Option<&[u8]> {
    ExtraFields::new(extra).find_map(|(header_id, body)| (header_id == id).then_some(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcpeek_core::ErrorKind;

    fn record(name: &str, extra: &[u8], sizes: (u32, u32), offset: u32) -> Vec<u8> {
        let mut out = CENTRAL_DIR_HEADER_SIG.to_vec();
        out.extend_from_slice(&0x031Eu16.to_le_bytes()); // made by UNIX, 3.0
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0x0800u16.to_le_bytes()); // UTF-8
        out.extend_from_slice(&8u16.to_le_bytes());
        out.extend_from_slice(&0x6000u16.to_le_bytes());
        out.extend_from_slice(&0x5221u16.to_le_bytes());
        out.extend_from_slice(&0xDEADBEEFu32.to_le_bytes());
        out.extend_from_slice(&sizes.0.to_le_bytes());
        out.extend_from_slice(&sizes.1.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&(0o100644u32 << 16).to_le_bytes());
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(extra);
        out.extend_from_slice(b"hi");
        out
    }

    #[test]
    fn test_parse_record() {
        let data = record("dir/b.txt", &[], (40, 110), 1234);
        let entry = CentralDirectoryEntry::parse(&data, 0).unwrap();

        assert_eq!(entry.name, "dir/b.txt");
        assert_eq!(entry.method, CompressionMethod::Deflated);
        assert_eq!(entry.crc32, 0xDEADBEEF);
        assert_eq!(entry.compressed_size, 40);
        assert_eq!(entry.uncompressed_size, 110);
        assert_eq!(entry.local_header_offset, 1234);
        assert_eq!(entry.comment_text(), "hi");
        assert_eq!(entry.record_size(), data.len());
        assert_eq!(entry.host_system().name(), "UNIX");
        assert_eq!(entry.made_by_version().to_string(), "3.0");
        assert_eq!(entry.unix_mode(), Some(0o100644));
        assert!(entry.flags.is_utf8());
        assert!(!entry.is_dir());
        assert_eq!(entry.modified().to_string(), "2021-01-01 12:00:00");
    }

    #[test]
    fn test_zip64_extra() {
        let mut extra = Vec::new();
        // Unrelated extended timestamp field first
        extra.extend_from_slice(&0x5455u16.to_le_bytes());
        extra.extend_from_slice(&5u16.to_le_bytes());
        extra.extend_from_slice(&[1, 0, 0, 0, 0]);
        extra.extend_from_slice(&ZIP64_EXTRA_FIELD_ID.to_le_bytes());
        extra.extend_from_slice(&24u16.to_le_bytes());
        extra.extend_from_slice(&5_000_000_000u64.to_le_bytes());
        extra.extend_from_slice(&4_500_000_000u64.to_le_bytes());
        extra.extend_from_slice(&7_000_000_000u64.to_le_bytes());

        let data = record("big.bin", &extra, (ZIP64_MARKER_32, ZIP64_MARKER_32), ZIP64_MARKER_32);
        let entry = CentralDirectoryEntry::parse(&data, 0).unwrap();
        assert_eq!(entry.uncompressed_size, 5_000_000_000);
        assert_eq!(entry.compressed_size, 4_500_000_000);
        assert_eq!(entry.local_header_offset, 7_000_000_000);
    }

    #[test]
    fn test_zip64_partial() {
        // Only the compressed size is saturated, so it is the first value
        let mut extra = ZIP64_EXTRA_FIELD_ID.to_le_bytes().to_vec();
        extra.extend_from_slice(&8u16.to_le_bytes());
        extra.extend_from_slice(&4_294_967_296u64.to_le_bytes());

        let fields = Zip64Fields::parse(&extra, false, true, false, false);
        assert_eq!(fields.compressed_size, Some(4_294_967_296));
        assert_eq!(fields.uncompressed_size, None);
    }

    #[test]
    fn test_bad_signature() {
        let mut data = record("a", &[], (1, 1), 0);
        data[2] = 3;
        let err = CentralDirectoryEntry::parse(&data, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAZipFile);
    }

    #[test]
    fn test_truncated_record() {
        let data = record("name.txt", &[], (1, 1), 0);
        let err = CentralDirectoryEntry::parse(&data[..50], 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEndOfStream);
    }

    #[test]
    fn test_find_extra_field() {
        let extra = [0x01, 0x00, 0x02, 0x00, 0xAA, 0xBB, 0x55, 0x54, 0x00, 0x00];
        assert_eq!(find_extra_field(&extra, 0x0001), Some(&[0xAA, 0xBB][..]));
        assert_eq!(find_extra_field(&extra, 0x5455), Some(&[][..]));
        assert_eq!(find_extra_field(&extra, 0x7875), None);
        // Truncated block
        assert_eq!(find_extra_field(&[0x01, 0x00, 0x09, 0x00, 0xAA], 0x0001), None);
    }

    #[test]
    fn test_extra_fields_iteration() {
        let mut extra = Vec::new();
        extra.extend_from_slice(&0x5455u16.to_le_bytes());
        extra.extend_from_slice(&5u16.to_le_bytes());
        extra.extend_from_slice(&[1, 0x80, 0x96, 0x98, 0x00]);
        extra.extend_from_slice(&0x7875u16.to_le_bytes());
        extra.extend_from_slice(&0u16.to_le_bytes());
        // Declares 8 bytes but only 2 follow
        extra.extend_from_slice(&0x000Au16.to_le_bytes());
        extra.extend_from_slice(&8u16.to_le_bytes());
        extra.extend_from_slice(&[0, 0]);

        let data = record("t.txt", &extra, (1, 1), 0);
        let entry = CentralDirectoryEntry::parse(&data, 0).unwrap();
        let fields: Vec<_> = entry.extra_fields().collect();
        assert_eq!(
            fields,
            vec![(0x5455, &[1, 0x80, 0x96, 0x98, 0x00][..]), (0x7875, &[][..])]
        );

        assert_eq!(ExtraFields::new(&[]).count(), 0);
        assert_eq!(ExtraFields::new(&[0x01]).count(), 0);
    }
}
