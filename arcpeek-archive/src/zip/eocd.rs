//! End of central directory records (APPNOTE 4.3.14 - 4.3.16).

use crate::cursor::ByteCursor;
use arcpeek_core::error::{ArcPeekError, Result};

/// End of central directory signature (`PK\x05\x06`).
pub const END_OF_CENTRAL_DIR_SIG: [u8; 4] = [b'P', b'K', 5, 6];

/// Zip64 end of central directory signature (`PK\x06\x06`).
pub const ZIP64_END_OF_CENTRAL_DIR_SIG: [u8; 4] = [b'P', b'K', 6, 6];

/// Zip64 end of central directory locator signature (`PK\x06\x07`).
pub const ZIP64_LOCATOR_SIG: [u8; 4] = [b'P', b'K', 6, 7];

/// Fixed size of the end of central directory record.
pub const EOCD_SIZE: usize = 22;

/// Size of the Zip64 locator record.
pub const ZIP64_LOCATOR_SIZE: usize = 20;

/// Largest possible archive comment.
pub const MAX_COMMENT_SIZE: usize = 65_535;

/// End of central directory, with Zip64 values folded in when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Offset of the record in the buffer.
    pub offset: usize,
    /// Number of this disk.
    pub disk_number: u32,
    /// Disk where the central directory starts.
    pub central_directory_disk: u32,
    /// Central directory records on this disk.
    pub entries_on_disk: u64,
    /// Total central directory records.
    pub total_entries: u64,
    /// Size of the central directory in bytes.
    pub central_directory_size: u64,
    /// Offset of the central directory.
    pub central_directory_offset: u64,
    /// Archive comment.
    pub comment: Vec<u8>,
    /// Whether the counts and offsets came from a Zip64 record.
    pub zip64: bool,
}

impl EndOfCentralDirectory {
    /// Locate and parse the end of central directory in `data`.
    pub fn locate(data: &[u8]) -> Result<Self> {
        let offset = locate_end_of_central_directory(data)?;
        let mut eocd = Self::parse(data, offset)?;

        if eocd.is_saturated() {
            let locator = offset
                .checked_sub(ZIP64_LOCATOR_SIZE)
                .filter(|&at| data[at..].starts_with(&ZIP64_LOCATOR_SIG));
            if let Some(locator_offset) = locator {
                eocd.apply_zip64(data, locator_offset)?;
            }
        }

        log::debug!(
            "EOCD at {}: {} entries, central directory {} bytes at {}{}",
            eocd.offset,
            eocd.total_entries,
            eocd.central_directory_size,
            eocd.central_directory_offset,
            if eocd.zip64 { " (zip64)" } else { "" }
        );
        Ok(eocd)
    }

    /// Parse the 22-byte record at `offset`.
    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        let mut cursor = ByteCursor::new(data, offset);
        if cursor.array::<4>()? != END_OF_CENTRAL_DIR_SIG {
            return Err(ArcPeekError::not_a_zip(format!(
                "no end of central directory signature at offset {}",
                offset
            )));
        }

        let disk_number = cursor.u16_le()? as u32;
        let central_directory_disk = cursor.u16_le()? as u32;
        let entries_on_disk = cursor.u16_le()? as u64;
        let total_entries = cursor.u16_le()? as u64;
        let central_directory_size = cursor.u32_le()? as u64;
        let central_directory_offset = cursor.u32_le()? as u64;
        let comment_len = cursor.u16_le()? as usize;

        // Tolerate a comment length that runs past the end of the buffer
        let available = data.len() - cursor.position();
        let comment = cursor.bytes(comment_len.min(available))?.to_vec();

        Ok(Self {
            offset,
            disk_number,
            central_directory_disk,
            entries_on_disk,
            total_entries,
            central_directory_size,
            central_directory_offset,
            comment,
            zip64: false,
        })
    }

    /// True when any field holds its "see Zip64 record" marker value.
    pub fn is_saturated(&self) -> bool {
        self.total_entries == 0xFFFF
            || self.entries_on_disk == 0xFFFF
            || self.central_directory_size == 0xFFFF_FFFF
            || self.central_directory_offset == 0xFFFF_FFFF
    }

    /// Replace counts and offsets with those of the Zip64 record.
    fn apply_zip64(&mut self, data: &[u8], locator_offset: usize) -> Result<()> {
        // 4.3.15: signature, disk with the zip64 EOCD, offset, total disks
        let mut locator = ByteCursor::new(data, locator_offset + 4);
        let _zip64_disk = locator.u32_le()?;
        let zip64_offset = usize::try_from(locator.u64_le()?).map_err(|_| {
            ArcPeekError::not_a_zip("zip64 end of central directory offset overflows")
        })?;

        let mut record = ByteCursor::new(data, zip64_offset);
        if record.array::<4>()? != ZIP64_END_OF_CENTRAL_DIR_SIG {
            return Err(ArcPeekError::not_a_zip(format!(
                "no zip64 end of central directory signature at offset {}",
                zip64_offset
            )));
        }
        let _record_size = record.u64_le()?;
        let _version_made_by = record.u16_le()?;
        let _version_needed = record.u16_le()?;
        self.disk_number = record.u32_le()?;
        self.central_directory_disk = record.u32_le()?;
        self.entries_on_disk = record.u64_le()?;
        self.total_entries = record.u64_le()?;
        self.central_directory_size = record.u64_le()?;
        self.central_directory_offset = record.u64_le()?;
        self.zip64 = true;
        Ok(())
    }

    /// The archive comment as text.
    pub fn comment_text(&self) -> String {
        String::from_utf8_lossy(&self.comment).into_owned()
    }
}

/// Find the end of central directory signature.
///
/// The record is 22 bytes followed by a comment of at most 65,535 bytes, so
/// the search runs backward from `len - 22` and gives up after the trailing
/// 65,535 + 22 bytes.
pub fn locate_end_of_central_directory(data: &[u8]) -> Result<usize> {
    let Some(last) = data.len().checked_sub(EOCD_SIZE) else {
        return Err(ArcPeekError::not_a_zip(format!(
            "{} bytes is too short for an end of central directory record",
            data.len()
        )));
    };
    let first = data.len().saturating_sub(EOCD_SIZE + MAX_COMMENT_SIZE);

    (first..=last)
        .rev()
        .find(|&i| data[i..].starts_with(&END_OF_CENTRAL_DIR_SIG))
        .ok_or_else(|| ArcPeekError::not_a_zip("end of central directory record not found"))
}
