//! GZIP member header parsing (RFC 1952 section 2.3).

use crate::cursor::ByteCursor;
use arcpeek_core::Crc32;
use arcpeek_core::error::{ArcPeekError, Result};
use std::fmt;

/// GZIP magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// GZIP compression method: DEFLATE.
pub const CM_DEFLATE: u8 = 8;

/// Size of the fixed header part.
pub const GZIP_HEADER_SIZE: usize = 10;

/// GZIP header flags.
pub mod flags {
    /// Text file.
    pub const FTEXT: u8 = 0x01;
    /// Header CRC present.
    pub const FHCRC: u8 = 0x02;
    /// Extra field present.
    pub const FEXTRA: u8 = 0x04;
    /// Original filename present.
    pub const FNAME: u8 = 0x08;
    /// Comment present.
    pub const FCOMMENT: u8 = 0x10;
}

/// Operating system on which the member was compressed (OS byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GzipOs(pub u8);

impl GzipOs {
    /// Descriptive name of the OS id.
    pub fn name(&self) -> &'static str {
        match self.0 {
            0 => "FAT filesystem (MS-DOS, OS/2, NT/Win32)",
            1 => "Amiga",
            2 => "VMS (or OpenVMS)",
            3 => "Unix",
            4 => "VM/CMS",
            5 => "Atari TOS",
            6 => "HPFS filesystem (OS/2, NT)",
            7 => "Macintosh",
            8 => "Z-System",
            9 => "CP/M",
            10 => "TOPS-20",
            11 => "NTFS filesystem (NT)",
            12 => "QDOS",
            13 => "Acorn RISCOS",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for GzipOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compression level hint carried in XFL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevelHint {
    /// XFL = 2: slowest algorithm, maximum compression.
    Maximum,
    /// XFL = 4: fastest algorithm.
    Fast,
    /// Any other value.
    Unknown(u8),
}

impl CompressionLevelHint {
    /// Interpret an XFL byte.
    pub fn from_xfl(xfl: u8) -> Self {
        match xfl {
            2 => Self::Maximum,
            4 => Self::Fast,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for CompressionLevelHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Maximum => write!(f, "Maximum"),
            Self::Fast => write!(f, "Fast"),
            Self::Unknown(xfl) => write!(f, "Unknown ({})", xfl),
        }
    }
}

/// GZIP member header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipHeader {
    /// Offset of the header in the buffer.
    pub offset: usize,
    /// Compression method (8 for DEFLATE; others are reserved).
    pub method: u8,
    /// Flag byte.
    pub flags: u8,
    /// Modification time (Unix timestamp, 0 if unknown).
    pub mtime: u32,
    /// Extra flags.
    pub xfl: u8,
    /// Operating system.
    pub os: GzipOs,
    /// Extra field (if FEXTRA flag set).
    pub extra: Option<Vec<u8>>,
    /// Original filename (if FNAME flag set).
    pub filename: Option<String>,
    /// Comment (if FCOMMENT flag set).
    pub comment: Option<String>,
    /// Header CRC16 (if FHCRC flag set).
    pub header_crc: Option<u16>,
    /// Offset at which the DEFLATE stream starts.
    pub data_offset: usize,
}

impl GzipHeader {
    /// Parse the header starting at `offset`.
    ///
    /// With `verify_crc`, a present FHCRC is checked against the low 16 bits
    /// of the CRC-32 of every header byte before it.
    pub fn parse(data: &[u8], offset: usize, verify_crc: bool) -> Result<Self> {
        let magic = data.get(offset..).unwrap_or_default();
        if !magic.starts_with(&GZIP_MAGIC) {
            return Err(ArcPeekError::not_a_gzip(&magic[..magic.len().min(2)]));
        }

        let mut cursor = ByteCursor::new(data, offset + 2);
        let method = cursor.u8()?;
        let flag_bits = cursor.u8()?;
        let mtime = cursor.u32_le()?;
        let xfl = cursor.u8()?;
        let os = GzipOs(cursor.u8()?);

        let extra = if flag_bits & flags::FEXTRA != 0 {
            let xlen = cursor.u16_le()? as usize;
            Some(cursor.bytes(xlen)?.to_vec())
        } else {
            None
        };

        let filename = if flag_bits & flags::FNAME != 0 {
            Some(latin1(cursor.null_terminated()?))
        } else {
            None
        };

        let comment = if flag_bits & flags::FCOMMENT != 0 {
            Some(latin1(cursor.null_terminated()?))
        } else {
            None
        };

        let header_crc = if flag_bits & flags::FHCRC != 0 {
            let covered = &data[offset..cursor.position()];
            let stored = cursor.u16_le()?;
            if verify_crc {
                let computed = (Crc32::compute(covered) & 0xFFFF) as u16;
                if computed != stored {
                    return Err(ArcPeekError::crc_mismatch(stored as u32, computed as u32));
                }
            }
            Some(stored)
        } else {
            None
        };

        Ok(Self {
            offset,
            method,
            flags: flag_bits,
            mtime,
            xfl,
            os,
            extra,
            filename,
            comment,
            header_crc,
            data_offset: cursor.position(),
        })
    }

    /// Whether FTEXT is set (the content is probably ASCII text).
    pub fn is_text(&self) -> bool {
        self.flags & flags::FTEXT != 0
    }

    /// Whether the compression method is DEFLATE.
    pub fn is_deflate(&self) -> bool {
        self.method == CM_DEFLATE
    }

    /// Compression method as text.
    pub fn method_name(&self) -> String {
        if self.is_deflate() {
            "deflate".to_string()
        } else {
            format!("reserved ({})", self.method)
        }
    }

    /// Compression level hint from XFL.
    pub fn compression_level(&self) -> CompressionLevelHint {
        CompressionLevelHint::from_xfl(self.xfl)
    }

    /// Modification time, if recorded.
    pub fn modified(&self) -> Option<u32> {
        (self.mtime != 0).then_some(self.mtime)
    }
}

/// Decode an ISO-8859-1 header string.
fn latin1(bytes: &[u8]) -> String {
    encoding_rs::mem::decode_latin1(bytes).into_owned()
}
