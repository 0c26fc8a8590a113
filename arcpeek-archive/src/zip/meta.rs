//! Interpretation of ZIP header fields: compression methods, general purpose
//! flags, host systems and DOS timestamps.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// ZIP compression methods (APPNOTE 4.4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    /// 0: stored (no compression).
    Stored,
    /// 1: shrunk.
    Shrunk,
    /// 2-5: reduced with compression factor 1-4.
    Reduced(u8),
    /// 6: imploded.
    Imploded,
    /// 8: deflated.
    Deflated,
    /// 9: enhanced deflate (Deflate64).
    Deflate64,
    /// 12: BZIP2.
    Bzip2,
    /// 14: LZMA.
    Lzma,
    /// 93: Zstandard.
    Zstd,
    /// 95: XZ.
    Xz,
    /// 98: PPMd version I, revision 1.
    Ppmd,
    /// 99: AE-x encryption marker.
    Aes,
    /// Any other method id.
    Unknown(u16),
}

impl CompressionMethod {
    /// Create from the method id stored in the headers.
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::Stored,
            1 => Self::Shrunk,
            2..=5 => Self::Reduced((value - 1) as u8),
            6 => Self::Imploded,
            8 => Self::Deflated,
            9 => Self::Deflate64,
            12 => Self::Bzip2,
            14 => Self::Lzma,
            93 => Self::Zstd,
            95 => Self::Xz,
            98 => Self::Ppmd,
            99 => Self::Aes,
            _ => Self::Unknown(value),
        }
    }

    /// The method id as stored in the headers.
    pub fn to_u16(self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Shrunk => 1,
            Self::Reduced(factor) => factor as u16 + 1,
            Self::Imploded => 6,
            Self::Deflated => 8,
            Self::Deflate64 => 9,
            Self::Bzip2 => 12,
            Self::Lzma => 14,
            Self::Zstd => 93,
            Self::Xz => 95,
            Self::Ppmd => 98,
            Self::Aes => 99,
            Self::Unknown(id) => id,
        }
    }

    /// Whether arcpeek can decode entries using this method.
    pub fn is_supported(self) -> bool {
        matches!(self, Self::Stored | Self::Deflated)
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored => write!(f, "Stored"),
            Self::Shrunk => write!(f, "Shrunk"),
            Self::Reduced(factor) => write!(f, "Reduced (factor {})", factor),
            Self::Imploded => write!(f, "Imploded"),
            Self::Deflated => write!(f, "Deflated"),
            Self::Deflate64 => write!(f, "Deflate64"),
            Self::Bzip2 => write!(f, "BZIP2"),
            Self::Lzma => write!(f, "LZMA"),
            Self::Zstd => write!(f, "Zstandard"),
            Self::Xz => write!(f, "XZ"),
            Self::Ppmd => write!(f, "PPMd"),
            Self::Aes => write!(f, "AES encrypted"),
            Self::Unknown(id) => write!(f, "Unknown ({})", id),
        }
    }
}

/// DEFLATE compression option recorded in flag bits 1-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeflateOption {
    /// `00`
    Normal,
    /// `01`
    Maximum,
    /// `10`
    Fast,
    /// `11`
    SuperFast,
}

impl fmt::Display for DeflateOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "Normal",
            Self::Maximum => "Maximum",
            Self::Fast => "Fast",
            Self::SuperFast => "Super Fast",
        })
    }
}

/// General purpose bit flag (APPNOTE 4.4.4).
///
/// Bits 1 and 2 mean different things depending on the compression method,
/// so the method is kept alongside the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneralPurposeFlags {
    bits: u16,
    method: CompressionMethod,
}

impl GeneralPurposeFlags {
    /// Interpret `bits` for an entry compressed with `method`.
    pub fn new(bits: u16, method: CompressionMethod) -> Self {
        Self { bits, method }
    }

    /// The raw flag word.
    pub fn bits(&self) -> u16 {
        self.bits
    }

    fn bit(&self, n: u16) -> bool {
        self.bits & (1 << n) != 0
    }

    /// Bit 0: the entry is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.bit(0)
    }

    /// Bits 1-2 for deflated entries.
    pub fn deflate_option(&self) -> Option<DeflateOption> {
        if !matches!(self.method, CompressionMethod::Deflated | CompressionMethod::Deflate64) {
            return None;
        }
        Some(match (self.bits >> 1) & 0b11 {
            0 => DeflateOption::Normal,
            1 => DeflateOption::Maximum,
            2 => DeflateOption::Fast,
            _ => DeflateOption::SuperFast,
        })
    }

    /// Bit 1 for imploded entries: sliding dictionary size in bytes.
    pub fn implode_dictionary_size(&self) -> Option<u32> {
        (self.method == CompressionMethod::Imploded).then(|| if self.bit(1) { 8192 } else { 4096 })
    }

    /// Bit 2 for imploded entries: number of Shannon-Fano trees.
    pub fn implode_tree_count(&self) -> Option<u8> {
        (self.method == CompressionMethod::Imploded).then(|| if self.bit(2) { 3 } else { 2 })
    }

    /// Bit 1 for LZMA entries: an end-of-stream marker terminates the data.
    pub fn lzma_eos_marker(&self) -> Option<bool> {
        (self.method == CompressionMethod::Lzma).then(|| self.bit(1))
    }

    /// Bit 3: sizes and CRC follow the data in a data descriptor.
    pub fn has_data_descriptor(&self) -> bool {
        self.bit(3)
    }

    /// Bit 5: compressed patched data.
    pub fn is_patched(&self) -> bool {
        self.bit(5)
    }

    /// Bit 6: strong encryption.
    pub fn has_strong_encryption(&self) -> bool {
        self.bit(6)
    }

    /// Bit 11: filename and comment are UTF-8.
    pub fn is_utf8(&self) -> bool {
        self.bit(11)
    }

    /// Bit 13: local header values are masked.
    pub fn is_header_masked(&self) -> bool {
        self.bit(13)
    }

    /// Human-readable names of the set flags.
    pub fn describe(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.is_encrypted() {
            out.push("encrypted".to_string());
        }
        if let Some(option) = self.deflate_option() {
            out.push(format!("deflate: {}", option));
        }
        if let Some(size) = self.implode_dictionary_size() {
            out.push(format!("implode dictionary: {} bytes", size));
        }
        if let Some(trees) = self.implode_tree_count() {
            out.push(format!("Shannon-Fano trees: {}", trees));
        }
        if self.lzma_eos_marker() == Some(true) {
            out.push("LZMA EOS marker".to_string());
        }
        if self.has_data_descriptor() {
            out.push("data descriptor".to_string());
        }
        if self.is_patched() {
            out.push("patched".to_string());
        }
        if self.has_strong_encryption() {
            out.push("strong encryption".to_string());
        }
        if self.is_utf8() {
            out.push("UTF-8".to_string());
        }
        if self.is_header_masked() {
            out.push("masked header".to_string());
        }
        out
    }
}

/// Host system from the high byte of "version made by" (APPNOTE 4.4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostSystem(pub u8);

impl HostSystem {
    /// Split a "version made by" field into host system and spec version.
    pub fn from_version_made_by(version: u16) -> (Self, ZipVersion) {
        (Self((version >> 8) as u8), ZipVersion((version & 0xFF) as u8))
    }

    /// Descriptive name of the host.
    pub fn name(&self) -> &'static str {
        match self.0 {
            0 => "MS-DOS and OS/2",
            1 => "Amiga",
            2 => "OpenVMS",
            3 => "UNIX",
            4 => "VM/CMS",
            5 => "Atari ST",
            6 => "OS/2 H.P.F.S.",
            7 => "Macintosh",
            8 => "Z-System",
            9 => "CP/M",
            10 => "Windows NTFS",
            11 => "MVS (OS/390 - Z/OS)",
            12 => "VSE",
            13 => "Acorn Risc",
            14 => "VFAT",
            15 => "alternate MVS",
            16 => "BeOS",
            17 => "Tandem",
            18 => "OS/400",
            19 => "OS/X (Darwin)",
            _ => "Unused",
        }
    }
}

impl fmt::Display for HostSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ZIP specification version, stored as `major * 10 + minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ZipVersion(pub u8);

impl fmt::Display for ZipVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

/// MS-DOS date and time as stored in ZIP headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DosDateTime {
    /// Year (1980-2107).
    pub year: u16,
    /// Month (1-12).
    pub month: u8,
    /// Day of month (1-31).
    pub day: u8,
    /// Hour (0-23).
    pub hour: u8,
    /// Minute (0-59).
    pub minute: u8,
    /// Second, always even (0-58).
    pub second: u8,
}

impl DosDateTime {
    /// Decode the packed time and date words.
    pub fn from_dos(time: u16, date: u16) -> Self {
        Self {
            year: (date >> 9) + 1980,
            month: ((date >> 5) & 0x0F) as u8,
            day: (date & 0x1F) as u8,
            hour: (time >> 11) as u8,
            minute: ((time >> 5) & 0x3F) as u8,
            second: ((time & 0x1F) * 2) as u8,
        }
    }

    /// The calendar date and time, if every field is in range.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())?.and_hms_opt(
            self.hour.into(),
            self.minute.into(),
            self.second.into(),
        )
    }

    /// Seconds since the Unix epoch, treating the stored time as UTC.
    ///
    /// Returns `None` for impossible dates or times (February 31, hour 31).
    pub fn to_unix_timestamp(&self) -> Option<i64> {
        self.to_naive().map(|dt| dt.and_utc().timestamp())
    }
}

impl fmt::Display for DosDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}
