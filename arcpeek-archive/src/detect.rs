//! Container format detection from magic bytes.

/// Container formats arcpeek can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// ZIP archive (.zip, .jar, .docx, ...).
    Zip,
    /// GZIP compressed file (.gz).
    Gzip,
    /// Anything else.
    Unknown,
}

impl ArchiveFormat {
    /// Detect the format from the first bytes of a buffer.
    ///
    /// ZIP is recognized by `PK` followed by a local file header
    /// (`03 04`), an empty archive's end of central directory (`05 06`) or a
    /// spanning marker (`07 08`). GZIP by `1F 8B`.
    pub fn from_magic(magic: &[u8]) -> Self {
        match magic {
            [0x50, 0x4B, 0x03, 0x04, ..]
            | [0x50, 0x4B, 0x05, 0x06, ..]
            | [0x50, 0x4B, 0x07, 0x08, ..] => Self::Zip,
            [0x1F, 0x8B, ..] => Self::Gzip,
            _ => Self::Unknown,
        }
    }

    /// Typical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Gzip => "gz",
            Self::Unknown => "",
        }
    }

    /// MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Zip => "application/zip",
            Self::Gzip => "application/gzip",
            Self::Unknown => "application/octet-stream",
        }
    }

    /// True for formats that hold several named entries.
    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Zip)
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zip => write!(f, "ZIP"),
            Self::Gzip => write!(f, "GZIP"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}
