//! Error types for arcpeek operations.
//!
//! Every failure in the decoding path is a local, synchronous condition on
//! corrupted or unsupported input. Errors carry enough positional context
//! (byte or bit offsets, expected versus found values) for a host to present
//! a useful message; nothing in the library logs or retries them.

use std::io;
use thiserror::Error;

/// The main error type for arcpeek operations.
#[derive(Debug, Error)]
pub enum ArcPeekError {
    /// I/O error while a host loads a buffer. The decoders never perform I/O.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The bit or byte reader ran past the end of the buffer.
    #[error("Unexpected end of stream at byte {offset}: needed {needed} more byte(s)")]
    UnexpectedEndOfStream {
        /// Byte offset at which the read was attempted.
        offset: usize,
        /// Number of bytes that were still required.
        needed: usize,
    },

    /// A Huffman code walked into a missing child, or a code table is invalid.
    #[error("Malformed Huffman code at bit position {bit_position}: {message}")]
    MalformedHuffmanCode {
        /// Bit position where the problem was found.
        bit_position: u64,
        /// Description of the problem.
        message: String,
    },

    /// The DEFLATE stream is structurally invalid.
    #[error("Corrupted stream at byte {offset}: {message}")]
    CorruptedStream {
        /// Byte offset where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// The buffer has no end-of-central-directory record or a bad ZIP signature.
    #[error("Not a ZIP file: {message}")]
    NotAZipFile {
        /// Description of what was missing.
        message: String,
    },

    /// The buffer does not start with the GZIP magic bytes.
    #[error("Not a GZIP file: expected magic [1f, 8b], found {found:02x?}")]
    NotAGzipFile {
        /// Bytes found where the magic was expected.
        found: Vec<u8>,
    },

    /// A local file header disagrees with its central directory entry.
    #[error("Header mismatch for {name}: {field} is {central:#x} in central directory, {local:#x} in local header")]
    HeaderMismatch {
        /// Entry name.
        name: String,
        /// Name of the disagreeing field.
        field: &'static str,
        /// Value recorded in the central directory.
        central: u64,
        /// Value recorded in the local file header.
        local: u64,
    },

    /// Compression method other than stored or deflate.
    #[error("Unsupported compression method: {method}")]
    UnsupportedCompressionMethod {
        /// Human-readable method identifier.
        method: String,
    },

    /// Decoded data does not match its recorded CRC-32.
    #[error("CRC mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    CrcMismatch {
        /// CRC recorded in the container.
        expected: u32,
        /// CRC of the decoded data.
        computed: u32,
    },

    /// The entry is encrypted; decryption is not supported.
    #[error("Entry is encrypted: {name}")]
    EncryptedEntry {
        /// Entry name.
        name: String,
    },

    /// No entry with the requested path exists.
    #[error("Entry not found: {name}")]
    EntryNotFound {
        /// Requested path.
        name: String,
    },

    /// Decoding would produce more output than the configured limit.
    #[error("Output limit exceeded: {limit} bytes")]
    OutputLimitExceeded {
        /// Configured maximum output size.
        limit: usize,
    },
}

/// Fieldless discriminant of [`ArcPeekError`], convenient for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ArcPeekError::Io`].
    Io,
    /// See [`ArcPeekError::UnexpectedEndOfStream`].
    UnexpectedEndOfStream,
    /// See [`ArcPeekError::MalformedHuffmanCode`].
    MalformedHuffmanCode,
    /// See [`ArcPeekError::CorruptedStream`].
    CorruptedStream,
    /// See [`ArcPeekError::NotAZipFile`].
    NotAZipFile,
    /// See [`ArcPeekError::NotAGzipFile`].
    NotAGzipFile,
    /// See [`ArcPeekError::HeaderMismatch`].
    HeaderMismatch,
    /// See [`ArcPeekError::UnsupportedCompressionMethod`].
    UnsupportedCompressionMethod,
    /// See [`ArcPeekError::CrcMismatch`].
    CrcMismatch,
    /// See [`ArcPeekError::EncryptedEntry`].
    EncryptedEntry,
    /// See [`ArcPeekError::EntryNotFound`].
    EntryNotFound,
    /// See [`ArcPeekError::OutputLimitExceeded`].
    OutputLimitExceeded,
}

/// Result type alias for arcpeek operations.
pub type Result<T> = std::result::Result<T, ArcPeekError>;

impl ArcPeekError {
    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::UnexpectedEndOfStream { .. } => ErrorKind::UnexpectedEndOfStream,
            Self::MalformedHuffmanCode { .. } => ErrorKind::MalformedHuffmanCode,
            Self::CorruptedStream { .. } => ErrorKind::CorruptedStream,
            Self::NotAZipFile { .. } => ErrorKind::NotAZipFile,
            Self::NotAGzipFile { .. } => ErrorKind::NotAGzipFile,
            Self::HeaderMismatch { .. } => ErrorKind::HeaderMismatch,
            Self::UnsupportedCompressionMethod { .. } => ErrorKind::UnsupportedCompressionMethod,
            Self::CrcMismatch { .. } => ErrorKind::CrcMismatch,
            Self::EncryptedEntry { .. } => ErrorKind::EncryptedEntry,
            Self::EntryNotFound { .. } => ErrorKind::EntryNotFound,
            Self::OutputLimitExceeded { .. } => ErrorKind::OutputLimitExceeded,
        }
    }

    /// Create an unexpected end of stream error.
    pub fn unexpected_end(offset: usize, needed: usize) -> Self {
        Self::UnexpectedEndOfStream { offset, needed }
    }

    /// Create a malformed Huffman code error.
    pub fn malformed_huffman(bit_position: u64, message: impl Into<String>) -> Self {
        Self::MalformedHuffmanCode {
            bit_position,
            message: message.into(),
        }
    }

    /// Create a corrupted stream error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedStream {
            offset,
            message: message.into(),
        }
    }

    /// Create a not-a-ZIP error.
    pub fn not_a_zip(message: impl Into<String>) -> Self {
        Self::NotAZipFile {
            message: message.into(),
        }
    }

    /// Create a not-a-GZIP error.
    pub fn not_a_gzip(found: impl Into<Vec<u8>>) -> Self {
        Self::NotAGzipFile {
            found: found.into(),
        }
    }

    /// Create a header mismatch error.
    pub fn header_mismatch(
        name: impl Into<String>,
        field: &'static str,
        central: u64,
        local: u64,
    ) -> Self {
        Self::HeaderMismatch {
            name: name.into(),
            field,
            central,
            local,
        }
    }

    /// Create an unsupported method error.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedCompressionMethod {
            method: method.into(),
        }
    }

    /// Create a CRC mismatch error.
    pub fn crc_mismatch(expected: u32, computed: u32) -> Self {
        Self::CrcMismatch { expected, computed }
    }

    /// Create an encrypted entry error.
    pub fn encrypted(name: impl Into<String>) -> Self {
        Self::EncryptedEntry { name: name.into() }
    }

    /// Create an entry not found error.
    pub fn entry_not_found(name: impl Into<String>) -> Self {
        Self::EntryNotFound { name: name.into() }
    }

    /// Create an output limit error.
    pub fn output_limit(limit: usize) -> Self {
        Self::OutputLimitExceeded { limit }
    }
}
