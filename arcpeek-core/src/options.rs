//! Decoding options shared by the inflate engine and the container parsers.

/// How a stored block's LEN / NLEN pair is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoredLengthPolicy {
    /// NLEN must be the one's complement of LEN, otherwise the stream is
    /// rejected as corrupted.
    #[default]
    Strict,
    /// NLEN is read and ignored; LEN alone decides the copy length.
    Lenient,
}

/// Decoding configuration.
///
/// [`DecodeOptions::STRICT`] is the default. [`DecodeOptions::LENIENT`]
/// decodes whatever can be decoded: stored-block complements are ignored and
/// no CRC or trailer is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Stored block LEN / NLEN policy.
    pub stored_length: StoredLengthPolicy,
    /// Verify CRC-32 values (ZIP entries, GZIP trailer and header CRC).
    pub verify_checksums: bool,
    /// Upper bound on the number of bytes one decode may produce.
    pub max_output_size: Option<usize>,
}

impl DecodeOptions {
    /// Fail fast on any inconsistency.
    pub const STRICT: Self = Self {
        stored_length: StoredLengthPolicy::Strict,
        verify_checksums: true,
        max_output_size: None,
    };

    /// Best-effort decoding without integrity checks.
    pub const LENIENT: Self = Self {
        stored_length: StoredLengthPolicy::Lenient,
        verify_checksums: false,
        max_output_size: None,
    };

    /// Create the default (strict) options.
    pub fn new() -> Self {
        Self::STRICT
    }

    /// Set the stored block policy.
    pub fn stored_length(mut self, policy: StoredLengthPolicy) -> Self {
        self.stored_length = policy;
        self
    }

    /// Enable or disable checksum verification.
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Cap the decoded size of a single entry or member.
    pub fn max_output_size(mut self, limit: Option<usize>) -> Self {
        self.max_output_size = limit;
        self
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::STRICT
    }
}
