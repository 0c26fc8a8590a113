//! GZIP member decoding: header, DEFLATE payload and trailer.

use super::header::{GZIP_MAGIC, GzipHeader};
use arcpeek_core::error::{ArcPeekError, ErrorKind, Result};
use arcpeek_core::{Crc32, DecodeOptions};
use arcpeek_inflate::inflate_stream;

/// Size of the CRC-32 + ISIZE trailer.
pub const GZIP_TRAILER_SIZE: usize = 8;

/// The CRC-32 and ISIZE values that close a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipTrailer {
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Uncompressed size modulo 2^32.
    pub isize: u32,
}

/// One decoded member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipMember {
    /// Member header.
    pub header: GzipHeader,
    /// Decompressed bytes.
    pub data: Vec<u8>,
    /// Trailer, absent when the buffer ended right after the DEFLATE stream
    /// and verification was off.
    pub trailer: Option<GzipTrailer>,
    /// Offset just past this member.
    pub end: usize,
}

impl GzipMember {
    /// Decode the member starting at `offset`.
    pub fn decode(data: &[u8], offset: usize, options: DecodeOptions) -> Result<Self> {
        let header = GzipHeader::parse(data, offset, options.verify_checksums)?;
        if !header.is_deflate() {
            return Err(ArcPeekError::unsupported_method(format!(
                "GZIP method {} (reserved)",
                header.method
            )));
        }

        let payload = data.get(header.data_offset..).unwrap_or_default();
        let inflated = inflate_stream(payload, options)?;
        let trailer_offset = header.data_offset + inflated.consumed;
        log::debug!(
            "gzip member at {}: {} compressed bytes -> {} bytes",
            offset,
            inflated.consumed,
            inflated.data.len()
        );

        let trailer = match data.get(trailer_offset..trailer_offset + GZIP_TRAILER_SIZE) {
            Some(bytes) => Some(GzipTrailer {
                crc32: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
                isize: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            }),
            None if options.verify_checksums => {
                return Err(ArcPeekError::unexpected_end(
                    trailer_offset,
                    trailer_offset + GZIP_TRAILER_SIZE - data.len(),
                ));
            }
            None => None,
        };

        if options.verify_checksums {
            if let Some(trailer) = trailer {
                let computed = Crc32::compute(&inflated.data);
                if computed != trailer.crc32 {
                    return Err(ArcPeekError::crc_mismatch(trailer.crc32, computed));
                }
                if inflated.data.len() as u32 != trailer.isize {
                    return Err(ArcPeekError::corrupted(
                        (trailer_offset + 4) as u64,
                        format!(
                            "ISIZE is {} but {} bytes were decoded",
                            trailer.isize,
                            inflated.data.len()
                        ),
                    ));
                }
            }
        }

        let end = match trailer {
            Some(_) => trailer_offset + GZIP_TRAILER_SIZE,
            None => data.len(),
        };

        Ok(Self {
            header,
            data: inflated.data,
            trailer,
            end,
        })
    }
}

/// A decoded GZIP file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipFile {
    /// Header of the first member.
    pub header: GzipHeader,
    /// Concatenated output of every member.
    pub data: Vec<u8>,
    /// Number of members decoded.
    pub members: usize,
}

/// Decode every member of a GZIP buffer.
///
/// Members are decoded in order and their outputs concatenated. Decoding
/// stops at the end of the buffer, at zero padding, or at bytes that do not
/// start another member. `max_output_size` bounds the combined output.
pub fn decode_members(data: &[u8], options: DecodeOptions) -> Result<GzipFile> {
    let first = GzipMember::decode(data, 0, options)?;
    check_limit(first.data.len(), options)?;

    let mut offset = first.end;
    let mut output = first.data;
    let mut members = 1;

    while offset < data.len() {
        let rest = &data[offset..];
        if rest.iter().all(|&b| b == 0) {
            log::debug!("{} bytes of zero padding after member {}", rest.len(), members);
            break;
        }
        if !rest.starts_with(&GZIP_MAGIC) {
            log::debug!("ignoring {} trailing bytes at {}", rest.len(), offset);
            break;
        }

        let remaining = options
            .max_output_size
            .map(|limit| limit.saturating_sub(output.len()));
        let member = GzipMember::decode(data, offset, options.max_output_size(remaining))
            .map_err(|err| match (err.kind(), options.max_output_size) {
                (ErrorKind::OutputLimitExceeded, Some(limit)) => ArcPeekError::output_limit(limit),
                _ => err,
            })?;

        output.extend_from_slice(&member.data);
        offset = member.end;
        members += 1;
    }

    Ok(GzipFile {
        header: first.header,
        data: output,
        members,
    })
}

fn check_limit(len: usize, options: DecodeOptions) -> Result<()> {
    match options.max_output_size {
        Some(limit) if len > limit => Err(ArcPeekError::output_limit(limit)),
        _ => Ok(()),
    }
}
