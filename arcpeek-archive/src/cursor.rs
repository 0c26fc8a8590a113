//! Little-endian field reading over a byte slice.
//!
//! ZIP and GZIP records are sequences of fixed-width little-endian fields.
//! [`ByteCursor`] reads them in order and turns any read past the end of the
//! buffer into `UnexpectedEndOfStream` instead of a panic.

use arcpeek_core::error::{ArcPeekError, Result};

/// Forward cursor over a byte slice.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Start reading `data` at `position`.
    pub fn new(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    /// Offset of the next byte to read.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Borrow the next `count` bytes and advance past them.
    pub fn bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                ArcPeekError::unexpected_end(
                    self.position,
                    count - self.data.len().saturating_sub(self.position),
                )
            })?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read a fixed-size array.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    /// Skip `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.bytes(count).map(|_| ())
    }

    /// Read one byte.
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    /// Read a little-endian `u16`.
    pub fn u16_le(&mut self) -> Result<u16> {
        self.array().map(u16::from_le_bytes)
    }

    /// Read a little-endian `u32`.
    pub fn u32_le(&mut self) -> Result<u32> {
        self.array().map(u32::from_le_bytes)
    }

    /// Read a little-endian `u64`.
    pub fn u64_le(&mut self) -> Result<u64> {
        self.array().map(u64::from_le_bytes)
    }

    /// Read up to (not including) the next NUL byte, then skip the NUL.
    pub fn null_terminated(&mut self) -> Result<&'a [u8]> {
        let rest = self.data.get(self.position..).unwrap_or_default();
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            return Err(ArcPeekError::unexpected_end(self.data.len(), 1));
        };
        let bytes = self.bytes(len)?;
        self.position += 1;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcpeek_core::ErrorKind;

    #[test]
    fn test_fields() {
        let data = [
            0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
        ];
        let mut cursor = ByteCursor::new(&data, 0);
        assert_eq!(cursor.u32_le().unwrap(), 0x04034B50);
        assert_eq!(cursor.u16_le().unwrap(), 20);
        assert_eq!(cursor.u64_le().unwrap(), 0x0807060504030201);
        assert_eq!(cursor.position(), 14);
        assert_eq!(cursor.u8().unwrap_err().kind(), ErrorKind::UnexpectedEndOfStream);
    }

    #[test]
    fn test_bytes_past_end() {
        let data = [1, 2, 3];
        let mut cursor = ByteCursor::new(&data, 1);
        assert!(matches!(
            cursor.bytes(5),
            Err(ArcPeekError::UnexpectedEndOfStream {
                offset: 1,
                needed: 3
            })
        ));
        // A failed read does not move the cursor
        assert_eq!(cursor.bytes(2).unwrap(), &[2, 3]);
    }

    #[test]
    fn test_start_past_end() {
        let data = [1, 2];
        let mut cursor = ByteCursor::new(&data, 10);
        assert_eq!(
            cursor.u16_le().unwrap_err().kind(),
            ErrorKind::UnexpectedEndOfStream
        );
        assert_eq!(
            cursor.null_terminated().unwrap_err().kind(),
            ErrorKind::UnexpectedEndOfStream
        );
    }

    #[test]
    fn test_null_terminated() {
        let data = b"log.txt\0rest";
        let mut cursor = ByteCursor::new(data, 0);
        assert_eq!(cursor.null_terminated().unwrap(), b"log.txt");
        assert_eq!(cursor.bytes(4).unwrap(), b"rest");

        let mut cursor = ByteCursor::new(b"unterminated", 0);
        assert_eq!(
            cursor.null_terminated().unwrap_err().kind(),
            ErrorKind::UnexpectedEndOfStream
        );
    }
}
