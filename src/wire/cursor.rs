//! Bounds-checked big-endian reader over a byte slice
//!
//! Every read either returns the requested value and advances, or returns
//! [`TapError::Truncated`] and leaves the position untouched. The cursor never
//! panics on short input.

use crate::{Result, TapError};

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Sequential big-endian reader.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let bytes: [u8; N] = self
            .data
            .get(self.pos..self.pos + N)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| TapError::truncated(context, N, self.remaining()))?;
        self.pos += N;
        Ok(bytes)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.take::<2>("u16").map(u16::from_be_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.take::<4>("u32").map(u32::from_be_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.take::<8>("u64").map(u64::from_be_bytes)
    }

    /// Read a big-endian u32 without advancing.
    pub fn peek_u32(&self) -> Result<u32> {
        self.clone().read_u32()
    }

    /// Read exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(TapError::truncated("byte run", len, self.remaining()));
        };
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Consume everything that is left (possibly nothing).
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.pos..];
        self.pos = self.data.len();
        bytes
    }

    /// Read a little-endian base-128 varint.
    pub fn read_varint(&mut self) -> Result<u64> {
        let (value, consumed) = read_varint(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }
}

/// Decode a little-endian base-128 varint from the front of `data`.
///
/// Returns the value and the number of bytes consumed. Fails when no byte
/// with a clear continuation bit appears within `data` (or within
/// [`MAX_VARINT_LEN`] bytes).
pub fn read_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (index, &byte) in data.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u64::from(byte & 0x7f) << (7 * index);
        if byte & 0x80 == 0 {
            return Ok((value, index + 1));
        }
    }
    Err(TapError::InvalidVarint { available: data.len() })
}

/// Peek a big-endian u32 at the start of `data`.
pub fn peek_u32_be(data: &[u8]) -> Option<u32> {
    data.get(..4).and_then(|bytes| bytes.try_into().ok()).map(u32::from_be_bytes)
}
