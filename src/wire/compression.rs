//! Bounded zstd decompression with raw-bytes fallback

use std::borrow::Cow;
use tracing::debug;

use crate::{Result, TapError};

/// Decompress a zstd block, refusing output larger than `bound` bytes.
pub fn decompress_bounded(data: &[u8], bound: usize) -> Result<Vec<u8>> {
    zstd::bulk::decompress(data, bound).map_err(|source| TapError::Decompression {
        compressed_len: data.len(),
        bound,
        source,
    })
}

/// Decompress when `compressed` is set; on failure keep the original bytes.
///
/// Corrupt or oversized compressed bodies are tolerated: the caller continues
/// with the raw bytes and the downstream decoder decides whether they mean
/// anything.
pub fn decompress_or_raw(data: &[u8], compressed: bool, bound: usize) -> Cow<'_, [u8]> {
    if !compressed {
        return Cow::Borrowed(data);
    }

    match decompress_bounded(data, bound) {
        Ok(decompressed) => {
            debug!("Decompressed {} -> {} bytes", data.len(), decompressed.len());
            Cow::Owned(decompressed)
        }
        Err(e) => {
            debug!("Falling back to raw bytes: {}", e);
            Cow::Borrowed(data)
        }
    }
}
