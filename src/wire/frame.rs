//! Length-prefixed frame extraction
//!
//! A frame is a 4-byte big-endian length (counting the length field itself)
//! followed by `length - 4` bytes of envelope data. Frames are only cut once
//! the whole frame is buffered; a length of zero or above the configured
//! bound marks the stream as desynchronized.

use tracing::trace;

use super::cursor::peek_u32_be;

/// Size of the self-inclusive length prefix.
pub const FRAME_HEADER_LEN: usize = 4;

/// Why frame extraction stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// Every buffered byte was consumed.
    Drained,
    /// The next frame is not fully buffered yet.
    Incomplete { buffered: usize, needed: usize },
    /// The next length prefix is out of range; the stream is desynchronized.
    Corrupt { length: u32 },
}

/// Outcome of one extraction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extraction {
    /// Frames handed to the callback during this pass.
    pub frames: usize,
    /// Bytes consumed from the front of the input.
    pub consumed: usize,
    pub stop: Stop,
}

impl Extraction {
    pub fn is_corrupt(&self) -> bool {
        matches!(self.stop, Stop::Corrupt { .. })
    }
}

/// Walk complete frames at the front of `data`, passing each frame body
/// (without its length prefix) to `on_frame`.
///
/// `data` is left untouched; the returned [`Extraction::consumed`] tells the
/// caller how many bytes belonged to complete frames.
pub fn split_frames<F>(data: &[u8], max_frame_len: u32, mut on_frame: F) -> Extraction
where
    F: FnMut(&[u8]),
{
    let mut offset = 0usize;
    let mut frames = 0usize;

    loop {
        let rest = &data[offset..];
        if rest.is_empty() {
            return Extraction { frames, consumed: offset, stop: Stop::Drained };
        }

        let Some(length) = peek_u32_be(rest) else {
            return Extraction {
                frames,
                consumed: offset,
                stop: Stop::Incomplete { buffered: rest.len(), needed: FRAME_HEADER_LEN },
            };
        };

        if length == 0 || length > max_frame_len {
            return Extraction { frames, consumed: offset, stop: Stop::Corrupt { length } };
        }

        let frame_len = length as usize;
        if rest.len() < frame_len {
            return Extraction {
                frames,
                consumed: offset,
                stop: Stop::Incomplete { buffered: rest.len(), needed: frame_len },
            };
        }

        let body = rest.get(FRAME_HEADER_LEN.min(frame_len)..frame_len).unwrap_or_default();
        trace!("Frame {} at offset {}: {} body bytes", frames, offset, body.len());
        on_frame(body);

        frames += 1;
        offset += frame_len;
    }
}

/// Extract complete frames from a reassembly buffer, removing them from the
/// front of `buffer`.
///
/// On [`Stop::Corrupt`] the buffer keeps the offending bytes; the caller is
/// expected to reset its stream state.
pub fn extract_frames<F>(buffer: &mut Vec<u8>, max_frame_len: u32, on_frame: F) -> Extraction
where
    F: FnMut(&[u8]),
{
    let extraction = split_frames(buffer, max_frame_len, on_frame);
    buffer.drain(..extraction.consumed);
    extraction
}
