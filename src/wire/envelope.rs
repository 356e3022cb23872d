//! Envelope header parsing and dispatch
//!
//! Every frame body starts with a 2-byte big-endian header: bit `0x8000`
//! flags a zstd-compressed body, the low 15 bits carry the message type.
//!
//! ```text
//! Notify (2):    header | service id u64 | stub id u32 | method id u32 | body
//! FrameDown (6): header | server seq u32 | nested frame stream
//! ```
//!
//! Notify bodies for the game service are decoded into entity records and
//! walked for monster attributes. FrameDown bodies are a frame stream of
//! their own and are decoded recursively, up to a fixed depth.

use std::sync::Arc;
use tracing::{debug, trace};

use super::compression::decompress_or_raw;
use super::cursor::Cursor;
use super::frame::{Stop, split_frames};
use crate::Result;
use crate::config::TapConfig;
use crate::entity::EntityWalker;
use crate::schema::{MessageDecoder, MessageKind};
use crate::types::TapEvent;

const COMPRESSED_FLAG: u16 = 0x8000;
const TYPE_MASK: u16 = 0x7fff;

/// Envelope message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Notify,
    FrameDown,
    Other(u16),
}

impl MessageType {
    pub fn from_id(id: u16) -> Self {
        match id {
            2 => MessageType::Notify,
            6 => MessageType::FrameDown,
            other => MessageType::Other(other),
        }
    }

    pub fn id(self) -> u16 {
        match self {
            MessageType::Notify => 2,
            MessageType::FrameDown => 6,
            MessageType::Other(id) => id,
        }
    }
}

/// Decoded 2-byte envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub compressed: bool,
    pub message_type: MessageType,
}

impl EnvelopeHeader {
    pub fn from_raw(raw: u16) -> Self {
        Self {
            compressed: raw & COMPRESSED_FLAG != 0,
            message_type: MessageType::from_id(raw & TYPE_MASK),
        }
    }

    pub fn to_raw(self) -> u16 {
        let flag = if self.compressed { COMPRESSED_FLAG } else { 0 };
        flag | (self.message_type.id() & TYPE_MASK)
    }
}

/// Decodes frame bodies into events.
#[derive(Clone)]
pub struct EnvelopeDecoder {
    messages: Arc<dyn MessageDecoder>,
    walker: EntityWalker,
    service_id: u64,
    max_frame_len: u32,
    max_decompressed: usize,
    max_depth: usize,
}

impl EnvelopeDecoder {
    pub fn new(
        config: &TapConfig,
        messages: Arc<dyn MessageDecoder>,
        walker: EntityWalker,
    ) -> Self {
        Self {
            messages,
            walker,
            service_id: config.game_service_id,
            max_frame_len: config.max_frame_len,
            max_decompressed: config.max_decompressed_bytes,
            max_depth: config.max_nesting_depth,
        }
    }

    /// Decode one frame body, appending any events to `out`.
    ///
    /// `depth` is 0 for frames cut from the reassembled stream and grows by
    /// one per FrameDown level. Malformed input is logged and skipped.
    pub fn decode(&self, body: &[u8], depth: usize, out: &mut Vec<TapEvent>) {
        if let Err(e) = self.try_decode(body, depth, out) {
            debug!("Skipping frame ({} bytes, depth {}): {}", body.len(), depth, e);
        }
    }

    fn try_decode(&self, body: &[u8], depth: usize, out: &mut Vec<TapEvent>) -> Result<()> {
        let mut cursor = Cursor::new(body);
        let header = EnvelopeHeader::from_raw(cursor.read_u16()?);

        match header.message_type {
            MessageType::Notify => self.decode_notify(&mut cursor, header.compressed, out),
            MessageType::FrameDown => {
                self.decode_frame_down(&mut cursor, header.compressed, depth, out)
            }
            MessageType::Other(id) => {
                trace!("Ignoring message type {}", id);
                Ok(())
            }
        }
    }

    fn decode_notify(
        &self,
        cursor: &mut Cursor<'_>,
        compressed: bool,
        out: &mut Vec<TapEvent>,
    ) -> Result<()> {
        let service_id = cursor.read_u64()?;
        let stub_id = cursor.read_u32()?;
        let method_id = cursor.read_u32()?;

        if service_id != self.service_id {
            trace!("Ignoring Notify for service {:#x}", service_id);
            return Ok(());
        }
        let Some(kind) = MessageKind::from_method_id(method_id) else {
            trace!("Ignoring Notify method {:#x} (stub {})", method_id, stub_id);
            return Ok(());
        };

        let payload = decompress_or_raw(cursor.read_remaining(), compressed, self.max_decompressed);
        let records = self.messages.decode(kind, &payload)?;
        let emitted = self.walker.walk(&records, out);
        trace!("{}: {} entities, {} events", kind, records.len(), emitted);
        Ok(())
    }

    fn decode_frame_down(
        &self,
        cursor: &mut Cursor<'_>,
        compressed: bool,
        depth: usize,
        out: &mut Vec<TapEvent>,
    ) -> Result<()> {
        let server_seq = cursor.read_u32()?;
        if cursor.is_empty() {
            return Ok(());
        }

        let nested_depth = depth + 1;
        if nested_depth >= self.max_depth {
            debug!("FrameDown {} exceeds nesting depth {}", server_seq, self.max_depth);
            return Ok(());
        }

        let nested = decompress_or_raw(cursor.read_remaining(), compressed, self.max_decompressed);
        trace!("FrameDown {}: {} nested bytes", server_seq, nested.len());

        let extraction = split_frames(&nested, self.max_frame_len, |frame| {
            self.decode(frame, nested_depth, out)
        });
        match extraction.stop {
            Stop::Drained => {}
            Stop::Incomplete { buffered, needed } => {
                debug!(
                    "FrameDown {}: trailing partial frame ({} of {} bytes)",
                    server_seq, buffered, needed
                )
            }
            Stop::Corrupt { length } => {
                debug!("FrameDown {}: corrupt nested frame length {:#x}", server_seq, length)
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for EnvelopeDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeDecoder")
            .field("service_id", &self.service_id)
            .field("max_frame_len", &self.max_frame_len)
            .field("max_decompressed", &self.max_decompressed)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}
