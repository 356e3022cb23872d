//! Wire-level decoding: cursor, server identification, framing, envelopes.
//!
//! # Architecture
//!
//! ```text
//! reassembled bytes ──► frame::extract_frames ──► envelope::EnvelopeDecoder
//!                                                     │
//!                              ┌──────────────────────┤
//!                              ▼                      ▼
//!                      Notify → schema       FrameDown → frame stream (recursive)
//! ```
//!
//! Everything here is synchronous and allocation-light; all functions operate
//! on borrowed slices and report malformed input through [`crate::TapError`].

pub mod compression;
pub mod cursor;
pub mod envelope;
pub mod frame;
pub mod identify;

pub use cursor::{Cursor, read_varint};
pub use envelope::{EnvelopeDecoder, EnvelopeHeader, MessageType};
pub use frame::{Extraction, Stop, extract_frames, split_frames};
pub use identify::identify_game_server;
