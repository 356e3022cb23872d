//! Structured payload decoding for Notify messages
//!
//! Notify bodies carry protobuf-encoded sync messages. The pipeline only needs
//! a flat view of them: a list of entities, each with an id and raw attribute
//! pairs. [`MessageDecoder`] is the seam for that conversion; [`ProstDecoder`]
//! is the default implementation built on the message definitions in
//! [`proto`].
//!
//! # Architecture
//!
//! ```text
//! Notify body ──► MessageDecoder::decode(kind, bytes) ──► Vec<EntityRecord>
//!                         │
//!                         ├─ NearEntities  (method 0x06) → appear[]
//!                         └─ NearDeltaInfo (method 0x2d) → delta_infos[]
//! ```

pub mod proto;

use prost::Message;
use std::fmt;

use crate::types::{AttributeValue, EntityRecord};
use crate::{Result, TapError};

/// Notify payload kinds the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Entities entering the area of interest.
    NearEntities,
    /// Attribute deltas for entities already in view.
    NearDeltaInfo,
}

impl MessageKind {
    /// Method id carried in the Notify header for this kind.
    pub const fn method_id(self) -> u32 {
        match self {
            MessageKind::NearEntities => 0x06,
            MessageKind::NearDeltaInfo => 0x2d,
        }
    }

    /// Map a Notify method id onto a payload kind.
    pub fn from_method_id(method_id: u32) -> Option<Self> {
        match method_id {
            0x06 => Some(MessageKind::NearEntities),
            0x2d => Some(MessageKind::NearDeltaInfo),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::NearEntities => f.write_str("SyncNearEntities"),
            MessageKind::NearDeltaInfo => f.write_str("SyncNearDeltaInfo"),
        }
    }
}

/// Turns a Notify payload into entity records.
///
/// Implementations must report malformed bytes as an error rather than
/// panicking.
pub trait MessageDecoder: Send + Sync + 'static {
    fn decode(&self, kind: MessageKind, payload: &[u8]) -> Result<Vec<EntityRecord>>;
}

/// Protobuf decoder for the sync messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProstDecoder;

impl MessageDecoder for ProstDecoder {
    fn decode(&self, kind: MessageKind, payload: &[u8]) -> Result<Vec<EntityRecord>> {
        let records = match kind {
            MessageKind::NearEntities => proto::SyncNearEntities::decode(payload)
                .map_err(|source| TapError::Decode { kind, source })?
                .appear
                .into_iter()
                .map(|entity| record(entity.uuid, entity.attrs))
                .collect(),
            MessageKind::NearDeltaInfo => proto::SyncNearDeltaInfo::decode(payload)
                .map_err(|source| TapError::Decode { kind, source })?
                .delta_infos
                .into_iter()
                .map(|delta| record(delta.uuid, delta.attrs))
                .collect(),
        };
        Ok(records)
    }
}

fn record(uuid: i64, attrs: Option<proto::AttrCollection>) -> EntityRecord {
    let attributes = attrs
        .map(|collection| {
            collection
                .attrs
                .into_iter()
                .map(|attr| AttributeValue::new(attr.id as u32, attr.raw_data))
                .collect()
        })
        .unwrap_or_default();
    EntityRecord::new(uuid as u64, attributes)
}
