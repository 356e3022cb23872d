//! Builders for wire data used by unit tests and benches
//!
//! Everything here produces bytes exactly as the game server would put them on
//! the wire: length-prefixed frames, Notify and FrameDown envelopes, protobuf
//! sync payloads, and the handshake payloads that identify a server flow.

#![cfg(any(test, feature = "benchmark"))]

use prost::Message;
use std::net::Ipv4Addr;

use crate::config::GAME_SERVICE_ID;
use crate::schema::proto;
use crate::types::{CapturedSegment, FlowKey};
use crate::wire::identify::GAME_SERVICE_SIGNATURE;

/// Attribute list of one entity: `(attribute id, raw bytes)`.
pub type RawAttributes = Vec<(u32, Vec<u8>)>;

/// Little-endian base-128 encoding of `value`.
pub fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Prefix `body` with its self-inclusive 4-byte big-endian length.
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(body.len() + 4);
    frame.extend_from_slice(&((body.len() + 4) as u32).to_be_bytes());
    frame.extend_from_slice(body);
    frame
}

fn compress(data: &[u8]) -> Vec<u8> {
    match zstd::bulk::compress(data, 3) {
        Ok(compressed) => compressed,
        Err(e) => panic!("zstd compression failed: {}", e),
    }
}

/// Notify envelope body (header onwards, no frame prefix).
pub fn notify_body(service_id: u64, method_id: u32, payload: &[u8], compressed: bool) -> Vec<u8> {
    let header: u16 = if compressed { 0x8002 } else { 0x0002 };
    let mut body = Vec::with_capacity(payload.len() + 18);
    body.extend_from_slice(&header.to_be_bytes());
    body.extend_from_slice(&service_id.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&method_id.to_be_bytes());
    if compressed {
        body.extend_from_slice(&compress(payload));
    } else {
        body.extend_from_slice(payload);
    }
    body
}

/// FrameDown envelope body wrapping `frames` (each a frame body without prefix).
pub fn frame_down_body(server_seq: u32, frames: &[Vec<u8>], compressed: bool) -> Vec<u8> {
    let nested: Vec<u8> = frames.iter().flat_map(|frame| encode_frame(frame)).collect();
    let header: u16 = if compressed { 0x8006 } else { 0x0006 };
    let mut body = Vec::with_capacity(nested.len() + 6);
    body.extend_from_slice(&header.to_be_bytes());
    body.extend_from_slice(&server_seq.to_be_bytes());
    if compressed && !nested.is_empty() {
        body.extend_from_slice(&compress(&nested));
    } else {
        body.extend_from_slice(&nested);
    }
    body
}

fn attr_collection(uuid: u64, attrs: &RawAttributes) -> proto::AttrCollection {
    proto::AttrCollection {
        uuid: uuid as i64,
        attrs: attrs
            .iter()
            .map(|(id, raw)| proto::Attr { id: *id as i32, raw_data: raw.clone() })
            .collect(),
    }
}

/// Encoded `SyncNearEntities` with one entity per entry.
pub fn near_entities_payload(entities: &[(u64, RawAttributes)]) -> Vec<u8> {
    proto::SyncNearEntities {
        appear: entities
            .iter()
            .map(|(uuid, attrs)| proto::Entity {
                uuid: *uuid as i64,
                ent_type: 1,
                attrs: Some(attr_collection(*uuid, attrs)),
            })
            .collect(),
    }
    .encode_to_vec()
}

/// Encoded `SyncNearDeltaInfo` with one delta per entry.
pub fn delta_info_payload(deltas: &[(u64, RawAttributes)]) -> Vec<u8> {
    proto::SyncNearDeltaInfo {
        delta_infos: deltas
            .iter()
            .map(|(uuid, attrs)| proto::AoiSyncDelta {
                uuid: *uuid as i64,
                attrs: Some(attr_collection(*uuid, attrs)),
            })
            .collect(),
    }
    .encode_to_vec()
}

/// Framed game Notify carrying a single current-HP delta.
pub fn hp_update_frame(entity_id: u64, hp: u64) -> Vec<u8> {
    let payload = delta_info_payload(&[(entity_id, vec![(0x2c2e, encode_varint(hp))])]);
    encode_frame(&notify_body(GAME_SERVICE_ID, 0x2d, &payload, false))
}

/// The 98-byte login response that identifies a game server.
pub fn login_response() -> Vec<u8> {
    let mut payload = vec![0u8; 0x62];
    payload[..10].copy_from_slice(&[0x00, 0x00, 0x00, 0x62, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    payload[14..20].copy_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x0a, 0x4e]);
    payload
}

/// A payload padded to `len` bytes that identifies the game server by its
/// service signature.
pub fn signature_payload(len: usize) -> Vec<u8> {
    let mut block = vec![0u8; 4];
    block.extend_from_slice(&[0x00, 0x02, 0x00, 0x00, 0x00]);
    block.extend_from_slice(&GAME_SERVICE_SIGNATURE);
    let block_len = block.len() as u32;
    block[..4].copy_from_slice(&block_len.to_be_bytes());

    let mut payload = vec![0u8; 10];
    payload.extend_from_slice(&block);
    if payload.len() < len {
        payload.resize(len, 0);
    }
    payload
}

/// Server → client flow of the game connection.
pub fn server_flow() -> FlowKey {
    FlowKey::new(Ipv4Addr::new(203, 0, 113, 7), 5003, Ipv4Addr::new(192, 168, 1, 20), 51234)
}

/// Unrelated flow on the same host.
pub fn other_flow() -> FlowKey {
    FlowKey::new(Ipv4Addr::new(198, 51, 100, 9), 443, Ipv4Addr::new(192, 168, 1, 20), 51240)
}

/// Cut `stream` into consecutive segments of `server_flow()` starting at `seq`.
pub fn segments(seq: u32, stream: &[u8], chunk: usize) -> Vec<CapturedSegment> {
    let mut next = seq;
    stream
        .chunks(chunk.max(1))
        .map(|bytes| {
            let segment = CapturedSegment::new(server_flow(), next, 0, bytes.to_vec());
            next = next.wrapping_add(bytes.len() as u32);
            segment
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::identify_game_server;

    #[test]
    fn varint_encoding_matches_known_values() {
        assert_eq!(encode_varint(0), vec![0x00]);
        assert_eq!(encode_varint(300), vec![0xac, 0x02]);
        assert_eq!(encode_varint(u64::MAX).len(), 10);
    }

    #[test]
    fn handshake_payloads_identify() {
        assert!(identify_game_server(&login_response()));
        assert!(identify_game_server(&signature_payload(64)));
    }

    #[test]
    fn segments_are_contiguous() {
        let stream: Vec<u8> = (0..25).collect();
        let parts = segments(u32::MAX - 3, &stream, 10);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].seq, 6);
        assert_eq!(parts[2].payload.len(), 5);
    }
}
