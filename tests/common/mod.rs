//! Wire builders shared by the integration tests

#![allow(dead_code)]

use prost::Message;
use resonance_tap::config::GAME_SERVICE_ID;
use resonance_tap::schema::proto;
use resonance_tap::{CapturedSegment, FlowKey};
use std::net::Ipv4Addr;

pub const CURRENT_HP: u32 = 0x2c2e;
pub const MAX_HP: u32 = 0x2c38;
pub const TEMPLATE_ID: u32 = 0x0a;

pub fn varint(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
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

pub fn frame(body: &[u8]) -> Vec<u8> {
    let mut out = ((body.len() + 4) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(body);
    out
}

pub fn notify(method_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = 0x0002u16.to_be_bytes().to_vec();
    body.extend_from_slice(&GAME_SERVICE_ID.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&method_id.to_be_bytes());
    body.extend_from_slice(payload);
    body
}

pub fn frame_down_zstd(frames: &[Vec<u8>]) -> anyhow::Result<Vec<u8>> {
    let nested: Vec<u8> = frames.iter().flat_map(|f| frame(f)).collect();
    let mut body = 0x8006u16.to_be_bytes().to_vec();
    body.extend_from_slice(&42u32.to_be_bytes());
    body.extend_from_slice(&zstd::bulk::compress(&nested, 3)?);
    Ok(body)
}

/// Padding frame of an envelope type the decoder ignores.
pub fn filler_frame(total_len: usize) -> Vec<u8> {
    let mut body = 0x0003u16.to_be_bytes().to_vec();
    body.resize(total_len - 4, 0xee);
    frame(&body)
}

pub fn delta(entity_id: u64, attrs: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let collection = proto::AttrCollection {
        uuid: entity_id as i64,
        attrs: attrs
            .iter()
            .map(|(id, raw)| proto::Attr { id: *id as i32, raw_data: raw.clone() })
            .collect(),
    };
    proto::SyncNearDeltaInfo {
        delta_infos: vec![proto::AoiSyncDelta { uuid: entity_id as i64, attrs: Some(collection) }],
    }
    .encode_to_vec()
}

pub fn appear(entity_id: u64, attrs: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let collection = proto::AttrCollection {
        uuid: entity_id as i64,
        attrs: attrs
            .iter()
            .map(|(id, raw)| proto::Attr { id: *id as i32, raw_data: raw.clone() })
            .collect(),
    };
    proto::SyncNearEntities {
        appear: vec![proto::Entity {
            uuid: entity_id as i64,
            ent_type: 1,
            attrs: Some(collection),
        }],
    }
    .encode_to_vec()
}

pub fn hp_frame(entity_id: u64, hp: u64) -> Vec<u8> {
    frame(&notify(0x2d, &delta(entity_id, &[(CURRENT_HP, varint(hp))])))
}

/// Payload of `len` bytes matching the game-service signature.
pub fn signature_payload(len: usize) -> Vec<u8> {
    let mut payload = vec![0u8; 10];
    payload.extend_from_slice(&15u32.to_be_bytes());
    payload.extend_from_slice(&[0x00, 0x02, 0x00, 0x00, 0x00]);
    payload.extend_from_slice(&[0x00, 0x63, 0x33, 0x53, 0x42, 0x00]);
    payload.resize(len.max(payload.len()), 0);
    payload
}

pub fn login_response() -> Vec<u8> {
    let mut payload = vec![0u8; 0x62];
    payload[..10].copy_from_slice(&[0x00, 0x00, 0x00, 0x62, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    payload[14..20].copy_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x0a, 0x4e]);
    payload
}

pub fn server_flow() -> FlowKey {
    FlowKey::new(Ipv4Addr::new(203, 0, 113, 7), 5003, Ipv4Addr::new(192, 168, 1, 20), 51234)
}

pub fn second_server_flow() -> FlowKey {
    FlowKey::new(Ipv4Addr::new(203, 0, 113, 8), 5003, Ipv4Addr::new(192, 168, 1, 20), 51300)
}

pub fn web_flow() -> FlowKey {
    FlowKey::new(Ipv4Addr::new(198, 51, 100, 9), 443, Ipv4Addr::new(192, 168, 1, 20), 51240)
}

pub fn segment(flow: FlowKey, seq: u32, payload: Vec<u8>) -> CapturedSegment {
    CapturedSegment::new(flow, seq, 0, payload)
}

/// Cut `stream` into server-flow segments of `chunk` bytes starting at `seq`.
pub fn split(seq: u32, stream: &[u8], chunk: usize) -> Vec<CapturedSegment> {
    let mut next = seq;
    stream
        .chunks(chunk)
        .map(|bytes| {
            let s = segment(server_flow(), next, bytes.to_vec());
            next = next.wrapping_add(bytes.len() as u32);
            s
        })
        .collect()
}
