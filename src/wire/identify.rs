//! Game-server recognition from the first payload of a flow
//!
//! Two independent signatures are checked; either one is sufficient:
//!
//! 1. A frame stream (byte 4 is zero) whose sub-blocks, starting at offset 10,
//!    carry the game-service marker `00 63 33 53 42 00` at block offset 5.
//! 2. The fixed 98-byte login response.
//!
//! Inspection is pure and never fails: short or malformed input is a
//! non-match.

use tracing::{debug, trace};

use super::cursor::Cursor;

/// Marker carried by frames addressed to the game service.
pub const GAME_SERVICE_SIGNATURE: [u8; 6] = [0x00, 0x63, 0x33, 0x53, 0x42, 0x00];

/// Total length of the login response packet.
pub const LOGIN_RESPONSE_LEN: usize = 0x62;

const LOGIN_RESPONSE_PREFIX: [u8; 10] =
    [0x00, 0x00, 0x00, 0x62, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01];
const LOGIN_RESPONSE_MARKER: [u8; 6] = [0x00, 0x00, 0x00, 0x00, 0x0a, 0x4e];

const SUB_BLOCK_START: usize = 10;
const SIGNATURE_OFFSET: usize = 5;

/// Decide whether `payload` belongs to the game server.
pub fn identify_game_server(payload: &[u8]) -> bool {
    if payload.len() < SUB_BLOCK_START {
        return false;
    }

    if payload[4] == 0 && scan_sub_blocks(&payload[SUB_BLOCK_START..]) {
        debug!("Game server recognized by service signature");
        return true;
    }

    if payload.len() == LOGIN_RESPONSE_LEN {
        trace!("Checking {}-byte payload as login response", LOGIN_RESPONSE_LEN);
        if payload[..10] == LOGIN_RESPONSE_PREFIX && payload[14..20] == LOGIN_RESPONSE_MARKER {
            debug!("Game server recognized by login response");
            return true;
        }
    }

    false
}

/// Walk length-prefixed sub-blocks looking for the service signature.
///
/// A malformed or short block ends the scan without a match.
fn scan_sub_blocks(data: &[u8]) -> bool {
    let mut cursor = Cursor::new(data);
    while let Ok(length) = cursor.read_u32() {
        let body_len = (length as usize).saturating_sub(4);
        let available = body_len.min(cursor.remaining());
        if available == 0 {
            return false;
        }
        let Ok(block) = cursor.read_bytes(available) else {
            return false;
        };
        if block.get(SIGNATURE_OFFSET..SIGNATURE_OFFSET + GAME_SERVICE_SIGNATURE.len())
            == Some(&GAME_SERVICE_SIGNATURE[..])
        {
            return true;
        }
    }
    false
}
