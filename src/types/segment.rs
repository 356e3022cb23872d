//! Captured TCP segments and flow identity

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Instant;

/// One direction of a TCP/IPv4 connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowKey {
    pub src_addr: Ipv4Addr,
    pub src_port: u16,
    pub dst_addr: Ipv4Addr,
    pub dst_port: u16,
}

impl FlowKey {
    /// Create a flow key from its four components.
    pub fn new(src_addr: Ipv4Addr, src_port: u16, dst_addr: Ipv4Addr, dst_port: u16) -> Self {
        Self { src_addr, src_port, dst_addr, dst_port }
    }

    /// The opposite direction of the same connection.
    pub fn reversed(&self) -> Self {
        Self {
            src_addr: self.dst_addr,
            src_port: self.dst_port,
            dst_addr: self.src_addr,
            dst_port: self.src_port,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} -> {}:{}", self.src_addr, self.src_port, self.dst_addr, self.dst_port)
    }
}

/// A TCP segment handed over by the capture layer.
///
/// Only segments with a non-empty payload are interesting; the capture
/// layer is expected to filter pure ACKs, but empty payloads are tolerated.
#[derive(Debug, Clone)]
pub struct CapturedSegment {
    pub flow: FlowKey,
    pub seq: u32,
    pub ack: u32,
    pub payload: Vec<u8>,
    pub captured_at: Instant,
}

impl CapturedSegment {
    /// Create a segment stamped with the current time.
    pub fn new(flow: FlowKey, seq: u32, ack: u32, payload: Vec<u8>) -> Self {
        Self { flow, seq, ack, payload, captured_at: Instant::now() }
    }

    /// Override the capture timestamp.
    pub fn with_timestamp(mut self, captured_at: Instant) -> Self {
        self.captured_at = captured_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_flow_direction() {
        let flow =
            FlowKey::new(Ipv4Addr::new(10, 0, 0, 1), 5003, Ipv4Addr::new(192, 168, 1, 2), 51000);
        assert_eq!(flow.to_string(), "10.0.0.1:5003 -> 192.168.1.2:51000");
        assert_eq!(flow.reversed().reversed(), flow);
        assert_ne!(flow.reversed(), flow);
    }
}
