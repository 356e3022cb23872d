//! Core types for captured traffic and decoded output.
//!
//! This module provides the data model shared by every pipeline stage:
//! - [`CapturedSegment`] is one TCP payload handed over by the capture layer
//! - [`FlowKey`] identifies one direction of a TCP/IPv4 connection
//! - [`EntityRecord`] and [`AttributeValue`] are the decoded entity tree
//! - [`TapEvent`] is what downstream consumers receive
//!
//! Sequence helpers in this module operate modulo 2^32 so that flows crossing
//! the sequence-number boundary reassemble correctly.
//!
//! ## Usage Example
//!
//! ```rust
//! use resonance_tap::types::{seq_advance, seq_behind, CapturedSegment, FlowKey};
//! use std::net::Ipv4Addr;
//!
//! let flow = FlowKey::new(Ipv4Addr::new(10, 0, 0, 1), 5003, Ipv4Addr::new(10, 0, 0, 2), 50123);
//! let segment = CapturedSegment::new(flow, 0xffff_fff0, 0, vec![0u8; 32]);
//!
//! let next = seq_advance(segment.seq, segment.payload.len());
//! assert_eq!(next, 0x10);
//! assert!(seq_behind(segment.seq, next));
//! ```

mod entity;
mod event;
mod segment;
mod sequence;

pub use entity::{AttributeValue, EntityRecord};
pub use event::{EnemyAttributeUpdate, ServerChanged, TapEvent};
pub use segment::{CapturedSegment, FlowKey};
pub use sequence::{seq_advance, seq_behind, seq_distance};
