//! Segment source implementations

pub mod channel;
pub mod replay;

pub use channel::{ChannelSource, SegmentSender};
pub use replay::ReplaySource;
