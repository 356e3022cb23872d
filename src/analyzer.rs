//! Synchronous ingest entry point
//!
//! [`Analyzer`] ties the pipeline together behind one lock:
//!
//! ```text
//! CapturedSegment ─► FlowTracker ─► ReassemblyState ─► extract_frames ─► EnvelopeDecoder
//!                                                                            │
//!                                           Vec<TapEvent> ◄──────────────────┘
//! ```
//!
//! All decode work for a segment runs inside [`Analyzer::ingest`] while the
//! reassembly lock is held; events are returned to the caller after the lock
//! is released, so consumers never run under it. The periodic sweep takes
//! the same lock.
//!
//! ## Performance Characteristics
//!
//! - In-order segments are appended straight into the contiguous buffer
//!   (one copy into the cache, one into the buffer).
//! - Frames are decoded from borrowed slices of the buffer; only zstd output
//!   and decoded protobuf messages allocate.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::Result;
use crate::config::TapConfig;
use crate::entity::{AttributeDecoder, EntityWalker};
use crate::names::{MonsterNames, NameTable, NoNames};
use crate::reassembly::{Admission, FlowTracker};
use crate::schema::{MessageDecoder, ProstDecoder};
use crate::types::{CapturedSegment, FlowKey, ServerChanged, TapEvent};
use crate::wire::{EnvelopeDecoder, Stop, extract_frames};

/// Pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalyzerStats {
    pub segments_seen: u64,
    /// Segments of the active game-server flow pushed into reassembly.
    pub segments_streamed: u64,
    pub bytes_delivered: u64,
    pub frames_decoded: u64,
    /// Stream resets caused by an out-of-range frame length.
    pub corrupt_resets: u64,
    /// Stream resets caused by inactivity.
    pub timeout_resets: u64,
    pub evicted_fragments: u64,
    pub server_changes: u64,
    pub events_emitted: u64,
    /// Segments lost before reaching the analyzer (full capture queue).
    pub segments_dropped: u64,
}

#[derive(Debug, Default)]
struct Inner {
    tracker: FlowTracker,
    stats: AnalyzerStats,
}

/// Reassembles the game-server stream and decodes enemy updates.
#[derive(Debug)]
pub struct Analyzer {
    inner: Mutex<Inner>,
    envelopes: EnvelopeDecoder,
    max_frame_len: u32,
    fragment_timeout: Duration,
}

impl Analyzer {
    /// Build an analyzer with the protobuf decoder and the name table from
    /// `config.monster_names`, if any.
    pub fn new(config: &TapConfig) -> Result<Self> {
        config.validate()?;
        let names: Arc<dyn MonsterNames> = match &config.monster_names {
            Some(path) => Arc::new(NameTable::load(path)?),
            None => Arc::new(NoNames),
        };
        Ok(Self::with_collaborators(config, Arc::new(ProstDecoder), names))
    }

    /// Build an analyzer around caller-supplied decoders.
    pub fn with_collaborators(
        config: &TapConfig,
        messages: Arc<dyn MessageDecoder>,
        names: Arc<dyn MonsterNames>,
    ) -> Self {
        let walker = EntityWalker::new(AttributeDecoder::new(names));
        Self {
            inner: Mutex::new(Inner::default()),
            envelopes: EnvelopeDecoder::new(config, messages, walker),
            max_frame_len: config.max_frame_len,
            fragment_timeout: config.fragment_timeout(),
        }
    }

    /// Process one captured segment and return the events it produced.
    pub fn ingest(&self, segment: &CapturedSegment) -> Vec<TapEvent> {
        let mut events = Vec::new();
        {
            let mut guard = self.inner.lock();
            let Inner { tracker, stats } = &mut *guard;
            stats.segments_seen += 1;

            match tracker.admit(segment) {
                Admission::Ignored => {}
                Admission::Identified => {
                    stats.server_changes += 1;
                    events.push(TapEvent::ServerChanged(ServerChanged { flow: segment.flow }));
                }
                Admission::Stream(push) => {
                    stats.segments_streamed += 1;
                    stats.bytes_delivered += push.delivered as u64;
                    if push.delivered > 0 {
                        self.decode_buffered(tracker, stats, &mut events);
                    }
                }
            }
            stats.events_emitted += events.len() as u64;
        }
        events
    }

    fn decode_buffered(
        &self,
        tracker: &mut FlowTracker,
        stats: &mut AnalyzerStats,
        events: &mut Vec<TapEvent>,
    ) {
        let buffer = tracker.state_mut().buffer_mut();
        let extraction = extract_frames(buffer, self.max_frame_len, |body| {
            self.envelopes.decode(body, 0, events)
        });
        stats.frames_decoded += extraction.frames as u64;
        let left = tracker.state().buffer().len();
        trace!("Decoded {} frames, {} bytes left", extraction.frames, left);

        if let Stop::Corrupt { length } = extraction.stop {
            warn!("Corrupt frame length {:#x}; resetting stream", length);
            tracker.state_mut().reset();
            stats.corrupt_resets += 1;
        }
    }

    /// Evict stale reassembly state; called periodically.
    pub fn sweep(&self, now: Instant) {
        let mut guard = self.inner.lock();
        let Inner { tracker, stats } = &mut *guard;
        let eviction = tracker.sweep(now, self.fragment_timeout);

        if eviction.fragments > 0 {
            debug!("Evicted {} cached segments", eviction.fragments);
            stats.evicted_fragments += eviction.fragments as u64;
        }
        if eviction.flow_reset {
            warn!("No game traffic for {:?}; stream state reset", self.fragment_timeout);
            stats.timeout_resets += 1;
        }
    }

    /// Forget the current server and all buffered data.
    pub fn clear(&self) {
        self.inner.lock().tracker.reset();
        info!("Analyzer state cleared");
    }

    pub fn stats(&self) -> AnalyzerStats {
        self.inner.lock().stats
    }

    pub(crate) fn record_dropped(&self, count: u64) {
        self.inner.lock().stats.segments_dropped += count;
    }

    pub fn current_flow(&self) -> Option<FlowKey> {
        self.inner.lock().tracker.current_flow()
    }

    /// Flows with at least `min_segments` segments, busiest first.
    pub fn busy_flows(&self, min_segments: u64) -> Vec<(FlowKey, u64)> {
        let mut flows: Vec<(FlowKey, u64)> = self
            .inner
            .lock()
            .tracker
            .segment_counts()
            .iter()
            .filter(|(_, count)| **count >= min_segments)
            .map(|(flow, count)| (*flow, *count))
            .collect();
        flows.sort_by(|a, b| b.1.cmp(&a.1));
        flows
    }

    /// Bytes waiting in the contiguous buffer.
    pub fn buffered_bytes(&self) -> usize {
        self.inner.lock().tracker.state().buffer().len()
    }

    pub fn cached_segments(&self) -> usize {
        self.inner.lock().tracker.state().cached_segments()
    }
}
