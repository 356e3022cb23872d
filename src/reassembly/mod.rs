//! Game-server flow tracking and TCP stream reassembly.
//!
//! Only one flow is reassembled at a time: the most recent flow whose payload
//! matched a game-server signature. Segments from any other flow are offered
//! to the identifier and otherwise ignored.
//!
//! ```text
//! segment ──► FlowTracker::admit
//!               ├─ other flow, no signature  → Ignored
//!               ├─ other flow, signature     → Identified (state restarted)
//!               └─ active flow               → Stream(Push) → ReassemblyState
//! ```

mod state;

pub use state::{Eviction, Push, ReassemblyState};

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{info, trace};

use crate::types::{CapturedSegment, FlowKey};
use crate::wire::identify_game_server;

/// Upper bound on distinct flows kept in the per-flow segment counts.
pub const MAX_COUNTED_FLOWS: usize = 1024;

/// What [`FlowTracker::admit`] did with a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Not from the game server.
    Ignored,
    /// This segment identified a new game-server flow.
    Identified,
    /// Segment of the active flow, pushed into reassembly.
    Stream(Push),
}

/// Active-flow selection plus its reassembly state.
#[derive(Debug, Default)]
pub struct FlowTracker {
    current: Option<FlowKey>,
    state: ReassemblyState,
    segment_counts: HashMap<FlowKey, u64>,
}

impl FlowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one segment.
    pub fn admit(&mut self, segment: &CapturedSegment) -> Admission {
        self.count(segment.flow);

        if self.current != Some(segment.flow) {
            if !identify_game_server(&segment.payload) {
                return Admission::Ignored;
            }
            info!("Identified game server flow {}", segment.flow);
            self.current = Some(segment.flow);
            self.segment_counts.clear();
            self.segment_counts.insert(segment.flow, 1);
            self.state.begin(segment.seq, segment.payload.len(), segment.captured_at);
            return Admission::Identified;
        }

        Admission::Stream(self.state.push(segment.seq, &segment.payload, segment.captured_at))
    }

    fn count(&mut self, flow: FlowKey) {
        if let Some(count) = self.segment_counts.get_mut(&flow) {
            *count += 1;
        } else if self.segment_counts.len() < MAX_COUNTED_FLOWS {
            self.segment_counts.insert(flow, 1);
        } else {
            trace!("Flow count table full; not counting {}", flow);
        }
    }

    /// Forget the active flow and all buffered data.
    pub fn reset(&mut self) {
        self.current = None;
        self.state.reset();
        self.segment_counts.clear();
    }

    pub fn sweep(&mut self, now: Instant, timeout: Duration) -> Eviction {
        self.state.evict(now, timeout)
    }

    pub fn current_flow(&self) -> Option<FlowKey> {
        self.current
    }

    pub fn state(&self) -> &ReassemblyState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ReassemblyState {
        &mut self.state
    }

    /// Segments seen per flow since the last server change.
    pub fn segment_counts(&self) -> &HashMap<FlowKey, u64> {
        &self.segment_counts
    }
}
