//! Replay source for recorded segments

use std::collections::VecDeque;
use std::time::Instant;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::Result;
use crate::provider::SegmentSource;
use crate::types::CapturedSegment;

/// Replays a fixed list of segments, optionally paced.
///
/// Each segment is re-stamped with the current time as it is handed out, so
/// inactivity timeouts behave as they would on live capture.
#[derive(Debug)]
pub struct ReplaySource {
    segments: VecDeque<CapturedSegment>,
    total: usize,
    pacing: Option<Interval>,
}

impl ReplaySource {
    pub fn new(segments: impl IntoIterator<Item = CapturedSegment>) -> Self {
        let segments: VecDeque<CapturedSegment> = segments.into_iter().collect();
        let total = segments.len();
        info!("Replaying {} segments", total);
        Self { segments, total, pacing: None }
    }

    /// Hand out at most one segment per `period`.
    pub fn with_pacing(mut self, period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.pacing = Some(ticker);
        debug!("Replay pacing set to {:?}", period);
        self
    }

    pub fn remaining(&self) -> usize {
        self.segments.len()
    }
}

#[async_trait::async_trait]
impl SegmentSource for ReplaySource {
    async fn next_segment(&mut self) -> Result<Option<CapturedSegment>> {
        if self.segments.is_empty() {
            debug!("Reached end of replay");
            return Ok(None);
        }

        if let Some(pacing) = self.pacing.as_mut() {
            pacing.tick().await;
        }

        let Some(segment) = self.segments.pop_front() else {
            return Ok(None);
        };
        let index = self.total - self.segments.len();
        trace!("Segment {}/{}: {} seq={}", index, self.total, segment.flow, segment.seq);
        Ok(Some(segment.with_timestamp(Instant::now())))
    }
}
