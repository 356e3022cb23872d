//! Segment source trait

use crate::Result;
use crate::types::CapturedSegment;

/// Source of captured TCP segments.
///
/// Sources abstract over where segments come from (a capture callback, a
/// recorded session, a test fixture) and handle their own pacing.
#[async_trait::async_trait]
pub trait SegmentSource: Send + 'static {
    /// Get the next captured segment
    ///
    /// Returns:
    /// - `Ok(Some(segment))` - New segment available
    /// - `Ok(None)` - Source ended (normal termination)
    /// - `Err(e)` - Error occurred
    async fn next_segment(&mut self) -> Result<Option<CapturedSegment>>;

    /// Segments lost before they could be queued (e.g. a full capture queue).
    fn dropped_segments(&self) -> u64 {
        0
    }
}
