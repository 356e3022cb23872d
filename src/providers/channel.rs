//! Channel-backed source fed by a capture callback
//!
//! Packet capture runs on its own thread and must never block. It holds a
//! [`SegmentSender`] and calls [`SegmentSender::try_send`] for every TCP
//! segment; when the queue is full the segment is dropped and counted.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, trace};

use crate::provider::SegmentSource;
use crate::types::CapturedSegment;
use crate::{Result, TapError};

/// Producer half handed to the capture collaborator.
#[derive(Debug, Clone)]
pub struct SegmentSender {
    tx: mpsc::Sender<CapturedSegment>,
    dropped: Arc<AtomicU64>,
}

impl SegmentSender {
    /// Queue a segment without blocking.
    ///
    /// Returns `Ok(false)` when the queue was full and the segment dropped,
    /// and [`TapError::SourceClosed`] once the consumer is gone.
    pub fn try_send(&self, segment: CapturedSegment) -> Result<bool> {
        match self.tx.try_send(segment) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(segment)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                trace!("Capture queue full; dropped segment {} ({} total)", segment.seq, dropped);
                Ok(false)
            }
            Err(TrySendError::Closed(_)) => Err(TapError::SourceClosed),
        }
    }

    /// Queue a segment, waiting for capacity.
    pub async fn send(&self, segment: CapturedSegment) -> Result<()> {
        self.tx.send(segment).await.map_err(|_| TapError::SourceClosed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, driven by the [`Driver`](crate::driver::Driver).
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<CapturedSegment>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSource {
    /// Create a source with a bounded queue of `capacity` segments.
    pub fn new(capacity: usize) -> (SegmentSender, ChannelSource) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let dropped = Arc::new(AtomicU64::new(0));
        debug!("Capture queue created with capacity {}", capacity);
        (SegmentSender { tx, dropped: Arc::clone(&dropped) }, ChannelSource { rx, dropped })
    }
}

#[async_trait::async_trait]
impl SegmentSource for ChannelSource {
    async fn next_segment(&mut self) -> Result<Option<CapturedSegment>> {
        Ok(self.rx.recv().await)
    }

    fn dropped_segments(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::server_flow;

    fn segment(seq: u32) -> CapturedSegment {
        CapturedSegment::new(server_flow(), seq, 0, vec![1, 2, 3])
    }

    #[tokio::test]
    async fn segments_arrive_in_order() -> anyhow::Result<()> {
        let (tx, mut source) = ChannelSource::new(4);
        assert!(tx.try_send(segment(1))?);
        tx.send(segment(2)).await?;
        drop(tx);

        assert_eq!(source.next_segment().await?.map(|s| s.seq), Some(1));
        assert_eq!(source.next_segment().await?.map(|s| s.seq), Some(2));
        assert!(source.next_segment().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn full_queue_drops_and_counts() -> anyhow::Result<()> {
        let (tx, source) = ChannelSource::new(1);
        assert!(tx.try_send(segment(1))?);
        assert!(!tx.try_send(segment(2))?);
        assert!(!tx.try_send(segment(3))?);

        assert_eq!(tx.dropped(), 2);
        assert_eq!(source.dropped_segments(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn closed_source_is_reported() {
        let (tx, source) = ChannelSource::new(1);
        drop(source);
        assert!(tx.is_closed());
        assert!(matches!(tx.try_send(segment(1)), Err(TapError::SourceClosed)));
    }
}
