//! Connection owning the capture pipeline
//!
//! [`TapConnection`] wires a [`SegmentSource`] to an [`Analyzer`] through the
//! [`Driver`] and exposes decoded events as streams.
//!
//! The first stream returned by [`TapConnection::events`] (or
//! [`TapConnection::enemy_updates`]) observes every event since the
//! connection was opened; later streams start at the moment they subscribe.
//! Streams end once the source is exhausted and all events are delivered.

use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::analyzer::{Analyzer, AnalyzerStats};
use crate::config::TapConfig;
use crate::driver::Driver;
use crate::provider::SegmentSource;
use crate::providers::{ChannelSource, SegmentSender};
use crate::types::{EnemyAttributeUpdate, FlowKey, TapEvent};

/// Running capture pipeline
pub struct TapConnection {
    analyzer: Arc<Analyzer>,

    /// Receiver created with the channel, handed to the first subscriber
    first_events: Mutex<Option<broadcast::Receiver<TapEvent>>>,

    /// Template for later subscribers
    events: broadcast::Receiver<TapEvent>,

    finished: watch::Receiver<bool>,

    /// Cancellation token for stopping tasks
    cancel: CancellationToken,
}

impl TapConnection {
    /// Start processing segments from `source`.
    pub async fn open<S: SegmentSource>(source: S, config: TapConfig) -> Result<Self> {
        let analyzer = Arc::new(Analyzer::new(&config)?);
        Ok(Self::with_analyzer(source, analyzer, &config))
    }

    /// Open a connection fed through a bounded capture queue.
    ///
    /// The returned [`SegmentSender`] is meant for the packet-capture thread.
    pub async fn capture(config: TapConfig) -> Result<(SegmentSender, Self)> {
        let (sender, source) = ChannelSource::new(config.segment_capacity);
        let connection = Self::open(source, config).await?;
        Ok((sender, connection))
    }

    /// Start processing segments with a pre-built analyzer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_analyzer<S: SegmentSource>(
        source: S,
        analyzer: Arc<Analyzer>,
        config: &TapConfig,
    ) -> Self {
        let channels = Driver::spawn(source, Arc::clone(&analyzer), config);
        info!("Tap connection opened");

        Self {
            analyzer,
            events: channels.events.resubscribe(),
            first_events: Mutex::new(Some(channels.events)),
            finished: channels.finished,
            cancel: channels.cancel,
        }
    }

    /// Stream of every decoded event.
    pub fn events(&self) -> BoxStream<'static, TapEvent> {
        let receiver = self.first_events.lock().take().unwrap_or_else(|| self.events.resubscribe());
        BroadcastStream::new(receiver)
            .filter_map(|result| async move {
                match result {
                    Ok(event) => Some(event),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!("Event subscriber lagged; skipped {} events", skipped);
                        None
                    }
                }
            })
            .boxed()
    }

    /// Stream of enemy updates only.
    pub fn enemy_updates(&self) -> BoxStream<'static, EnemyAttributeUpdate> {
        self.events()
            .filter_map(|event| async move {
                match event {
                    TapEvent::EnemyUpdate(update) => Some(update),
                    TapEvent::ServerChanged(_) => None,
                }
            })
            .boxed()
    }

    /// External server-change signal: forget the current server and all
    /// buffered stream data.
    pub fn reset(&self) {
        self.analyzer.clear();
    }

    pub fn stats(&self) -> AnalyzerStats {
        self.analyzer.stats()
    }

    pub fn current_flow(&self) -> Option<FlowKey> {
        self.analyzer.current_flow()
    }

    pub fn analyzer(&self) -> &Arc<Analyzer> {
        &self.analyzer
    }

    /// Wait until the source has ended and every segment has been ingested.
    pub async fn finished(&self) {
        let mut finished = self.finished.clone();
        let _ = finished.wait_for(|done| *done).await;
    }

    /// Stop all pipeline tasks.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for TapConnection {
    fn drop(&mut self) {
        debug!("Dropping tap connection");
        self.cancel.cancel();
    }
}
