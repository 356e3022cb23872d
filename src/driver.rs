//! Driver spawns and manages capture processing tasks

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::analyzer::Analyzer;
use crate::config::TapConfig;
use crate::provider::SegmentSource;
use crate::types::TapEvent;

/// Result of spawning driver tasks
pub struct DriverChannels {
    /// First receiver of decoded events; sees everything published.
    pub events: broadcast::Receiver<TapEvent>,
    /// Flips to `true` once the source has ended and ingest has stopped.
    pub finished: watch::Receiver<bool>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Driver spawns and manages capture processing tasks
///
/// Three tasks share one [`Analyzer`]:
/// - ingest: owns the source, feeds every segment to the analyzer and
///   publishes the returned events (after the analyzer lock is released)
/// - sweep: evicts stale reassembly state on a fixed interval
/// - stats: periodically logs busy flows and pipeline counters
pub struct Driver;

impl Driver {
    /// Spawn driver tasks for the given source
    pub fn spawn<S>(source: S, analyzer: Arc<Analyzer>, config: &TapConfig) -> DriverChannels
    where
        S: SegmentSource,
    {
        let (event_tx, event_rx) = broadcast::channel(config.event_capacity.max(1));
        let (finished_tx, finished_rx) = watch::channel(false);
        let cancel = CancellationToken::new();

        let ingest_analyzer = Arc::clone(&analyzer);
        let ingest_cancel = cancel.clone();
        tokio::spawn(async move {
            Self::ingest_task(source, ingest_analyzer, event_tx, ingest_cancel).await;
            let _ = finished_tx.send(true);
        });

        let sweep_analyzer = Arc::clone(&analyzer);
        let sweep_cancel = cancel.clone();
        let sweep_interval = config.sweep_interval();
        tokio::spawn(async move {
            Self::sweep_task(sweep_analyzer, sweep_interval, sweep_cancel).await;
        });

        let stats_cancel = cancel.clone();
        let stats_interval = config.stats_interval();
        let min_segments = config.stats_min_segments;
        tokio::spawn(async move {
            Self::stats_task(analyzer, stats_interval, min_segments, stats_cancel).await;
        });

        DriverChannels { events: event_rx, finished: finished_rx, cancel }
    }

    /// Ingest task - reads segments and publishes decoded events
    async fn ingest_task<S>(
        mut source: S,
        analyzer: Arc<Analyzer>,
        events: broadcast::Sender<TapEvent>,
        cancel: CancellationToken,
    ) where
        S: SegmentSource,
    {
        info!("Ingest task started");
        let mut segment_count = 0u64;
        let mut error_count = 0u32;
        let mut dropped_seen = 0u64;
        const MAX_ERRORS: u32 = 10;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Ingest cancelled");
                    break;
                }
                result = source.next_segment() => result,
            };

            match result {
                Ok(Some(segment)) => {
                    segment_count += 1;
                    error_count = 0;

                    let decoded = analyzer.ingest(&segment);
                    for event in decoded {
                        if events.send(event).is_err() {
                            trace!("No event subscribers");
                        }
                    }

                    let dropped = source.dropped_segments();
                    if dropped > dropped_seen {
                        analyzer.record_dropped(dropped - dropped_seen);
                        dropped_seen = dropped;
                    }
                }
                Ok(None) => {
                    info!("Segment source ended after {} segments", segment_count);
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    error!("Source error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("Too many source errors, shutting down");
                        break;
                    }

                    // Exponential backoff: 50ms, 100ms, 200ms, ...
                    let backoff = std::time::Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        // Sweep and stats have nothing left to watch.
        cancel.cancel();
        info!("Ingest task ended (processed {} segments)", segment_count);
    }

    /// Sweep task - evicts stale reassembly state
    async fn sweep_task(
        analyzer: Arc<Analyzer>,
        period: std::time::Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    analyzer.sweep(tokio::time::Instant::now().into_std());
                }
            }
        }
        debug!("Sweep task ended");
    }

    /// Stats task - logs flow activity
    async fn stats_task(
        analyzer: Arc<Analyzer>,
        period: std::time::Duration,
        min_segments: u64,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    for (flow, count) in analyzer.busy_flows(min_segments) {
                        info!("Flow {}: {} segments", flow, count);
                    }
                    let stats = analyzer.stats();
                    info!(
                        "Segments seen={} streamed={} dropped={}, frames={}, events={}",
                        stats.segments_seen,
                        stats.segments_streamed,
                        stats.segments_dropped,
                        stats.frames_decoded,
                        stats.events_emitted
                    );
                }
            }
        }
        debug!("Stats task ended");
    }
}
