//! Passive decoder for a game server's TCP wire protocol.
//!
//! Resonance Tap reassembles captured TCP segments of the game-server
//! connection and extracts enemy attribute updates (name, current HP, max HP)
//! for downstream consumers. It never transmits anything.
//!
//! # Features
//!
//! - **Reassembly**: out-of-order and overlapping segments, sequence wraparound
//! - **Server identification**: login-response and service-signature heuristics
//! - **Framing**: length-prefixed frames, nested FrameDown streams, zstd bodies
//! - **Async delivery**: Tokio driver with broadcast event streams
//!
//! # Architecture
//!
//! ```text
//! capture ──► SegmentSource ──► Driver ──► Analyzer::ingest ──► broadcast ──► TapConnection
//!                                  │
//!                                  └─ sweep / stats tasks
//! ```
//!
//! The synchronous [`Analyzer`] can be used on its own when the host already
//! has its own threading model.
//!
//! ## Example (replay)
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use resonance_tap::{Tap, TapConfig};
//!
//! # async fn run(segments: Vec<resonance_tap::CapturedSegment>) -> resonance_tap::Result<()> {
//! let connection = Tap::replay(segments, TapConfig::default()).await?;
//! let mut updates = connection.enemy_updates();
//!
//! while let Some(update) = updates.next().await {
//!     println!("{}: hp={:?}", update.entity_id, update.hp);
//! }
//! # Ok(())
//! # }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Decoding pipeline
pub mod analyzer;
pub mod entity;
pub mod names;
pub mod reassembly;
pub mod schema;
pub mod wire;

// Stream-based capture architecture
pub mod connection;
pub mod driver;
pub mod provider;
pub mod providers;

// Ambient
pub mod cache;
pub mod config;
pub mod logging;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use analyzer::{Analyzer, AnalyzerStats};
pub use cache::{EnemySnapshot, EnemyTable};
pub use config::TapConfig;
pub use connection::TapConnection;
pub use logging::{LogOptions, init_logging};
pub use names::{MonsterNames, NameTable};
pub use provider::SegmentSource;
pub use providers::{ChannelSource, ReplaySource, SegmentSender};
pub use schema::{MessageDecoder, MessageKind, ProstDecoder};

/// Unified entry point for tap connections.
///
/// # Examples
///
/// ## Live capture
/// ```rust,no_run
/// use resonance_tap::{Tap, TapConfig};
///
/// # async fn run() -> resonance_tap::Result<()> {
/// let (sender, connection) = Tap::capture(TapConfig::default()).await?;
/// // Hand `sender` to the packet-capture thread; read `connection.events()`.
/// # Ok(())
/// # }
/// ```
pub struct Tap;

impl Tap {
    /// Open a connection fed by a bounded capture queue.
    ///
    /// The returned [`SegmentSender`] never blocks; segments that do not fit
    /// in the queue are dropped and counted in [`AnalyzerStats`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the configured
    /// monster name table cannot be loaded.
    pub async fn capture(config: TapConfig) -> Result<(SegmentSender, TapConnection)> {
        TapConnection::capture(config).await
    }

    /// Replay recorded segments through the pipeline.
    ///
    /// # Errors
    ///
    /// Same as [`Tap::capture`].
    pub async fn replay<I>(segments: I, config: TapConfig) -> Result<TapConnection>
    where
        I: IntoIterator<Item = CapturedSegment>,
    {
        TapConnection::open(ReplaySource::new(segments), config).await
    }
}
