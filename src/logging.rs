//! Tracing subscriber setup for hosts that do not install their own.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{Result, TapError};

/// Options for [`init_logging`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Default to `debug` instead of `info` when `RUST_LOG` is unset.
    pub debug: bool,
    /// Include the module path of each event.
    pub with_target: bool,
}

impl LogOptions {
    fn default_directive(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }

    /// Filter from `RUST_LOG`, falling back to the default level.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

/// Install a global fmt subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(options: LogOptions) -> Result<()> {
    tracing_subscriber::registry()
        .with(options.filter())
        .with(tracing_subscriber::fmt::layer().with_target(options.with_target))
        .try_init()
        .map_err(|e| TapError::Logging { reason: e.to_string() })
}
