//! Runtime configuration
//!
//! Every field has a default matching the live game client's behavior, so an
//! empty document (or `TapConfig::default()`) is a working configuration.
//!
//! ```yaml
//! fragment_timeout_ms: 3000
//! max_frame_len: 1048575
//! monster_names: data/monster_names.json
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::{Result, TapError};

/// Service identifier carried by game Notify messages.
pub const GAME_SERVICE_ID: u64 = 0x0000_0000_6333_5342;

/// Largest frame length accepted before the stream is treated as corrupt.
pub const DEFAULT_MAX_FRAME_LEN: u32 = 0x0f_ffff;

/// Largest decompressed body accepted from a compressed envelope.
pub const DEFAULT_MAX_DECOMPRESSED: usize = 1024 * 1024;

/// Smallest frame that can carry an envelope header.
const MIN_FRAME_LEN: u32 = 6;

const MAX_NESTING_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TapConfig {
    /// Inactivity after which cached segments, then the whole flow, are dropped.
    pub fragment_timeout_ms: u64,
    pub sweep_interval_ms: u64,
    pub max_frame_len: u32,
    pub max_decompressed_bytes: usize,
    /// Recursion cap for FrameDown envelopes.
    pub max_nesting_depth: usize,
    pub game_service_id: u64,
    pub stats_interval_ms: u64,
    /// Flows with fewer segments are left out of the periodic summary.
    pub stats_min_segments: u64,
    pub event_capacity: usize,
    pub segment_capacity: usize,
    /// Monster name table (`{"<template id>": "<name>"}`).
    pub monster_names: Option<PathBuf>,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            fragment_timeout_ms: 3000,
            sweep_interval_ms: 3000,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_decompressed_bytes: DEFAULT_MAX_DECOMPRESSED,
            max_nesting_depth: 8,
            game_service_id: GAME_SERVICE_ID,
            stats_interval_ms: 30_000,
            stats_min_segments: 10,
            event_capacity: 1024,
            segment_capacity: 4096,
            monster_names: None,
        }
    }
}

impl TapConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(text)
                .map_err(|e| {
                    TapError::parse("Tap config", format!("Deserialization failed: {}", e))
                })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TapError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml_str(&text)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fragment_timeout_ms == 0 {
            return Err(TapError::config("fragment_timeout_ms must be non-zero"));
        }
        if self.sweep_interval_ms == 0 {
            return Err(TapError::config("sweep_interval_ms must be non-zero"));
        }
        if self.stats_interval_ms == 0 {
            return Err(TapError::config("stats_interval_ms must be non-zero"));
        }
        if self.max_frame_len < MIN_FRAME_LEN {
            return Err(TapError::config(format!(
                "max_frame_len must be at least {}, got {}",
                MIN_FRAME_LEN, self.max_frame_len
            )));
        }
        if self.max_decompressed_bytes == 0 {
            return Err(TapError::config("max_decompressed_bytes must be non-zero"));
        }
        if !(1..=MAX_NESTING_DEPTH).contains(&self.max_nesting_depth) {
            return Err(TapError::config(format!(
                "max_nesting_depth must be within 1..={}, got {}",
                MAX_NESTING_DEPTH, self.max_nesting_depth
            )));
        }
        if self.event_capacity == 0 || self.segment_capacity == 0 {
            return Err(TapError::config("Channel capacities must be non-zero"));
        }
        Ok(())
    }

    pub fn fragment_timeout(&self) -> Duration {
        Duration::from_millis(self.fragment_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }
}
