// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL configuration
//!
//! Loaded from the `[wal]` table of a TOML file:
//!
//! ```toml
//! [wal]
//! dir = "/var/lib/shardwal"
//! flush_after = 1
//! bookmark_after = 1000
//! ```

use crate::error::WalError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a [`Wal`](crate::Wal)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalConfig {
    /// Directory holding `wal-state.json` and one `shard-*` directory per shard
    pub dir: PathBuf,
    /// Entries the sequencer queue holds before submitters feel back-pressure
    pub queue_capacity: usize,
    /// Fsync after this many appends (1 = every append)
    pub flush_after: u64,
    /// Record a bookmark after this many appends (0 = never)
    pub bookmark_after: u64,
    /// Number of bookmarks kept in the state file
    pub bookmarks_to_keep: usize,
    /// Seal the active segment after this many records
    pub segment_max_records: u64,
    /// Seal the active segment once it reaches this size
    pub segment_max_bytes: u64,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("wal"),
            queue_capacity: 1024,
            flush_after: 1,
            bookmark_after: 0,
            bookmarks_to_keep: 8,
            segment_max_records: 10_000,
            segment_max_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    wal: Option<WalConfig>,
}

impl WalConfig {
    /// Default configuration rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Load the `[wal]` table from a TOML file
    pub fn load(path: &Path) -> Result<Self, WalError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse the `[wal]` table from TOML text; a missing table means defaults
    pub fn from_toml_str(text: &str) -> Result<Self, WalError> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| WalError::Config(e.to_string()))?;
        let config = file.wal.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the sequencer cannot work with
    pub fn validate(&self) -> Result<(), WalError> {
        if self.queue_capacity == 0 {
            return Err(WalError::Config("queue_capacity must be at least 1".into()));
        }
        if self.flush_after == 0 {
            return Err(WalError::Config("flush_after must be at least 1".into()));
        }
        if self.bookmarks_to_keep == 0 {
            return Err(WalError::Config("bookmarks_to_keep must be at least 1".into()));
        }
        if self.segment_max_records == 0 || self.segment_max_bytes == 0 {
            return Err(WalError::Config("segment limits must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
