// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable bookkeeping kept next to the shard logs
//!
//! `wal-state.json` holds what cannot be derived from the segments alone:
//! recorded bookmarks, per-server low-water marks and the next request number
//! of every shard as of the last write. It is replaced atomically (temp file,
//! fsync, rename) so a crash leaves either the old or the new version.

use crate::error::WalError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use sw_core::{RequestNumber, ServerId, ShardId};

pub const STATE_FILE_NAME: &str = "wal-state.json";

/// A recorded position of every shard log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: u64,
    pub taken_at: DateTime<Utc>,
    /// End offset of each shard log when the bookmark was taken
    pub offsets: BTreeMap<ShardId, u64>,
    /// Next request number of each shard when the bookmark was taken
    pub next_request_numbers: BTreeMap<ShardId, RequestNumber>,
}

impl Bookmark {
    /// Recorded end offset of a shard (0 if the shard did not exist yet)
    pub fn offset(&self, shard_id: ShardId) -> u64 {
        self.offsets.get(&shard_id).copied().unwrap_or(0)
    }

    pub fn next_request_number(&self, shard_id: ShardId) -> RequestNumber {
        self.next_request_numbers
            .get(&shard_id)
            .copied()
            .unwrap_or(RequestNumber::FIRST)
    }
}

/// Per-shard bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardState {
    pub next_request_number: RequestNumber,
    #[serde(default)]
    pub low_water_marks: BTreeMap<ServerId, RequestNumber>,
}

impl Default for ShardState {
    fn default() -> Self {
        Self {
            next_request_number: RequestNumber::FIRST,
            low_water_marks: BTreeMap::new(),
        }
    }
}

/// Contents of `wal-state.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalState {
    pub version: u32,
    pub next_bookmark_id: u64,
    /// Oldest first
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
    #[serde(default)]
    pub shards: BTreeMap<ShardId, ShardState>,
}

impl Default for WalState {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            next_bookmark_id: 1,
            bookmarks: Vec::new(),
            shards: BTreeMap::new(),
        }
    }
}

impl WalState {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn path(dir: &Path) -> PathBuf {
        dir.join(STATE_FILE_NAME)
    }

    /// Load the state of a WAL directory; a missing file is a fresh state
    pub fn load(dir: &Path) -> Result<Self, WalError> {
        let file = match File::open(Self::path(dir)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let state: WalState = serde_json::from_reader(BufReader::new(file))?;
        if state.version != Self::CURRENT_VERSION {
            return Err(WalError::Config(format!(
                "unsupported state version: {} (expected {})",
                state.version,
                Self::CURRENT_VERSION
            )));
        }
        Ok(state)
    }

    /// Atomically replace the state file
    pub fn save(&self, dir: &Path) -> Result<(), WalError> {
        self.write_atomic(dir)
            .map_err(|source| WalError::Persist {
                what: "wal state",
                source,
            })
    }

    fn write_atomic(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        let path = Self::path(dir);
        let temp_path = path.with_extension("json.tmp");

        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }

        // Rename is atomic on POSIX
        fs::rename(&temp_path, &path)
    }

    pub fn shard(&self, shard_id: ShardId) -> Option<&ShardState> {
        self.shards.get(&shard_id)
    }

    pub fn shard_mut(&mut self, shard_id: ShardId) -> &mut ShardState {
        self.shards.entry(shard_id).or_default()
    }

    pub fn low_water_mark(&self, server_id: ServerId, shard_id: ShardId) -> Option<RequestNumber> {
        self.shards
            .get(&shard_id)
            .and_then(|s| s.low_water_marks.get(&server_id))
            .copied()
    }

    pub fn latest_bookmark(&self) -> Option<&Bookmark> {
        self.bookmarks.last()
    }

    /// Record a new bookmark, keeping only the newest `keep`
    pub fn push_bookmark(
        &mut self,
        offsets: BTreeMap<ShardId, u64>,
        next_request_numbers: BTreeMap<ShardId, RequestNumber>,
        keep: usize,
    ) -> Bookmark {
        let bookmark = Bookmark {
            id: self.next_bookmark_id,
            taken_at: Utc::now(),
            offsets,
            next_request_numbers,
        };
        self.next_bookmark_id += 1;
        self.bookmarks.push(bookmark.clone());

        let keep = keep.max(1);
        if self.bookmarks.len() > keep {
            let excess = self.bookmarks.len() - keep;
            self.bookmarks.drain(..excess);
        }
        bookmark
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
