// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mapping series onto shards

use sw_core::ShardId;

/// Decides which shard a series of a database is written to
pub trait ShardAssigner: Send + Sync {
    fn shard_for(&self, database: &str, series: &str) -> ShardId;

    fn shard_count(&self) -> u32;
}

/// Spreads series by CRC32 of `database/series`
///
/// The mapping only depends on the names and the shard count, so it is
/// stable across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashShardAssigner {
    shard_count: u32,
}

impl HashShardAssigner {
    /// A zero count is treated as a single shard
    pub fn new(shard_count: u32) -> Self {
        Self {
            shard_count: shard_count.max(1),
        }
    }
}

impl ShardAssigner for HashShardAssigner {
    fn shard_for(&self, database: &str, series: &str) -> ShardId {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(database.as_bytes());
        hasher.update(b"/");
        hasher.update(series.as_bytes());
        ShardId(hasher.finalize() % self.shard_count)
    }

    fn shard_count(&self) -> u32 {
        self.shard_count
    }
}

#[cfg(test)]
#[path = "shard_tests.rs"]
mod tests;
