// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shards command

use crate::output::{self, OutputFormat};
use serde::Serialize;
use std::fmt;
use sw_storage::{shard_ids, validate_shard, WalConfig};

#[derive(Serialize)]
struct ShardRow {
    shard_id: u32,
    segments: usize,
    first_offset: u64,
    end_offset: u64,
    last_request_number: Option<u64>,
}

impl fmt::Display for ShardRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self
            .last_request_number
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        write!(
            f,
            "{:<8} {:>8} {:>12} {:>12} {:>8}",
            self.shard_id, self.segments, self.first_offset, self.end_offset, last
        )
    }
}

/// Lists shards from the files on disk without opening the WAL
pub fn handle(config: &WalConfig, format: OutputFormat) -> anyhow::Result<()> {
    let mut rows = Vec::new();
    for shard_id in shard_ids(&config.dir)? {
        let validation = validate_shard(&config.dir, shard_id)?;
        rows.push(ShardRow {
            shard_id: shard_id.0,
            segments: validation.segments,
            first_offset: validation.first_offset,
            end_offset: validation.end_offset,
            last_request_number: validation.last_request_number.map(|n| n.0),
        });
    }
    output::print_list(
        "SHARD    SEGMENTS FIRST OFFSET   END OFFSET     LAST",
        "No shards",
        &rows,
        format,
    );
    Ok(())
}
