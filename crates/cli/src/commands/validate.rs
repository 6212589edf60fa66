// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validate and repair commands

use crate::output::{self, OutputFormat};
use anyhow::bail;
use clap::Args;
use serde::Serialize;
use std::fmt;
use sw_core::ShardId;
use sw_storage::{repair_shard, shard_ids, validate_shard, ShardValidation, WalConfig};

#[derive(Args)]
pub struct ValidateArgs {
    /// Only check this shard
    #[arg(long)]
    pub shard: Option<u32>,
}

#[derive(Args)]
pub struct RepairArgs {
    /// Only repair this shard
    #[arg(long)]
    pub shard: Option<u32>,
}

#[derive(Serialize)]
struct Corruption {
    offset: u64,
    reason: String,
}

#[derive(Serialize)]
struct ValidationRow {
    shard_id: u32,
    segments: usize,
    records: u64,
    last_request_number: Option<u64>,
    end_offset: u64,
    corruption: Option<Corruption>,
}

impl From<ShardValidation> for ValidationRow {
    fn from(validation: ShardValidation) -> Self {
        Self {
            shard_id: validation.shard_id.0,
            segments: validation.segments,
            records: validation.valid_records,
            last_request_number: validation.last_request_number.map(|n| n.0),
            end_offset: validation.end_offset,
            corruption: validation.corruption.map(|c| Corruption {
                offset: c.offset,
                reason: c.reason,
            }),
        }
    }
}

impl fmt::Display for ValidationRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self
            .last_request_number
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        write!(
            f,
            "{:<8} {:>8} {:>8} {:>8} {:>12} ",
            self.shard_id, self.segments, self.records, last, self.end_offset
        )?;
        match &self.corruption {
            None => write!(f, "ok"),
            Some(c) => write!(f, "corrupt at {}: {}", c.offset, c.reason),
        }
    }
}

#[derive(Serialize)]
struct RepairRow {
    shard_id: u32,
    bytes_removed: u64,
}

impl fmt::Display for RepairRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard {}: removed {} byte(s)", self.shard_id, self.bytes_removed)
    }
}

fn target_shards(config: &WalConfig, shard: Option<u32>) -> anyhow::Result<Vec<ShardId>> {
    match shard {
        Some(shard) => Ok(vec![ShardId(shard)]),
        None => Ok(shard_ids(&config.dir)?),
    }
}

pub fn validate(
    config: &WalConfig,
    args: ValidateArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut rows = Vec::new();
    for shard_id in target_shards(config, args.shard)? {
        rows.push(ValidationRow::from(validate_shard(&config.dir, shard_id)?));
    }
    output::print_list(
        "SHARD    SEGMENTS  RECORDS     LAST   END OFFSET STATUS",
        "No shards",
        &rows,
        format,
    );

    let corrupt = rows.iter().filter(|r| r.corruption.is_some()).count();
    if corrupt > 0 {
        bail!("{} shard(s) failed validation; run `sw repair` to truncate", corrupt);
    }
    Ok(())
}

pub fn repair(config: &WalConfig, args: RepairArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut rows = Vec::new();
    for shard_id in target_shards(config, args.shard)? {
        let bytes_removed = repair_shard(&config.dir, shard_id)?;
        if bytes_removed > 0 {
            tracing::warn!(shard = %shard_id, bytes_removed, "repaired shard log");
        }
        rows.push(RepairRow {
            shard_id: shard_id.0,
            bytes_removed,
        });
    }
    match format {
        OutputFormat::Text if rows.is_empty() => println!("No shards"),
        _ => {
            for row in &rows {
                output::print(row, format);
            }
        }
    }
    Ok(())
}
