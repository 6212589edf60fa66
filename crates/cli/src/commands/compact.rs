// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compact command

use crate::output::{self, OutputFormat};
use serde::Serialize;
use std::fmt;
use sw_storage::{CompactionReport, Wal, WalConfig};

#[derive(Serialize)]
#[serde(transparent)]
struct CompactRow(CompactionReport);

impl fmt::Display for CompactRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "removed {} segment(s), reclaimed {} byte(s)",
            self.0.segments_removed, self.0.bytes_reclaimed
        )
    }
}

/// Open the WAL (recovering it), compact, and shut down cleanly
pub async fn handle(config: WalConfig, format: OutputFormat) -> anyhow::Result<()> {
    let wal = Wal::open(config)?;
    let report = match wal.handle().compact().await {
        Ok(confirmation) => confirmation.wait().await,
        Err(e) => Err(e),
    };
    wal.shutdown_async().await?;

    output::print(&CompactRow(report?), format);
    Ok(())
}
