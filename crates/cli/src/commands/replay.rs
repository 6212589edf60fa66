// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay command

use crate::output::{self, OutputFormat};
use clap::Args;
use serde::Serialize;
use std::fmt;
use sw_core::{LimitProcessor, Processor, RequestKind, Series, SeriesWriter, ShardId};
use sw_engine::stream_replay;
use sw_storage::{ReplayCursor, ReplayFrom, ReplayRequest, WalConfig};

#[derive(Args)]
pub struct ReplayArgs {
    /// Shard to replay
    #[arg(long)]
    pub shard: u32,

    /// Resume from this offset (the end offset of the last request handled)
    #[arg(long)]
    pub from: Option<u64>,

    /// Stream series through the processor pipeline instead of listing records
    #[arg(long)]
    pub series: bool,

    /// Stop after this many points
    #[arg(long, requires = "series")]
    pub limit: Option<usize>,
}

const HEADER: &str = "  NUMBER      START        END SERVER KIND          DATABASE         POINTS";

#[derive(Serialize)]
struct RecordRow {
    request_number: u64,
    start_offset: u64,
    end_offset: u64,
    server_id: u32,
    kind: RequestKind,
    database: String,
    series: usize,
    points: usize,
}

impl From<&ReplayRequest> for RecordRow {
    fn from(replayed: &ReplayRequest) -> Self {
        Self {
            request_number: replayed.request_number.0,
            start_offset: replayed.start_offset,
            end_offset: replayed.end_offset,
            server_id: replayed.server_id.0,
            kind: replayed.request.kind,
            database: replayed.request.database.clone(),
            series: replayed.request.series.len(),
            points: replayed.request.point_count(),
        }
    }
}

impl fmt::Display for RecordRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            RequestKind::Write => "write",
            RequestKind::Delete => "delete",
            RequestKind::Query => "query",
            RequestKind::DropDatabase => "drop_database",
        };
        write!(
            f,
            "{:>8} {:>10} {:>10} {:>6} {:<13} {:<16} {:>6}",
            self.request_number,
            self.start_offset,
            self.end_offset,
            self.server_id,
            kind,
            self.database,
            self.points
        )
    }
}

pub fn handle(config: &WalConfig, args: ReplayArgs, format: OutputFormat) -> anyhow::Result<()> {
    let from = args.from.map_or(ReplayFrom::Start, ReplayFrom::Offset);
    let cursor = ReplayCursor::open(&config.dir, ShardId(args.shard), from)?;
    if args.series {
        return stream_series(cursor, args.limit, format);
    }

    let mut printed = 0usize;
    for replayed in cursor {
        let replayed = replayed?;
        if printed == 0 && format == OutputFormat::Text {
            println!("{}", HEADER);
        }
        output::print(&RecordRow::from(&replayed), format);
        printed += 1;
    }
    if printed == 0 && format == OutputFormat::Text {
        println!("No records");
    }
    Ok(())
}

fn stream_series(
    cursor: ReplayCursor,
    limit: Option<usize>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let writer = SeriesWriter::new(move |series: Series| -> Result<(), serde_json::Error> {
        match format {
            OutputFormat::Text => println!("{} ({} point(s))", series.name, series.points.len()),
            OutputFormat::Json => println!("{}", serde_json::to_string(&series)?),
        }
        Ok(())
    });
    let mut pipeline: Box<dyn Processor> = match limit {
        Some(max_points) => Box::new(LimitProcessor::new(writer, max_points)),
        None => Box::new(writer),
    };

    let progress = stream_replay(cursor, pipeline.as_mut()).map_err(|e| {
        let offset = e.resume_offset();
        anyhow::Error::new(e).context(format!("replay stopped; resume from offset {offset}"))
    })?;
    eprintln!(
        "{} request(s), {} series; resume from offset {}",
        progress.requests, progress.series, progress.resume_offset
    );
    Ok(())
}
