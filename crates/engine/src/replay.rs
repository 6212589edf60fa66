// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming a shard's log into a processor pipeline

use crate::error::ReplayStreamError;
use sw_core::{PipelineError, Processor};
use sw_storage::{ReplayCursor, ReplayError};

/// How far a replay got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayProgress {
    /// Requests whose series were all delivered
    pub requests: u64,
    /// Series accepted by the pipeline
    pub series: u64,
    /// Offset to pass back to resume after the last delivered request
    pub resume_offset: u64,
    /// True if the pipeline asked to stop before the log ran out
    pub stopped_early: bool,
}

/// Push every series of every replayed request into `processor`, then close it
///
/// A request that was only partly delivered when the pipeline stopped is not
/// counted; `resume_offset` points at its start so a resumed replay delivers
/// it again. `close` is called on every path.
pub fn stream_replay(
    mut cursor: ReplayCursor,
    processor: &mut dyn Processor,
) -> Result<ReplayProgress, ReplayStreamError> {
    let shard_id = cursor.shard_id();
    let mut progress = ReplayProgress {
        requests: 0,
        series: 0,
        resume_offset: cursor.position(),
        stopped_early: false,
    };

    let streamed = push_requests(&mut cursor, processor, &mut progress);
    let closed = processor.close();

    let failure = match (streamed, closed) {
        (Ok(()), Ok(())) => None,
        (Ok(()), Err(e)) => Some(Failure::Pipeline(e)),
        (Err(failure), Ok(())) => Some(failure),
        (Err(failure), Err(close_err)) => {
            tracing::warn!(stage = processor.name(), error = %close_err, "close failed after abort");
            Some(failure)
        }
    };

    tracing::debug!(
        shard = %shard_id,
        requests = progress.requests,
        series = progress.series,
        resume_offset = progress.resume_offset,
        "replay streamed"
    );
    match failure {
        None => Ok(progress),
        Some(Failure::Replay(source)) => Err(ReplayStreamError::Replay {
            source,
            resume_offset: progress.resume_offset,
        }),
        Some(Failure::Pipeline(source)) => Err(ReplayStreamError::Pipeline {
            shard_id,
            source,
            resume_offset: progress.resume_offset,
        }),
    }
}

enum Failure {
    Replay(ReplayError),
    Pipeline(PipelineError),
}

fn push_requests(
    cursor: &mut ReplayCursor,
    processor: &mut dyn Processor,
    progress: &mut ReplayProgress,
) -> Result<(), Failure> {
    for replayed in cursor {
        let replayed = replayed.map_err(Failure::Replay)?;
        let end_offset = replayed.end_offset;
        let total = replayed.request.series.len();
        for (i, series) in replayed.request.series.into_iter().enumerate() {
            let keep_going = processor.yield_series(series).map_err(Failure::Pipeline)?;
            progress.series += 1;
            if !keep_going {
                progress.stopped_early = true;
                if i + 1 == total {
                    progress.requests += 1;
                    progress.resume_offset = end_offset;
                }
                return Ok(());
            }
        }
        progress.requests += 1;
        progress.resume_offset = end_offset;
    }
    Ok(())
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
