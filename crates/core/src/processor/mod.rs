// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push-style processor pipeline
//!
//! Every producer of series data (live writes, log replay, query results)
//! pushes into a [`Processor`] without knowing who consumes it.
//!
//! ```text
//! producer → Processor::yield_series → [forwarding stage] → ... → terminal sink
//! ```
//!
//! ## Stage contract
//!
//! - `Ok(true)`: keep going
//! - `Ok(false)`: the consumer has enough data; stop without error
//! - `Err(_)`: abort; the error is returned unchanged to whoever drives the pipeline
//!
//! The owner of a pipeline calls [`Processor::close`] exactly once when
//! streaming ends, whatever the outcome. Forwarding stages close their
//! downstream stage from their own `close`.

mod collect;
mod fanout;
mod limit;
mod nil;
mod range;
mod writer;

pub use collect::CollectingProcessor;
pub use fanout::yield_to_processor;
pub use limit::LimitProcessor;
pub use nil::NilProcessor;
pub use range::PointRangeProcessor;
pub use writer::SeriesWriter;

use crate::protocol::Series;
use thiserror::Error;

/// Errors a pipeline stage can return from `yield_series` or `close`
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} received unexpected data (series {series})")]
    UnexpectedYield { stage: String, series: String },
    #[error("{stage} failed: {source}")]
    Sink {
        stage: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("{stage} is closed")]
    Closed { stage: String },
}

/// The stage following a processor in its chain
pub enum Next<'a> {
    /// End of the chain
    Terminal,
    /// Another stage receives what this one forwards
    Stage(&'a dyn Processor),
}

impl Next<'_> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Next::Terminal)
    }
}

/// A pipeline stage that accepts series pushed by a producer
pub trait Processor: Send {
    /// Push one series into this stage
    fn yield_series(&mut self, series: Series) -> Result<bool, PipelineError>;

    /// Stage name for diagnostics
    fn name(&self) -> &str;

    /// Release any resources the stage holds
    fn close(&mut self) -> Result<(), PipelineError>;

    /// The stage this one forwards to
    fn next(&self) -> Next<'_> {
        Next::Terminal
    }
}

/// Names of every stage from `head` to the terminal sink
pub fn chain_names(head: &dyn Processor) -> Vec<String> {
    let mut names = vec![head.name().to_string()];
    let mut current = head.next();
    while let Next::Stage(stage) = current {
        names.push(stage.name().to_string());
        current = stage.next();
    }
    names
}

/// Result of driving a sequence of series through a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveOutcome {
    /// Series accepted by the head stage
    pub yielded: usize,
    /// False if a stage asked to stop before the input ran out
    pub completed: bool,
}

/// Push every series into `processor`, then close it
///
/// Stops at the first `Ok(false)` or `Err`. `close` is called on every
/// path; a yield error takes precedence over a close error, which is only
/// logged in that case.
pub fn drive<I>(series: I, processor: &mut dyn Processor) -> Result<DriveOutcome, PipelineError>
where
    I: IntoIterator<Item = Series>,
{
    let streamed = push_all(series, processor);
    let closed = processor.close();

    match (streamed, closed) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::warn!(stage = processor.name(), error = %close_err, "close failed after abort");
            Err(e)
        }
    }
}

fn push_all<I>(series: I, processor: &mut dyn Processor) -> Result<DriveOutcome, PipelineError>
where
    I: IntoIterator<Item = Series>,
{
    let mut yielded = 0;
    for s in series {
        let keep_going = processor.yield_series(s)?;
        yielded += 1;
        if !keep_going {
            return Ok(DriveOutcome {
                yielded,
                completed: false,
            });
        }
    }
    Ok(DriveOutcome {
        yielded,
        completed: true,
    })
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
