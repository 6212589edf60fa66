// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out of one series to several aliased names

use super::{PipelineError, Processor};
use crate::protocol::Series;

/// Yield a renamed copy of `series` once per alias, in alias order
///
/// Stops at the first alias for which the processor returns `Ok(false)` or
/// an error, and returns that result unchanged. An empty alias list yields
/// nothing and returns `Ok(true)`.
pub fn yield_to_processor(
    series: &Series,
    processor: &mut dyn Processor,
    aliases: &[String],
) -> Result<bool, PipelineError> {
    for alias in aliases {
        let renamed = series.renamed(alias);
        tracing::debug!(
            processor = processor.name(),
            series = %renamed.name,
            points = renamed.points.len(),
            "yielding"
        );
        match processor.yield_series(renamed) {
            Ok(true) => {}
            other => return other,
        }
    }
    Ok(true)
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
