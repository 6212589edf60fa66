// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{PipelineError, Processor};
use crate::protocol::Series;

/// Sink for operations that must never produce data
///
/// Any series pushed into it is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NilProcessor;

impl Processor for NilProcessor {
    fn yield_series(&mut self, series: Series) -> Result<bool, PipelineError> {
        Err(PipelineError::UnexpectedYield {
            stage: self.name().to_string(),
            series: series.name,
        })
    }

    fn name(&self) -> &str {
        "NilProcessor"
    }

    fn close(&mut self) -> Result<(), PipelineError> {
        Ok(())
    }
}
