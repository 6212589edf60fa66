// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{PipelineError, Processor};
use crate::protocol::Series;

/// Terminal sink that keeps everything it receives in memory
#[derive(Debug, Default)]
pub struct CollectingProcessor {
    series: Vec<Series>,
    closed: bool,
}

impl CollectingProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn into_series(self) -> Vec<Series> {
        self.series
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Processor for CollectingProcessor {
    fn yield_series(&mut self, series: Series) -> Result<bool, PipelineError> {
        if self.closed {
            return Err(PipelineError::Closed {
                stage: self.name().to_string(),
            });
        }
        self.series.push(series);
        Ok(true)
    }

    fn name(&self) -> &str {
        "CollectingProcessor"
    }

    fn close(&mut self) -> Result<(), PipelineError> {
        self.closed = true;
        Ok(())
    }
}
