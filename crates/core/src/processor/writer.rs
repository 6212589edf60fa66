// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{PipelineError, Processor};
use crate::protocol::Series;

/// Terminal sink that hands each series to a callback
///
/// Used by response writers: the callback serializes the series to
/// whatever the caller is writing to. A callback error aborts the pipeline.
pub struct SeriesWriter<F> {
    write: F,
    closed: bool,
}

impl<F, E> SeriesWriter<F>
where
    F: FnMut(Series) -> Result<(), E> + Send,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    pub fn new(write: F) -> Self {
        Self {
            write,
            closed: false,
        }
    }
}

impl<F, E> Processor for SeriesWriter<F>
where
    F: FnMut(Series) -> Result<(), E> + Send,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn yield_series(&mut self, series: Series) -> Result<bool, PipelineError> {
        if self.closed {
            return Err(PipelineError::Closed {
                stage: self.name().to_string(),
            });
        }
        (self.write)(series).map_err(|e| PipelineError::Sink {
            stage: "SeriesWriter".to_string(),
            source: e.into(),
        })?;
        Ok(true)
    }

    fn name(&self) -> &str {
        "SeriesWriter"
    }

    fn close(&mut self) -> Result<(), PipelineError> {
        self.closed = true;
        Ok(())
    }
}
