// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{Next, PipelineError, Processor};
use crate::protocol::Series;

/// Forwarding stage that stops the pipeline once a point budget is spent
///
/// A series that would exceed the budget is cut down to the remaining
/// points before being forwarded.
pub struct LimitProcessor<P> {
    inner: P,
    remaining: usize,
}

impl<P: Processor> LimitProcessor<P> {
    pub fn new(inner: P, max_points: usize) -> Self {
        Self {
            inner,
            remaining: max_points,
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Processor> Processor for LimitProcessor<P> {
    fn yield_series(&mut self, mut series: Series) -> Result<bool, PipelineError> {
        if self.remaining == 0 {
            return Ok(false);
        }
        series.points.truncate(self.remaining);
        self.remaining -= series.points.len();

        let keep_going = self.inner.yield_series(series)?;
        Ok(keep_going && self.remaining > 0)
    }

    fn name(&self) -> &str {
        "LimitProcessor"
    }

    fn close(&mut self) -> Result<(), PipelineError> {
        self.inner.close()
    }

    fn next(&self) -> Next<'_> {
        Next::Stage(&self.inner)
    }
}
