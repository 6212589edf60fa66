// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{Next, PipelineError, Processor};
use crate::point_range::PointRange;
use crate::protocol::Series;

/// Forwarding stage that records the time range of everything passing through
pub struct PointRangeProcessor<P> {
    inner: P,
    range: PointRange,
}

impl<P: Processor> PointRangeProcessor<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            range: PointRange::new(),
        }
    }

    pub fn range(&self) -> PointRange {
        self.range
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Processor> Processor for PointRangeProcessor<P> {
    fn yield_series(&mut self, series: Series) -> Result<bool, PipelineError> {
        for point in &series.points {
            self.range.update(point);
        }
        self.inner.yield_series(series)
    }

    fn name(&self) -> &str {
        "PointRangeProcessor"
    }

    fn close(&mut self) -> Result<(), PipelineError> {
        self.inner.close()
    }

    fn next(&self) -> Next<'_> {
        Next::Stage(&self.inner)
    }
}
