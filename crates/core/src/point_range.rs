// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time range covered by a set of points

use crate::protocol::Point;

/// Smallest and largest point timestamp seen so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointRange {
    bounds: Option<(i64, i64)>,
}

impl PointRange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widen the range to include the point's timestamp
    ///
    /// Points without a timestamp leave the range unchanged.
    pub fn update(&mut self, point: &Point) {
        let Some(ts) = point.timestamp_micros else {
            return;
        };
        self.bounds = Some(match self.bounds {
            None => (ts, ts),
            Some((start, end)) => (start.min(ts), end.max(ts)),
        });
    }

    pub fn start_micros(&self) -> Option<i64> {
        self.bounds.map(|(start, _)| start)
    }

    pub fn end_micros(&self) -> Option<i64> {
        self.bounds.map(|(_, end)| end)
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }
}

#[cfg(test)]
#[path = "point_range_tests.rs"]
mod tests;
