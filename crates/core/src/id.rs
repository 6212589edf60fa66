// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifiers for shards, servers and sequenced requests

use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition of the dataset with its own log and request-number space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardId(pub u32);

/// Server that originated a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(pub u32);

/// Per-shard sequence number assigned by the sequencer
///
/// Numbering starts at 1. A number is never handed out twice for the same
/// shard, even when the append it was assigned to fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestNumber(pub u64);

impl RequestNumber {
    /// The first number assigned in an empty shard
    pub const FIRST: RequestNumber = RequestNumber(1);

    /// The number following this one
    pub fn next(self) -> RequestNumber {
        RequestNumber(self.0.saturating_add(1))
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RequestNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ShardId {
    fn from(value: u32) -> Self {
        ShardId(value)
    }
}

impl From<u32> for ServerId {
    fn from(value: u32) -> Self {
        ServerId(value)
    }
}

impl From<u64> for RequestNumber {
    fn from(value: u64) -> Self {
        RequestNumber(value)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
