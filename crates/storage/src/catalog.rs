// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Segment lists published by the sequencer for readers
//!
//! Only the sequencer writes; cursors copy a shard's entry when they open and
//! never see data appended afterwards.

use crate::segment::SegmentSpan;
use std::collections::BTreeMap;
use std::sync::RwLock;
use sw_core::{RequestNumber, ShardId};

/// Readable extent of one shard at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ShardSnapshot {
    pub segments: Vec<SegmentSpan>,
    pub end_offset: u64,
    pub next_request_number: RequestNumber,
}

impl ShardSnapshot {
    pub fn first_offset(&self) -> u64 {
        self.segments
            .first()
            .map(|s| s.base_offset)
            .unwrap_or(self.end_offset)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Catalog {
    shards: RwLock<BTreeMap<ShardId, ShardSnapshot>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, shard_id: ShardId, snapshot: ShardSnapshot) {
        let mut shards = self.shards.write().unwrap_or_else(|e| e.into_inner());
        shards.insert(shard_id, snapshot);
    }

    /// Extend the newest segment of a shard after an append
    pub fn publish_append(
        &self,
        shard_id: ShardId,
        base_offset: u64,
        len: u64,
        next_request_number: RequestNumber,
    ) {
        let mut shards = self.shards.write().unwrap_or_else(|e| e.into_inner());
        let Some(snapshot) = shards.get_mut(&shard_id) else {
            return;
        };
        if let Some(last) = snapshot.segments.last_mut() {
            if last.base_offset == base_offset {
                last.len = len;
                snapshot.end_offset = last.end_offset();
            }
        }
        snapshot.next_request_number = next_request_number;
    }

    /// Record a number assigned without a durable write
    pub fn publish_next_number(&self, shard_id: ShardId, next_request_number: RequestNumber) {
        let mut shards = self.shards.write().unwrap_or_else(|e| e.into_inner());
        if let Some(snapshot) = shards.get_mut(&shard_id) {
            snapshot.next_request_number = next_request_number;
        }
    }

    pub fn snapshot(&self, shard_id: ShardId) -> Option<ShardSnapshot> {
        let shards = self.shards.read().unwrap_or_else(|e| e.into_inner());
        shards.get(&shard_id).cloned()
    }

    pub fn all(&self) -> BTreeMap<ShardId, ShardSnapshot> {
        let shards = self.shards.read().unwrap_or_else(|e| e.into_inner());
        shards.clone()
    }
}
