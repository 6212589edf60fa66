// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entries submitted to the sequencer and the payloads they confirm with

use crate::confirmation::{self, Confirmation, Confirmer};
use crate::error::WalError;
use crate::state::Bookmark;
use serde::{Deserialize, Serialize};
use sw_core::{Request, RequestNumber, ServerId, ShardId};

/// A unit of work for the sequencer
///
/// Every variant owns the producer half of its confirmation, so the entry can
/// only ever be answered once.
#[derive(Debug)]
pub enum WalEntry {
    /// Assign the shard's next request number and (unless `assign_seq_only`)
    /// persist the request
    Append {
        request: Request,
        shard_id: ShardId,
        assign_seq_only: bool,
        confirm: Confirmer<Appended>,
    },
    /// Acknowledge that everything up to `request_number` from `server_id`
    /// has been applied downstream
    Commit {
        server_id: ServerId,
        shard_id: ShardId,
        request_number: RequestNumber,
        confirm: Confirmer<Committed>,
    },
    /// Record the current position of every shard
    Bookmark { confirm: Confirmer<Bookmark> },
    /// Seal every active segment, optionally bookmarking first
    Close {
        should_bookmark: bool,
        confirm: Confirmer<Closed>,
    },
    /// Drop sealed segments that are fully committed
    Compact { confirm: Confirmer<CompactionReport> },
}

impl WalEntry {
    pub fn append(
        request: Request,
        shard_id: ShardId,
        assign_seq_only: bool,
    ) -> (Self, Confirmation<Appended>) {
        let (confirm, confirmation) = confirmation::channel();
        let entry = WalEntry::Append {
            request,
            shard_id,
            assign_seq_only,
            confirm,
        };
        (entry, confirmation)
    }

    pub fn commit(
        server_id: ServerId,
        shard_id: ShardId,
        request_number: RequestNumber,
    ) -> (Self, Confirmation<Committed>) {
        let (confirm, confirmation) = confirmation::channel();
        let entry = WalEntry::Commit {
            server_id,
            shard_id,
            request_number,
            confirm,
        };
        (entry, confirmation)
    }

    pub fn bookmark() -> (Self, Confirmation<Bookmark>) {
        let (confirm, confirmation) = confirmation::channel();
        (WalEntry::Bookmark { confirm }, confirmation)
    }

    pub fn close(should_bookmark: bool) -> (Self, Confirmation<Closed>) {
        let (confirm, confirmation) = confirmation::channel();
        let entry = WalEntry::Close {
            should_bookmark,
            confirm,
        };
        (entry, confirmation)
    }

    pub fn compact() -> (Self, Confirmation<CompactionReport>) {
        let (confirm, confirmation) = confirmation::channel();
        (WalEntry::Compact { confirm }, confirmation)
    }

    /// Answer the entry with `SequencerStopped` without applying it
    pub(crate) fn refuse(self) {
        let answered = match self {
            WalEntry::Append { confirm, .. } => confirm.confirm(Err(WalError::SequencerStopped)),
            WalEntry::Commit { confirm, .. } => confirm.confirm(Err(WalError::SequencerStopped)),
            WalEntry::Bookmark { confirm } => confirm.confirm(Err(WalError::SequencerStopped)),
            WalEntry::Close { confirm, .. } => confirm.confirm(Err(WalError::SequencerStopped)),
            WalEntry::Compact { confirm } => confirm.confirm(Err(WalError::SequencerStopped)),
        };
        if !answered {
            tracing::debug!("refused entry was already abandoned");
        }
    }

    /// Short name used in tracing spans
    pub fn kind(&self) -> &'static str {
        match self {
            WalEntry::Append { .. } => "append",
            WalEntry::Commit { .. } => "commit",
            WalEntry::Bookmark { .. } => "bookmark",
            WalEntry::Close { .. } => "close",
            WalEntry::Compact { .. } => "compact",
        }
    }
}

/// Byte span of a durable record; `end_offset` is exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSpan {
    pub start_offset: u64,
    pub end_offset: u64,
}

/// Result of a successful append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    pub shard_id: ShardId,
    pub request_number: RequestNumber,
    /// `None` when only a number was assigned
    pub span: Option<RecordSpan>,
}

/// Result of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub server_id: ServerId,
    pub shard_id: ShardId,
    /// Low-water mark after the commit (never lower than before)
    pub low_water_mark: RequestNumber,
}

/// Result of a close
#[derive(Debug, Clone, PartialEq)]
pub struct Closed {
    pub bookmark: Option<Bookmark>,
    pub sealed_segments: usize,
}

/// Result of a compaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionReport {
    pub segments_removed: usize,
    pub bytes_reclaimed: u64,
}
