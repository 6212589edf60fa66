// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for sequencing and replay

use std::io;
use sw_core::{RequestNumber, ServerId, ShardId};
use thiserror::Error;

/// Errors reported by WAL operations
///
/// Entry failures travel back to the issuer inside its confirmation; only
/// submission and configuration errors are returned directly.
#[derive(Debug, Error)]
pub enum WalError {
    #[error("write of request {request_number} to shard {shard_id} failed: {source}")]
    WriteFailure {
        shard_id: ShardId,
        request_number: RequestNumber,
        #[source]
        source: io::Error,
    },
    #[error("commit from unknown server {server_id} on shard {shard_id}")]
    UnknownServer {
        server_id: ServerId,
        shard_id: ShardId,
    },
    #[error(
        "commit of request {requested} from server {server_id} on shard {shard_id} \
         is ahead of its last confirmed request {confirmed}"
    )]
    CommitAhead {
        server_id: ServerId,
        shard_id: ShardId,
        requested: RequestNumber,
        confirmed: RequestNumber,
    },
    #[error("failed to persist {what}: {source}")]
    Persist {
        what: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("sequencer queue is full")]
    QueueFull,
    #[error("sequencer has stopped")]
    SequencerStopped,
    #[error("timed out waiting for confirmation")]
    ConfirmationTimeout,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
}

impl WalError {
    /// Request number consumed by a failed append, if any
    pub fn request_number(&self) -> Option<RequestNumber> {
        match self {
            WalError::WriteFailure { request_number, .. } => Some(*request_number),
            _ => None,
        }
    }
}

/// Terminal error of a replay stream, with the position it happened at
#[derive(Debug, Error)]
#[error("replay error on shard {shard_id} at offset {offset}: {kind}")]
pub struct ReplayError {
    pub shard_id: ShardId,
    pub offset: u64,
    #[source]
    pub kind: ReplayErrorKind,
}

/// What went wrong while replaying
#[derive(Debug, Error)]
pub enum ReplayErrorKind {
    #[error("corrupted record: {reason}")]
    Corrupted { reason: String },
    #[error("checksum mismatch for request {request_number}")]
    ChecksumMismatch { request_number: RequestNumber },
    #[error("offset is beyond the end of the log ({end})")]
    OffsetOutOfRange { end: u64 },
    #[error("offset precedes the first retained segment ({first})")]
    OffsetCompacted { first: u64 },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ReplayError {
    pub fn new(shard_id: ShardId, offset: u64, kind: ReplayErrorKind) -> Self {
        Self {
            shard_id,
            offset,
            kind,
        }
    }

    /// True if the log itself is damaged (as opposed to a bad request offset)
    pub fn is_corruption(&self) -> bool {
        matches!(
            self.kind,
            ReplayErrorKind::Corrupted { .. } | ReplayErrorKind::ChecksumMismatch { .. }
        )
    }
}
