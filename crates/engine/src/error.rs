// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the coordinator and replay streaming

use sw_core::{PipelineError, ShardId};
use sw_storage::{ReplayError, WalError};
use thiserror::Error;

/// Errors that can occur at the coordinator boundary
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("wal error: {0}")]
    Wal(#[from] WalError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Replay(#[from] ReplayStreamError),
    #[error("timed out after {timeout_ms}ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },
    #[error("user {user} may not {action}")]
    PermissionDenied { user: String, action: &'static str },
    #[error("database not found: {0}")]
    DatabaseNotFound(String),
    #[error("database already exists: {0}")]
    DatabaseExists(String),
    #[error("invalid database name: {0:?}")]
    InvalidDatabaseName(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("config error: {0}")]
    Config(String),
}

/// Why streaming a shard's log into a pipeline stopped early
#[derive(Debug, Error)]
pub enum ReplayStreamError {
    #[error("{source}")]
    Replay {
        #[source]
        source: ReplayError,
        /// Offset to resume from once the cause is fixed
        resume_offset: u64,
    },
    #[error("pipeline aborted while replaying shard {shard_id}: {source}")]
    Pipeline {
        shard_id: ShardId,
        #[source]
        source: PipelineError,
        resume_offset: u64,
    },
}

impl ReplayStreamError {
    pub fn resume_offset(&self) -> u64 {
        match self {
            ReplayStreamError::Replay { resume_offset, .. }
            | ReplayStreamError::Pipeline { resume_offset, .. } => *resume_offset,
        }
    }
}
