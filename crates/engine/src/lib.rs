// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! shardwal engine: the coordinator boundary over the write-ahead log
//!
//! Request handlers talk to a [`Coordinator`]; [`WalCoordinator`] assigns
//! series to shards, sequences mutations through a [`sw_storage::Wal`] and
//! streams replayed or queried data into processor pipelines.

mod config;
mod coordinator;
mod error;
mod replay;
mod shard;

pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, Database, QueryEngine, User, WalCoordinator};
pub use error::{CoordinatorError, ReplayStreamError};
pub use replay::{stream_replay, ReplayProgress};
pub use shard::{HashShardAssigner, ShardAssigner};
