// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Per-shard write-ahead log
//!
//! ## Architecture
//!
//! ```text
//! callers ──WalEntry──▶ bounded queue ──▶ sequencer thread ──▶ shard-N/<base>.log
//!    ▲                                          │
//!    └──────────── Confirmation ◀───────────────┘
//!
//! shard-N/<base>.log ──▶ ReplayCursor ──▶ ReplayRequest ──▶ processor pipeline
//! ```
//!
//! ## Durability Guarantees
//!
//! - One sequencer thread owns every shard log; entries are applied in
//!   the order they were accepted into the queue
//! - Request numbers are assigned per shard and never reused
//! - Every record carries a CRC32 checksum; torn tails are detected on
//!   read and trimmed on open
//! - Failures are reported through the entry's confirmation, never by
//!   stopping the sequencer

mod catalog;
pub mod config;
pub mod confirmation;
pub mod entry;
mod error;
pub mod record;
pub mod replay;
pub mod segment;
mod sequencer;
mod shard;
pub mod state;
pub mod wal;

pub use config::WalConfig;
pub use confirmation::{Confirmation, Confirmer};
pub use entry::{Appended, Closed, CompactionReport, Committed, RecordSpan, WalEntry};
pub use error::{ReplayError, ReplayErrorKind, WalError};
pub use record::WalRecord;
pub use replay::{
    repair_shard, shard_ids, validate_shard, ReplayCursor, ReplayFrom, ReplayRequest,
    ShardValidation,
};
pub use state::{Bookmark, WalState};
pub use wal::{ShardSummary, Wal, WalHandle};
