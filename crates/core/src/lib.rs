// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sw-core: shared types for the shardwal write-ahead log
//!
//! This crate provides:
//! - Identifiers for shards, servers and request numbers
//! - The series protocol carried (opaquely) by WAL requests
//! - The push-style processor pipeline every read path streams through

pub mod id;
pub mod point_range;
pub mod processor;
pub mod protocol;

// Re-exports
pub use id::{RequestNumber, ServerId, ShardId};
pub use point_range::PointRange;
pub use processor::{
    chain_names, drive, yield_to_processor, CollectingProcessor, DriveOutcome, LimitProcessor,
    Next, NilProcessor, PipelineError, PointRangeProcessor, Processor, SeriesWriter,
};
pub use protocol::{FieldValue, Point, Request, RequestKind, Series};
