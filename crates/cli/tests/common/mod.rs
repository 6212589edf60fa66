// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for CLI integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use sw_core::{FieldValue, Point, Request, Series, ServerId, ShardId};
use sw_storage::{segment, Appended, Wal, WalConfig, WalEntry};
use tempfile::TempDir;

/// A write request with one single-point series per name
pub fn request(database: &str, names: &[&str]) -> Request {
    let series = names
        .iter()
        .map(|name| {
            Series::new(
                *name,
                vec!["value".to_string()],
                vec![Point::new(1_700_000_000, vec![FieldValue::Int64(1)])],
            )
        })
        .collect();
    Request::write(database, series, ServerId(1))
}

/// Append requests to one shard and shut the WAL down cleanly
pub fn populate(dir: &TempDir, shard: u32, requests: Vec<Request>) -> Vec<Appended> {
    let wal = Wal::open(WalConfig::new(dir.path())).expect("open wal");
    let handle = wal.handle();
    let appended = requests
        .into_iter()
        .map(|request| {
            let (entry, confirmation) = WalEntry::append(request, ShardId(shard), false);
            handle.blocking_submit(entry).expect("submit");
            confirmation.wait_blocking().expect("append")
        })
        .collect();
    wal.shutdown().expect("shutdown");
    appended
}

/// Path of the first segment file of a shard
pub fn first_segment(dir: &TempDir, shard: u32) -> PathBuf {
    segment::shard_dir(dir.path(), ShardId(shard)).join(segment::segment_file_name(0))
}

/// Append raw bytes to a segment file
pub fn append_bytes(path: &PathBuf, bytes: &[u8]) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .expect("open segment");
    file.write_all(bytes).expect("write segment");
}
