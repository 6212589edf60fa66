// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests for inspecting and maintaining a WAL directory

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(deprecated)]

mod common;

use assert_cmd::Command;
use common::{append_bytes, first_segment, populate, request};
use predicates::prelude::*;
use tempfile::TempDir;

fn sw(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sw").unwrap();
    cmd.arg("--dir").arg(dir.path());
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{output:?}");
    String::from_utf8(output.stdout).unwrap()
}

// =============================================================================
// Listing
// =============================================================================

#[test]
fn empty_directory_has_no_shards() {
    let dir = TempDir::new().unwrap();
    sw(&dir)
        .arg("shards")
        .assert()
        .success()
        .stdout("No shards\n");
    sw(&dir)
        .arg("bookmarks")
        .assert()
        .success()
        .stdout("No bookmarks\n");
}

#[test]
fn shards_lists_each_log() {
    let dir = TempDir::new().unwrap();
    populate(&dir, 3, vec![request("db", &["cpu"]), request("db", &["mem"])]);
    let appended = populate(&dir, 8, vec![request("db", &["disk"])]);
    let end = appended[0].span.unwrap().end_offset;

    let out = stdout_of(sw(&dir).args(["--format", "json", "shards"]));
    let rows: Vec<serde_json::Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["shard_id"], 3);
    assert_eq!(rows[0]["last_request_number"], 2);
    assert_eq!(rows[1]["shard_id"], 8);
    assert_eq!(rows[1]["end_offset"], end);
}

#[test]
fn bookmarks_show_offsets_recorded_at_shutdown() {
    let dir = TempDir::new().unwrap();
    let appended = populate(&dir, 7, vec![request("db", &["cpu"])]);
    let end = appended[0].span.unwrap().end_offset;

    sw(&dir)
        .arg("bookmarks")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("7={end}")));
}

// =============================================================================
// Replay
// =============================================================================

#[test]
fn replay_prints_every_record() {
    let dir = TempDir::new().unwrap();
    populate(
        &dir,
        1,
        vec![request("db", &["a"]), request("db", &["b"]), request("db", &["c"])],
    );

    let out = stdout_of(sw(&dir).args(["replay", "--shard", "1"]));
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("NUMBER"));
    assert!(lines[1].trim_start().starts_with('1'));
    assert!(lines[3].contains("write"));
}

#[test]
fn replay_json_resumes_from_end_offset() {
    let dir = TempDir::new().unwrap();
    let appended = populate(&dir, 1, vec![request("db", &["a"]), request("db", &["b"])]);
    let first_end = appended[0].span.unwrap().end_offset;

    let out = stdout_of(sw(&dir).args([
        "--format",
        "json",
        "replay",
        "--shard",
        "1",
        "--from",
        &first_end.to_string(),
    ]));
    let rows: Vec<serde_json::Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["request_number"], 2);
    assert_eq!(rows[0]["start_offset"], first_end);
}

#[test]
fn replay_from_end_prints_nothing() {
    let dir = TempDir::new().unwrap();
    let appended = populate(&dir, 1, vec![request("db", &["a"])]);
    let end = appended[0].span.unwrap().end_offset;

    sw(&dir)
        .args(["replay", "--shard", "1", "--from", &end.to_string()])
        .assert()
        .success()
        .stdout("No records\n");
}

#[test]
fn replay_past_end_fails() {
    let dir = TempDir::new().unwrap();
    let appended = populate(&dir, 1, vec![request("db", &["a"])]);
    let past = appended[0].span.unwrap().end_offset + 1;

    sw(&dir)
        .args(["replay", "--shard", "1", "--from", &past.to_string()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("beyond the end of the log"));
}

#[test]
fn replay_series_through_limited_pipeline() {
    let dir = TempDir::new().unwrap();
    populate(&dir, 2, vec![request("db", &["cpu", "mem"]), request("db", &["disk"])]);

    sw(&dir)
        .args(["replay", "--shard", "2", "--series", "--limit", "1"])
        .assert()
        .success()
        .stdout("cpu (1 point(s))\n")
        .stderr(predicate::str::contains("resume from offset 0"));

    sw(&dir)
        .args(["replay", "--shard", "2", "--series"])
        .assert()
        .success()
        .stdout("cpu (1 point(s))\nmem (1 point(s))\ndisk (1 point(s))\n")
        .stderr(predicate::str::contains("2 request(s), 3 series"));
}

#[test]
fn limit_requires_series() {
    let dir = TempDir::new().unwrap();
    sw(&dir)
        .args(["replay", "--shard", "1", "--limit", "3"])
        .assert()
        .failure();
}

// =============================================================================
// Validate and repair
// =============================================================================

#[test]
fn validate_repair_cycle() {
    let dir = TempDir::new().unwrap();
    populate(&dir, 4, vec![request("db", &["a"]), request("db", &["b"])]);

    sw(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));

    append_bytes(&first_segment(&dir, 4), b"{\"request_num");
    sw(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("corrupt at"))
        .stderr(predicate::str::contains("1 shard(s) failed validation"));

    sw(&dir)
        .args(["repair", "--shard", "4"])
        .assert()
        .success()
        .stdout("shard 4: removed 13 byte(s)\n");

    sw(&dir).arg("validate").assert().success();
}

// =============================================================================
// Compaction and config
// =============================================================================

#[test]
fn compact_without_commits_removes_nothing() {
    let dir = TempDir::new().unwrap();
    populate(&dir, 1, vec![request("db", &["a"])]);

    sw(&dir)
        .arg("compact")
        .assert()
        .success()
        .stdout("removed 0 segment(s), reclaimed 0 byte(s)\n");
    // A clean shutdown records another bookmark
    let out = stdout_of(sw(&dir).args(["--format", "json", "bookmarks"]));
    assert_eq!(out.lines().count(), 2);
}

#[test]
fn dir_comes_from_config_file() {
    let dir = TempDir::new().unwrap();
    populate(&dir, 5, vec![request("db", &["a"])]);
    let config = dir.path().join("shardwal.toml");
    std::fs::write(
        &config,
        format!("[wal]\ndir = {:?}\n", dir.path().display().to_string()),
    )
    .unwrap();

    Command::cargo_bin("sw")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("shards")
        .assert()
        .success()
        .stdout(predicate::str::contains("SHARD"));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    Command::cargo_bin("sw")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("shards")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}
