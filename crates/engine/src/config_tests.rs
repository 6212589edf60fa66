// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn missing_table_uses_defaults() {
    let config = CoordinatorConfig::from_toml_str("[wal]\ndir = \"/tmp/wal\"\n").unwrap();
    assert_eq!(config, CoordinatorConfig::default());
}

#[test]
fn parses_humantime_timeout() {
    let config = CoordinatorConfig::from_toml_str(
        r#"
[coordinator]
shard_count = 16
server_id = 3
confirmation_timeout = "1m 30s"
"#,
    )
    .unwrap();
    assert_eq!(config.shard_count, 16);
    assert_eq!(config.server_id, ServerId(3));
    assert_eq!(config.confirmation_timeout, Duration::from_secs(90));
}

#[test]
fn partial_table_keeps_other_defaults() {
    let config = CoordinatorConfig::from_toml_str("[coordinator]\nshard_count = 2\n").unwrap();
    assert_eq!(config.shard_count, 2);
    assert_eq!(config.confirmation_timeout, Duration::from_secs(5));
}

#[parameterized(
    zero_shards = { "[coordinator]\nshard_count = 0\n", "shard_count" },
    zero_timeout = { "[coordinator]\nconfirmation_timeout = \"0s\"\n", "confirmation_timeout" },
    bad_duration = { "[coordinator]\nconfirmation_timeout = \"soon\"\n", "confirmation_timeout" },
)]
fn rejects_invalid_config(text: &str, mentions: &str) {
    let err = CoordinatorConfig::from_toml_str(text).unwrap_err();
    assert!(matches!(err, CoordinatorError::Config(_)));
    assert!(err.to_string().contains(mentions), "{err}");
}

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shardwal.toml");
    std::fs::write(&path, "[coordinator]\nserver_id = 9\n").unwrap();
    assert_eq!(CoordinatorConfig::load(&path).unwrap().server_id, ServerId(9));
    assert!(CoordinatorConfig::load(&dir.path().join("missing.toml")).is_err());
}
