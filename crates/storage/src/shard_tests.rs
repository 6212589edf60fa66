// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sw_core::{FieldValue, Point, Series};
use tempfile::TempDir;

fn request(server: u32, value: f64) -> Request {
    Request::write(
        "db",
        vec![Series::new(
            "cpu",
            vec!["value".to_string()],
            vec![Point::new(10, vec![FieldValue::Double(value)])],
        )],
        ServerId(server),
    )
}

fn config() -> WalConfig {
    WalConfig::new("unused")
}

fn no_marks() -> BTreeMap<ServerId, RequestNumber> {
    BTreeMap::new()
}

#[test]
fn append_assigns_consecutive_numbers_and_spans() {
    let dir = TempDir::new().unwrap();
    let mut log = ShardLog::create(dir.path(), ShardId(7), RequestNumber::FIRST);

    let first = log.append(request(1, 1.0), false, &config()).unwrap();
    let second = log.append(request(1, 2.0), false, &config()).unwrap();

    assert_eq!(first.request_number, RequestNumber(1));
    assert_eq!(second.request_number, RequestNumber(2));
    let first_span = first.span.unwrap();
    let second_span = second.span.unwrap();
    assert_eq!(first_span.start_offset, 0);
    assert_eq!(second_span.start_offset, first_span.end_offset);
    assert_eq!(log.end_offset(), second_span.end_offset);
    assert_eq!(log.confirmed(ServerId(1)), Some(RequestNumber(2)));
}

#[test]
fn seq_only_append_consumes_a_number_without_writing() {
    let dir = TempDir::new().unwrap();
    let mut log = ShardLog::create(dir.path(), ShardId(1), RequestNumber::FIRST);

    let appended = log.append(request(4, 1.0), true, &config()).unwrap();
    assert_eq!(appended.request_number, RequestNumber(1));
    assert!(appended.span.is_none());
    assert_eq!(log.end_offset(), 0);
    assert!(!log.has_active_segment());
    assert_eq!(log.confirmed(ServerId(4)), Some(RequestNumber(1)));
    assert_eq!(log.next_request_number(), RequestNumber(2));
}

#[test]
fn failed_append_consumes_its_number() {
    let dir = TempDir::new().unwrap();
    let mut log = ShardLog::create(dir.path(), ShardId(1), RequestNumber::FIRST);

    log.append(request(1, 1.0), false, &config()).unwrap();
    let err = log.append(request(1, f64::NAN), false, &config()).unwrap_err();
    assert_eq!(err.request_number(), Some(RequestNumber(2)));

    let next = log.append(request(1, 3.0), false, &config()).unwrap();
    assert_eq!(next.request_number, RequestNumber(3));
    assert_eq!(log.confirmed(ServerId(1)), Some(RequestNumber(3)));
}

#[test]
fn rotation_seals_at_record_limit() {
    let dir = TempDir::new().unwrap();
    let mut log = ShardLog::create(dir.path(), ShardId(1), RequestNumber::FIRST);
    let config = WalConfig {
        segment_max_records: 2,
        ..config()
    };

    for i in 0..5 {
        log.append(request(1, i as f64), false, &config).unwrap();
    }

    let snapshot = log.snapshot();
    assert_eq!(snapshot.segments.len(), 3);
    for pair in snapshot.segments.windows(2) {
        assert_eq!(pair[0].end_offset(), pair[1].base_offset);
    }
    assert_eq!(snapshot.end_offset, log.end_offset());
    assert_eq!(snapshot.next_request_number, RequestNumber(6));
}

#[test]
fn recover_rebuilds_numbers_and_servers() {
    let dir = TempDir::new().unwrap();
    let end = {
        let mut log = ShardLog::create(dir.path(), ShardId(3), RequestNumber::FIRST);
        log.append(request(1, 1.0), false, &config()).unwrap();
        log.append(request(2, 2.0), false, &config()).unwrap();
        log.seal_active().unwrap();
        log.end_offset()
    };

    let (log, report) =
        ShardLog::recover(dir.path(), ShardId(3), RequestNumber::FIRST, &no_marks()).unwrap();
    assert_eq!(report.records, 2);
    assert_eq!(report.bytes_truncated, 0);
    assert_eq!(log.end_offset(), end);
    assert_eq!(log.next_request_number(), RequestNumber(3));
    assert_eq!(log.confirmed(ServerId(2)), Some(RequestNumber(2)));
    assert!(!log.has_active_segment());
}

#[test]
fn recover_keeps_higher_recorded_number() {
    let dir = TempDir::new().unwrap();
    {
        let mut log = ShardLog::create(dir.path(), ShardId(3), RequestNumber::FIRST);
        log.append(request(1, 1.0), false, &config()).unwrap();
        log.seal_active().unwrap();
    }

    let (log, _) =
        ShardLog::recover(dir.path(), ShardId(3), RequestNumber(10), &no_marks()).unwrap();
    assert_eq!(log.next_request_number(), RequestNumber(10));
}

#[test]
fn recover_truncates_torn_tail() {
    let dir = TempDir::new().unwrap();
    let good_end = {
        let mut log = ShardLog::create(dir.path(), ShardId(3), RequestNumber::FIRST);
        log.append(request(1, 1.0), false, &config()).unwrap();
        log.seal_active().unwrap();
        log.end_offset()
    };
    let path = segment::shard_dir(dir.path(), ShardId(3)).join(segment::segment_file_name(0));
    let mut bytes = std::fs::read(&path).unwrap();
    bytes.extend_from_slice(br#"{"request_number":2,"shard"#);
    std::fs::write(&path, bytes).unwrap();

    let (mut log, report) =
        ShardLog::recover(dir.path(), ShardId(3), RequestNumber::FIRST, &no_marks()).unwrap();
    assert!(report.bytes_truncated > 0);
    assert_eq!(log.end_offset(), good_end);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), good_end);

    // The next record lands in a new segment at the old end offset
    let appended = log.append(request(1, 2.0), false, &config()).unwrap();
    assert_eq!(appended.request_number, RequestNumber(2));
    assert_eq!(appended.span.unwrap().start_offset, good_end);
}

#[test]
fn compact_removes_committed_prefix_only() {
    let dir = TempDir::new().unwrap();
    let mut log = ShardLog::create(dir.path(), ShardId(1), RequestNumber::FIRST);
    let config = WalConfig {
        segment_max_records: 1,
        ..config()
    };
    for i in 0..4 {
        log.append(request(1, i as f64), false, &config).unwrap();
    }
    assert_eq!(log.snapshot().segments.len(), 4);

    let marks: BTreeMap<_, _> = [(ServerId(1), RequestNumber(2))].into_iter().collect();
    let (removed, bytes) = log.compact(&marks).unwrap();
    assert_eq!(removed, 2);
    assert!(bytes > 0);

    let snapshot = log.snapshot();
    assert_eq!(snapshot.segments.len(), 2);
    assert_eq!(snapshot.first_offset(), snapshot.segments[0].base_offset);
    assert!(snapshot.first_offset() > 0);
}

#[test]
fn compact_keeps_newest_segment() {
    let dir = TempDir::new().unwrap();
    let mut log = ShardLog::create(dir.path(), ShardId(1), RequestNumber::FIRST);
    log.append(request(1, 1.0), false, &config()).unwrap();
    log.seal_active().unwrap();

    let marks: BTreeMap<_, _> = [(ServerId(1), RequestNumber(1))].into_iter().collect();
    assert_eq!(log.compact(&marks).unwrap(), (0, 0));
    assert_eq!(log.snapshot().segments.len(), 1);
}

#[test]
fn compact_stops_at_uncommitted_server() {
    let dir = TempDir::new().unwrap();
    let mut log = ShardLog::create(dir.path(), ShardId(1), RequestNumber::FIRST);
    let config = WalConfig {
        segment_max_records: 1,
        ..config()
    };
    log.append(request(1, 1.0), false, &config).unwrap();
    log.append(request(2, 2.0), false, &config).unwrap();
    log.append(request(1, 3.0), false, &config).unwrap();

    // Server 2 never committed, so nothing past its record can go
    let marks: BTreeMap<_, _> = [(ServerId(1), RequestNumber(3))].into_iter().collect();
    let (removed, _) = log.compact(&marks).unwrap();
    assert_eq!(removed, 1);
}

fn replayed_numbers(log: &ShardLog) -> Vec<u64> {
    let snapshot = log.snapshot();
    crate::replay::ReplayCursor::from_segments(
        log.shard_id(),
        snapshot.segments,
        snapshot.end_offset,
        crate::replay::ReplayFrom::Start,
    )
    .unwrap()
    .map(|r| r.unwrap().request_number.0)
    .collect()
}

#[test]
fn write_error_abandons_segment_and_next_append_succeeds() {
    let dir = TempDir::new().unwrap();
    let mut log = ShardLog::create(dir.path(), ShardId(2), RequestNumber::FIRST);
    let first = log.append(request(1, 1.0), false, &config()).unwrap();
    let first_end = first.span.unwrap().end_offset;

    log.active.as_mut().unwrap().writer.reopen_read_only().unwrap();
    let err = log.append(request(1, 2.0), false, &config()).unwrap_err();
    assert!(matches!(
        err,
        WalError::WriteFailure {
            request_number: RequestNumber(2),
            ..
        }
    ));
    assert!(!log.has_active_segment());
    assert_eq!(log.end_offset(), first_end);

    let third = log.append(request(1, 3.0), false, &config()).unwrap();
    assert_eq!(third.request_number, RequestNumber(3));
    assert_eq!(third.span.unwrap().start_offset, first_end);
    assert_eq!(log.snapshot().segments.len(), 2);
    assert_eq!(replayed_numbers(&log), vec![1, 3]);
}

#[test]
fn torn_bytes_in_abandoned_segment_are_hidden_then_clipped() {
    let dir = TempDir::new().unwrap();
    let mut log = ShardLog::create(dir.path(), ShardId(2), RequestNumber::FIRST);
    let first_end = log.append(request(1, 1.0), false, &config()).unwrap().span.unwrap().end_offset;
    log.active.as_mut().unwrap().writer.reopen_read_only().unwrap();
    log.append(request(1, 2.0), false, &config()).unwrap_err();

    // A partial write that survived in the abandoned file
    let abandoned = segment::shard_dir(dir.path(), ShardId(2)).join(segment::segment_file_name(0));
    let mut bytes = std::fs::read(&abandoned).unwrap();
    bytes.extend_from_slice(br#"{"request_number":2,"sha"#);
    std::fs::write(&abandoned, bytes).unwrap();

    log.append(request(1, 3.0), false, &config()).unwrap();
    assert_eq!(replayed_numbers(&log), vec![1, 3]);
    drop(log);

    let (log, report) =
        ShardLog::recover(dir.path(), ShardId(2), RequestNumber::FIRST, &no_marks()).unwrap();
    assert_eq!(report.bytes_truncated, br#"{"request_number":2,"sha"#.len() as u64);
    assert_eq!(std::fs::metadata(&abandoned).unwrap().len(), first_end);
    assert_eq!(log.next_request_number(), RequestNumber(4));
    assert_eq!(replayed_numbers(&log), vec![1, 3]);
}

#[test]
fn sync_error_rolls_back_the_record() {
    let dir = TempDir::new().unwrap();
    let mut log = ShardLog::create(dir.path(), ShardId(2), RequestNumber::FIRST);
    let first_end = log.append(request(1, 1.0), false, &config()).unwrap().span.unwrap().end_offset;

    log.active.as_mut().unwrap().writer.set_sync_failure(true);
    let err = log.append(request(1, 2.0), false, &config()).unwrap_err();
    assert_eq!(err.request_number(), Some(RequestNumber(2)));
    assert!(log.has_active_segment());
    assert_eq!(log.end_offset(), first_end);
    let path = segment::shard_dir(dir.path(), ShardId(2)).join(segment::segment_file_name(0));
    assert_eq!(std::fs::metadata(&path).unwrap().len(), first_end);

    log.active.as_mut().unwrap().writer.set_sync_failure(false);
    let third = log.append(request(1, 3.0), false, &config()).unwrap();
    assert_eq!(third.request_number, RequestNumber(3));
    assert_eq!(third.span.unwrap().start_offset, first_end);
    assert_eq!(replayed_numbers(&log), vec![1, 3]);
}
