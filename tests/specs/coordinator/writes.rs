//! Coordinator write specs
//!
//! Series written through the coordinator land in per-shard logs, survive a
//! restart, and replay in the order they were written.

use crate::prelude::*;
use similar_asserts::assert_eq;
use std::collections::BTreeMap;

fn batch(round: i64) -> Vec<Series> {
    ["cpu", "mem", "disk", "net", "load"]
        .iter()
        .map(|name| series(&format!("{name}.{round}"), &[round * 10, round * 10 + 1]))
        .collect()
}

#[tokio::test]
async fn writes_survive_restart_in_shard_order() {
    let fixture = Fixture::new();
    let assigner = HashShardAssigner::new(3);
    let writer = User::new("ingest");

    let wal = fixture.open();
    let coordinator = fixture.coordinator(&wal, 3).await;
    let mut expected: BTreeMap<ShardId, Vec<String>> = BTreeMap::new();
    for round in 0..4 {
        let written = batch(round);
        for s in &written {
            expected
                .entry(assigner.shard_for(DATABASE, &s.name))
                .or_default()
                .push(s.name.clone());
        }
        coordinator
            .write_series_data(&writer, DATABASE, written)
            .await
            .unwrap();
    }
    wal.shutdown_async().await.unwrap();

    for (shard, names_in_order) in &expected {
        let mut sink = CollectingProcessor::new();
        sw_engine::stream_replay(fixture.cursor(*shard, ReplayFrom::Start), &mut sink).unwrap();
        assert_eq!(&names(sink.series()), names_in_order);
    }

    // Numbering continues after the restart
    let wal = fixture.open();
    let coordinator = fixture.coordinator(&wal, 3).await;
    let (shard, before) = expected.iter().next().unwrap();
    let name = before[0].clone();
    let appended = coordinator
        .write_series_data(&writer, DATABASE, vec![series(&name, &[99])])
        .await
        .unwrap();
    assert_eq!(appended[0].shard_id, *shard);
    assert!(appended[0].request_number > RequestNumber(1));
    wal.shutdown_async().await.unwrap();
}

#[tokio::test]
async fn one_request_per_shard_touched() {
    let fixture = Fixture::new();
    let wal = fixture.open();
    let coordinator = fixture.coordinator(&wal, 8).await;

    let appended = coordinator
        .write_series_data(&User::new("ingest"), DATABASE, batch(1))
        .await
        .unwrap();

    let assigner = HashShardAssigner::new(8);
    let mut shards: Vec<_> = batch(1)
        .iter()
        .map(|s| assigner.shard_for(DATABASE, &s.name))
        .collect();
    shards.sort();
    shards.dedup();
    assert_eq!(appended.iter().map(|a| a.shard_id).collect::<Vec<_>>(), shards);
    wal.shutdown_async().await.unwrap();
}

#[tokio::test]
async fn compaction_through_coordinator_moves_replay_start() {
    let fixture = Fixture::with_config(|c| c.segment_max_records = 1);
    let wal = fixture.open();
    let coordinator = fixture.coordinator(&wal, 1).await;
    let root = User::admin("root");

    let mut last = None;
    for round in 0..3 {
        let appended = coordinator
            .write_series_data(&root, DATABASE, vec![series("cpu", &[round])])
            .await
            .unwrap();
        last = Some(appended[0].clone());
    }
    let last = last.unwrap();
    coordinator
        .wal()
        .commit(ServerId(1), ShardId(0), RequestNumber(2))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    let report = coordinator.force_compaction(&root).await.unwrap();
    assert_eq!(report.segments_removed, 2);

    let mut sink = CollectingProcessor::new();
    let progress = coordinator
        .replay_shard(ShardId(0), ReplayFrom::Start, &mut sink)
        .unwrap();
    assert_eq!(progress.requests, 1);
    assert_eq!(progress.resume_offset, last.span.unwrap().end_offset);
    assert_eq!(sink.series()[0].points[0].timestamp_micros, Some(2));
    wal.shutdown_async().await.unwrap();
}
