//! Replay pipeline specs
//!
//! Replayed requests stream through processor chains, and an early stop can
//! always be resumed without losing or repeating a request.

use crate::prelude::*;
use similar_asserts::assert_eq;

async fn write_pairs(fixture: &Fixture, rounds: i64) {
    let wal = fixture.open();
    let coordinator = fixture.coordinator(&wal, 1).await;
    for round in 0..rounds {
        coordinator
            .write_series_data(
                &User::new("ingest"),
                DATABASE,
                vec![
                    series(&format!("a{round}"), &[round * 100]),
                    series(&format!("b{round}"), &[round * 100 + 50]),
                ],
            )
            .await
            .unwrap();
    }
    wal.shutdown_async().await.unwrap();
}

#[tokio::test]
async fn replay_through_chained_stages() {
    let fixture = Fixture::new();
    write_pairs(&fixture, 3).await;

    let mut chain = PointRangeProcessor::new(LimitProcessor::new(CollectingProcessor::new(), 100));
    assert_eq!(
        chain_names(&chain),
        vec!["PointRangeProcessor", "LimitProcessor", "CollectingProcessor"]
    );

    let progress =
        sw_engine::stream_replay(fixture.cursor(ShardId(0), ReplayFrom::Start), &mut chain)
            .unwrap();
    assert_eq!(progress.requests, 3);
    assert!(!progress.stopped_early);

    let range = chain.range();
    assert_eq!(range.start_micros(), Some(0));
    assert_eq!(range.end_micros(), Some(250));
    let sink = chain.into_inner().into_inner();
    assert!(sink.is_closed());
    assert_eq!(
        names(sink.series()),
        vec!["a0", "b0", "a1", "b1", "a2", "b2"]
    );
}

#[tokio::test]
async fn stopped_replay_resumes_exactly_once() {
    let fixture = Fixture::new();
    write_pairs(&fixture, 4).await;

    let mut full = CollectingProcessor::new();
    sw_engine::stream_replay(fixture.cursor(ShardId(0), ReplayFrom::Start), &mut full).unwrap();

    // Each pass takes two points, one whole request
    let mut delivered = Vec::new();
    let mut offset = 0;
    let mut passes = 0;
    loop {
        let mut limited = LimitProcessor::new(CollectingProcessor::new(), 2);
        let progress = sw_engine::stream_replay(
            fixture.cursor(ShardId(0), ReplayFrom::Offset(offset)),
            &mut limited,
        )
        .unwrap();
        delivered.extend(limited.into_inner().into_series());
        offset = progress.resume_offset;
        passes += 1;
        if !progress.stopped_early {
            break;
        }
    }

    assert_eq!(passes, 5);
    assert_eq!(names(&delivered), names(full.series()));
}

#[tokio::test]
async fn queries_without_an_engine_still_close_the_pipeline() {
    let fixture = Fixture::new();
    let wal = fixture.open();
    let coordinator = fixture.coordinator(&wal, 1).await;

    let mut sink = CollectingProcessor::new();
    let err = coordinator
        .run_query(&User::new("reader"), DATABASE, "select * from cpu", &mut sink)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Query(_)));
    assert!(sink.is_closed());
    wal.shutdown_async().await.unwrap();
}
