//! Shared fixtures for the behavioral specs

#![allow(dead_code)]

pub use async_trait::async_trait;
pub use sw_core::{
    chain_names, CollectingProcessor, FieldValue, LimitProcessor, Point, PointRangeProcessor,
    Processor, RequestNumber, Series, ServerId, ShardId,
};
pub use sw_engine::{
    Coordinator, CoordinatorConfig, CoordinatorError, HashShardAssigner, QueryEngine,
    ReplayProgress, ShardAssigner, User, WalCoordinator,
};
pub use sw_storage::{ReplayCursor, ReplayFrom, Wal, WalConfig};
pub use tempfile::TempDir;

pub const DATABASE: &str = "telemetry";

/// A series with one integer point per timestamp
pub fn series(name: &str, timestamps: &[i64]) -> Series {
    Series::new(
        name,
        vec!["value".to_string()],
        timestamps
            .iter()
            .map(|ts| Point::new(*ts, vec![FieldValue::Int64(*ts)]))
            .collect(),
    )
}

pub fn names(series: &[Series]) -> Vec<String> {
    series.iter().map(|s| s.name.clone()).collect()
}

/// A WAL directory that outlives the WALs opened on it
pub struct Fixture {
    pub dir: TempDir,
    pub config: WalConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = WalConfig::new(dir.path());
        Self { dir, config }
    }

    pub fn with_config(update: impl FnOnce(&mut WalConfig)) -> Self {
        let mut fixture = Self::new();
        update(&mut fixture.config);
        fixture
    }

    pub fn open(&self) -> Wal {
        Wal::open(self.config.clone()).unwrap()
    }

    /// A coordinator over `wal` with `DATABASE` already created
    pub async fn coordinator(&self, wal: &Wal, shard_count: u32) -> WalCoordinator<NoQueries> {
        let config = CoordinatorConfig {
            shard_count,
            ..CoordinatorConfig::default()
        };
        let coordinator = WalCoordinator::new(wal.handle(), NoQueries, config).unwrap();
        coordinator
            .create_database(&User::admin("root"), DATABASE)
            .await
            .unwrap();
        coordinator
    }

    pub fn cursor(&self, shard: ShardId, from: ReplayFrom) -> ReplayCursor {
        ReplayCursor::open(self.dir.path(), shard, from).unwrap()
    }
}

/// Query engine for specs that never query
pub struct NoQueries;

#[async_trait]
impl QueryEngine for NoQueries {
    async fn run_query(
        &self,
        _user: &User,
        _database: &str,
        query: &str,
        _processor: &mut dyn Processor,
    ) -> Result<(), CoordinatorError> {
        Err(CoordinatorError::Query(format!("no engine for {query}")))
    }
}
