// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator boundary between request handlers and the write-ahead log
//!
//! Handlers call a [`Coordinator`] for writes, queries and database
//! lifecycle. [`WalCoordinator`] sequences every mutation through the WAL:
//!
//! ```text
//! write_series_data ──group by shard──▶ WalHandle::append (one per shard)
//!                                            │
//!                   await confirmations ◀────┘
//! ```

use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, ReplayStreamError};
use crate::replay::{stream_replay, ReplayProgress};
use crate::shard::{HashShardAssigner, ShardAssigner};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use sw_core::{Processor, Request, Series, ShardId};
use sw_storage::{
    Appended, CompactionReport, Confirmation, ReplayErrorKind, ReplayFrom, WalError, WalHandle,
};

/// The identity a request runs as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub cluster_admin: bool,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cluster_admin: false,
        }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cluster_admin: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
}

/// Executes query text against stored data, streaming results
///
/// Implementations push result series into `processor` and must not close
/// it; the coordinator owns the pipeline.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn run_query(
        &self,
        user: &User,
        database: &str,
        query: &str,
        processor: &mut dyn Processor,
    ) -> Result<(), CoordinatorError>;
}

/// Operations request handlers need from the cluster
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Remove committed log segments now
    async fn force_compaction(&self, user: &User) -> Result<CompactionReport, CoordinatorError>;

    /// Run a query, streaming results into `processor`; always closes it
    async fn run_query(
        &self,
        user: &User,
        database: &str,
        query: &str,
        processor: &mut dyn Processor,
    ) -> Result<(), CoordinatorError>;

    /// Durably log a batch of series, one request per shard touched
    async fn write_series_data(
        &self,
        user: &User,
        database: &str,
        series: Vec<Series>,
    ) -> Result<Vec<Appended>, CoordinatorError>;

    async fn create_database(&self, user: &User, database: &str) -> Result<(), CoordinatorError>;

    async fn list_databases(&self, user: &User) -> Result<Vec<Database>, CoordinatorError>;

    async fn drop_database(&self, user: &User, database: &str) -> Result<(), CoordinatorError>;
}

/// [`Coordinator`] that sequences mutations through a WAL
pub struct WalCoordinator<Q, A = HashShardAssigner> {
    wal: WalHandle,
    assigner: A,
    query_engine: Q,
    config: CoordinatorConfig,
    databases: Mutex<BTreeSet<String>>,
}

impl<Q: QueryEngine> WalCoordinator<Q> {
    pub fn new(
        wal: WalHandle,
        query_engine: Q,
        config: CoordinatorConfig,
    ) -> Result<Self, CoordinatorError> {
        let assigner = HashShardAssigner::new(config.shard_count);
        Self::with_assigner(wal, assigner, query_engine, config)
    }
}

impl<Q: QueryEngine, A: ShardAssigner> WalCoordinator<Q, A> {
    pub fn with_assigner(
        wal: WalHandle,
        assigner: A,
        query_engine: Q,
        config: CoordinatorConfig,
    ) -> Result<Self, CoordinatorError> {
        config.validate()?;
        Ok(Self {
            wal,
            assigner,
            query_engine,
            config,
            databases: Mutex::new(BTreeSet::new()),
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn wal(&self) -> &WalHandle {
        &self.wal
    }

    /// Stream a shard's log from `from` into `processor`, then close it
    pub fn replay_shard(
        &self,
        shard_id: ShardId,
        from: ReplayFrom,
        processor: &mut dyn Processor,
    ) -> Result<ReplayProgress, CoordinatorError> {
        let cursor = match self.wal.replay(shard_id, from) {
            Ok(cursor) => cursor,
            Err(source) => {
                if let Err(e) = processor.close() {
                    tracing::warn!(stage = processor.name(), error = %e, "close failed after abort");
                }
                // A compacted start resumes at the first retained segment
                let resume_offset = match &source.kind {
                    ReplayErrorKind::OffsetCompacted { first } => *first,
                    _ => source.offset,
                };
                return Err(ReplayStreamError::Replay {
                    source,
                    resume_offset,
                }
                .into());
            }
        };
        Ok(stream_replay(cursor, processor)?)
    }

    fn require_admin(&self, user: &User, action: &'static str) -> Result<(), CoordinatorError> {
        if user.cluster_admin {
            Ok(())
        } else {
            Err(CoordinatorError::PermissionDenied {
                user: user.name.clone(),
                action,
            })
        }
    }

    fn require_database(&self, database: &str) -> Result<(), CoordinatorError> {
        let databases = self.databases.lock().unwrap_or_else(|e| e.into_inner());
        if databases.contains(database) {
            Ok(())
        } else {
            Err(CoordinatorError::DatabaseNotFound(database.to_string()))
        }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.config.confirmation_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    async fn confirmed<T: Send>(
        &self,
        confirmation: Confirmation<T>,
        what: impl FnOnce() -> String,
    ) -> Result<T, CoordinatorError> {
        match confirmation.wait_timeout(self.config.confirmation_timeout).await {
            Ok(value) => Ok(value),
            Err(WalError::ConfirmationTimeout) => Err(CoordinatorError::Timeout {
                what: what(),
                timeout_ms: self.timeout_ms(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Submit one request per shard, then wait for all of them
    async fn append_all(
        &self,
        requests: Vec<(ShardId, Request)>,
    ) -> Result<Vec<Appended>, CoordinatorError> {
        let mut pending = Vec::with_capacity(requests.len());
        for (shard_id, request) in requests {
            pending.push((shard_id, self.wal.append(request, shard_id, false).await?));
        }

        let mut appended = Vec::with_capacity(pending.len());
        for (shard_id, confirmation) in pending {
            appended.push(
                self.confirmed(confirmation, || format!("shard {shard_id} to confirm"))
                    .await?,
            );
        }
        Ok(appended)
    }
}

fn validate_name(database: &str) -> Result<(), CoordinatorError> {
    if database.is_empty() || database.contains('/') || database.trim() != database {
        return Err(CoordinatorError::InvalidDatabaseName(database.to_string()));
    }
    Ok(())
}

#[async_trait]
impl<Q: QueryEngine, A: ShardAssigner> Coordinator for WalCoordinator<Q, A> {
    async fn force_compaction(&self, user: &User) -> Result<CompactionReport, CoordinatorError> {
        self.require_admin(user, "force compaction")?;
        let confirmation = self.wal.compact().await?;
        let report = self
            .confirmed(confirmation, || "compaction".to_string())
            .await?;
        tracing::info!(
            user = %user.name,
            segments_removed = report.segments_removed,
            bytes_reclaimed = report.bytes_reclaimed,
            "forced compaction"
        );
        Ok(report)
    }

    async fn run_query(
        &self,
        user: &User,
        database: &str,
        query: &str,
        processor: &mut dyn Processor,
    ) -> Result<(), CoordinatorError> {
        let ran = match self.require_database(database) {
            Ok(()) => {
                self.query_engine
                    .run_query(user, database, query, processor)
                    .await
            }
            Err(e) => Err(e),
        };
        let closed = processor.close();

        match (ran, closed) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!(stage = processor.name(), error = %close_err, "close failed after abort");
                Err(e)
            }
        }
    }

    async fn write_series_data(
        &self,
        user: &User,
        database: &str,
        series: Vec<Series>,
    ) -> Result<Vec<Appended>, CoordinatorError> {
        self.require_database(database)?;

        let mut by_shard: BTreeMap<ShardId, Vec<Series>> = BTreeMap::new();
        for s in series.into_iter().filter(|s| !s.is_empty()) {
            let shard_id = self.assigner.shard_for(database, &s.name);
            by_shard.entry(shard_id).or_default().push(s);
        }
        if by_shard.is_empty() {
            return Ok(Vec::new());
        }

        let server = self.config.server_id;
        let requests = by_shard
            .into_iter()
            .map(|(shard_id, series)| (shard_id, Request::write(database, series, server)))
            .collect();
        let appended = self.append_all(requests).await?;
        tracing::debug!(
            user = %user.name,
            database,
            shards = appended.len(),
            "series written"
        );
        Ok(appended)
    }

    async fn create_database(&self, user: &User, database: &str) -> Result<(), CoordinatorError> {
        self.require_admin(user, "create databases")?;
        validate_name(database)?;
        let mut databases = self.databases.lock().unwrap_or_else(|e| e.into_inner());
        if !databases.insert(database.to_string()) {
            return Err(CoordinatorError::DatabaseExists(database.to_string()));
        }
        tracing::info!(user = %user.name, database, "database created");
        Ok(())
    }

    async fn list_databases(&self, _user: &User) -> Result<Vec<Database>, CoordinatorError> {
        let databases = self.databases.lock().unwrap_or_else(|e| e.into_inner());
        Ok(databases
            .iter()
            .map(|name| Database { name: name.clone() })
            .collect())
    }

    /// Log a drop request on every shard, then forget the database
    async fn drop_database(&self, user: &User, database: &str) -> Result<(), CoordinatorError> {
        self.require_admin(user, "drop databases")?;
        self.require_database(database)?;

        let server = self.config.server_id;
        let requests = (0..self.assigner.shard_count())
            .map(|shard| (ShardId(shard), Request::drop_database(database, server)))
            .collect();
        self.append_all(requests).await?;

        let mut databases = self.databases.lock().unwrap_or_else(|e| e.into_inner());
        databases.remove(database);
        tracing::info!(user = %user.name, database, "database dropped");
        Ok(())
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
