// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opening a WAL directory and submitting entries to it

use crate::catalog::Catalog;
use crate::config::WalConfig;
use crate::confirmation::{self, Confirmation};
use crate::entry::{Appended, Closed, CompactionReport, Committed, WalEntry};
use crate::error::{ReplayError, WalError};
use crate::replay::{ReplayCursor, ReplayFrom};
use crate::sequencer::{Message, Sequencer};
use crate::state::{Bookmark, WalState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use sw_core::{Request, RequestNumber, ServerId, ShardId};
use tokio::sync::mpsc;

/// Summary of one shard log as last published by the sequencer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSummary {
    pub shard_id: ShardId,
    pub segments: usize,
    pub first_offset: u64,
    pub end_offset: u64,
    pub next_request_number: RequestNumber,
}

/// An open WAL directory and the sequencer thread that owns it
pub struct Wal {
    handle: WalHandle,
    thread: Option<JoinHandle<()>>,
}

impl Wal {
    /// Recover the directory and start the sequencer
    pub fn open(config: WalConfig) -> Result<Self, WalError> {
        config.validate()?;
        let catalog = Arc::new(Catalog::new());
        let dir = config.dir.clone();
        let (tx, rx) = mpsc::channel(config.queue_capacity);

        let sequencer = Sequencer::recover(config, Arc::clone(&catalog))?;
        let thread = std::thread::Builder::new()
            .name("wal-sequencer".to_string())
            .spawn(move || sequencer.run(rx))?;

        tracing::info!(dir = %dir.display(), "WAL opened");
        Ok(Self {
            handle: WalHandle { tx, catalog, dir },
            thread: Some(thread),
        })
    }

    /// A submission handle; clones share the same queue
    pub fn handle(&self) -> WalHandle {
        self.handle.clone()
    }

    pub fn dir(&self) -> &Path {
        &self.handle.dir
    }

    /// Close with a bookmark, stop the sequencer and wait for it to exit
    ///
    /// Entries queued before the shutdown are applied; entries queued after
    /// it are confirmed with `SequencerStopped`, so the closing bookmark is
    /// the final position. Blocks the calling thread; from async code use
    /// [`Wal::shutdown_async`].
    pub fn shutdown(mut self) -> Result<Closed, WalError> {
        let (confirm, confirmation) = confirmation::channel();
        self.handle
            .tx
            .blocking_send(Message::Shutdown(confirm))
            .map_err(|_| WalError::SequencerStopped)?;
        let closed = confirmation.wait_blocking();
        self.join_blocking();
        closed
    }

    /// [`Wal::shutdown`] for async callers
    pub async fn shutdown_async(mut self) -> Result<Closed, WalError> {
        let (confirm, confirmation) = confirmation::channel();
        self.handle
            .tx
            .send(Message::Shutdown(confirm))
            .await
            .map_err(|_| WalError::SequencerStopped)?;
        let closed = confirmation.wait().await;

        if let Some(thread) = self.thread.take() {
            let joined = tokio::task::spawn_blocking(move || thread.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                tracing::warn!("sequencer thread panicked");
            }
        }
        closed
    }

    fn join_blocking(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("sequencer thread panicked");
            }
        }
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        // Ask the sequencer to stop without blocking; it drains what is queued
        if self.thread.is_some() {
            let _ = self.handle.tx.try_send(Message::Stop);
        }
    }
}

/// Cheap, cloneable submission surface of a [`Wal`]
#[derive(Clone)]
pub struct WalHandle {
    tx: mpsc::Sender<Message>,
    catalog: Arc<Catalog>,
    dir: PathBuf,
}

impl std::fmt::Debug for WalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalHandle").field("dir", &self.dir).finish()
    }
}

impl WalHandle {
    /// Queue an entry without waiting
    ///
    /// Fails with `QueueFull` under back-pressure and `SequencerStopped` once
    /// the WAL has shut down. A rejected entry's confirmation reports
    /// `SequencerStopped`.
    pub fn try_submit(&self, entry: WalEntry) -> Result<(), WalError> {
        self.tx
            .try_send(Message::Entry(entry))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => WalError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => WalError::SequencerStopped,
            })
    }

    /// Queue an entry, waiting for room if the queue is full
    pub async fn submit(&self, entry: WalEntry) -> Result<(), WalError> {
        self.tx
            .send(Message::Entry(entry))
            .await
            .map_err(|_| WalError::SequencerStopped)
    }

    /// Queue an entry from a thread outside any async runtime
    pub fn blocking_submit(&self, entry: WalEntry) -> Result<(), WalError> {
        self.tx
            .blocking_send(Message::Entry(entry))
            .map_err(|_| WalError::SequencerStopped)
    }

    pub async fn append(
        &self,
        request: Request,
        shard_id: ShardId,
        assign_seq_only: bool,
    ) -> Result<Confirmation<Appended>, WalError> {
        let (entry, confirmation) = WalEntry::append(request, shard_id, assign_seq_only);
        self.submit(entry).await?;
        Ok(confirmation)
    }

    pub async fn commit(
        &self,
        server_id: ServerId,
        shard_id: ShardId,
        request_number: RequestNumber,
    ) -> Result<Confirmation<Committed>, WalError> {
        let (entry, confirmation) = WalEntry::commit(server_id, shard_id, request_number);
        self.submit(entry).await?;
        Ok(confirmation)
    }

    pub async fn bookmark(&self) -> Result<Confirmation<Bookmark>, WalError> {
        let (entry, confirmation) = WalEntry::bookmark();
        self.submit(entry).await?;
        Ok(confirmation)
    }

    pub async fn close(&self, should_bookmark: bool) -> Result<Confirmation<Closed>, WalError> {
        let (entry, confirmation) = WalEntry::close(should_bookmark);
        self.submit(entry).await?;
        Ok(confirmation)
    }

    pub async fn compact(&self) -> Result<Confirmation<CompactionReport>, WalError> {
        let (entry, confirmation) = WalEntry::compact();
        self.submit(entry).await?;
        Ok(confirmation)
    }

    /// Open a cursor over what the sequencer has confirmed so far
    pub fn replay(&self, shard_id: ShardId, from: ReplayFrom) -> Result<ReplayCursor, ReplayError> {
        match self.catalog.snapshot(shard_id) {
            Some(snapshot) => {
                ReplayCursor::from_segments(shard_id, snapshot.segments, snapshot.end_offset, from)
            }
            None => ReplayCursor::from_segments(shard_id, Vec::new(), 0, from),
        }
    }

    /// Bookmarks recorded so far, oldest first
    pub fn bookmarks(&self) -> Result<Vec<Bookmark>, WalError> {
        Ok(WalState::load(&self.dir)?.bookmarks)
    }

    pub fn shards(&self) -> Vec<ShardSummary> {
        self.catalog
            .all()
            .into_iter()
            .map(|(shard_id, snapshot)| ShardSummary {
                shard_id,
                segments: snapshot.segments.len(),
                first_offset: snapshot.first_offset(),
                end_offset: snapshot.end_offset,
                next_request_number: snapshot.next_request_number,
            })
            .collect()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
