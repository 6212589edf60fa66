// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sequencer thread
//!
//! A single thread drains the submission queue and applies entries one at a
//! time, so the order entries were accepted in is the order they hit the
//! logs. Every failure goes back through the entry's confirmation; nothing
//! stops the loop except the queue closing.

use crate::catalog::Catalog;
use crate::config::WalConfig;
use crate::confirmation::Confirmer;
use crate::entry::{Appended, Closed, CompactionReport, Committed, WalEntry};
use crate::error::WalError;
use crate::segment;
use crate::shard::ShardLog;
use crate::state::{Bookmark, WalState};
use std::collections::BTreeMap;
use std::sync::Arc;
use sw_core::{Request, RequestNumber, ServerId, ShardId};
use tokio::sync::mpsc;

/// What travels through the submission queue
#[derive(Debug)]
pub(crate) enum Message {
    Entry(WalEntry),
    /// Close with a bookmark, then refuse everything queued behind it
    Shutdown(Confirmer<Closed>),
    /// Stop accepting entries; queued ones are still applied
    Stop,
}

pub(crate) struct Sequencer {
    config: WalConfig,
    state: WalState,
    shards: BTreeMap<ShardId, ShardLog>,
    catalog: Arc<Catalog>,
    appends_since_bookmark: u64,
}

impl Sequencer {
    /// Recover every shard under the configured directory
    pub fn recover(config: WalConfig, catalog: Arc<Catalog>) -> Result<Self, WalError> {
        std::fs::create_dir_all(&config.dir)?;
        let state = WalState::load(&config.dir)?;

        let mut shards = BTreeMap::new();
        for shard_id in segment::list_shards(&config.dir)? {
            let recorded = state.shard(shard_id).cloned().unwrap_or_default();
            let (log, report) = ShardLog::recover(
                &config.dir,
                shard_id,
                recorded.next_request_number,
                &recorded.low_water_marks,
            )?;
            tracing::info!(
                %shard_id,
                segments = report.segments,
                records = report.records,
                bytes_truncated = report.bytes_truncated,
                next_request_number = %log.next_request_number(),
                "recovered shard"
            );
            catalog.publish(shard_id, log.snapshot());
            shards.insert(shard_id, log);
        }

        Ok(Self {
            config,
            state,
            shards,
            catalog,
            appends_since_bookmark: 0,
        })
    }

    /// Apply entries until the queue closes and drains
    pub fn run(mut self, mut rx: mpsc::Receiver<Message>) {
        tracing::info!(dir = %self.config.dir.display(), "sequencer started");
        let mut shut_down = false;
        while let Some(message) = rx.blocking_recv() {
            match message {
                Message::Entry(entry) if shut_down => entry.refuse(),
                Message::Entry(entry) => self.apply(entry),
                Message::Shutdown(confirm) if shut_down => {
                    confirm.confirm(Err(WalError::SequencerStopped));
                }
                Message::Shutdown(confirm) => {
                    confirm.confirm(self.close(true));
                    shut_down = true;
                    rx.close();
                }
                Message::Stop => rx.close(),
            }
        }

        for log in self.shards.values_mut() {
            if let Err(e) = log.sync() {
                tracing::warn!(shard_id = %log.shard_id(), error = %e, "final sync failed");
            }
        }
        tracing::info!("sequencer stopped");
    }

    pub fn apply(&mut self, entry: WalEntry) {
        let span = tracing::debug_span!("wal.apply", kind = entry.kind());
        let _guard = span.enter();

        match entry {
            WalEntry::Append {
                request,
                shard_id,
                assign_seq_only,
                confirm,
            } => {
                let result = self.append(request, shard_id, assign_seq_only);
                confirm.confirm(result);
                self.maybe_bookmark();
            }
            WalEntry::Commit {
                server_id,
                shard_id,
                request_number,
                confirm,
            } => {
                confirm.confirm(self.commit(server_id, shard_id, request_number));
            }
            WalEntry::Bookmark { confirm } => {
                confirm.confirm(self.bookmark());
            }
            WalEntry::Close {
                should_bookmark,
                confirm,
            } => {
                confirm.confirm(self.close(should_bookmark));
            }
            WalEntry::Compact { confirm } => {
                confirm.confirm(self.compact());
            }
        }
    }

    fn shard_log(&mut self, shard_id: ShardId) -> &mut ShardLog {
        let dir = &self.config.dir;
        let state = &self.state;
        let catalog = &self.catalog;
        self.shards.entry(shard_id).or_insert_with(|| {
            let next = state
                .shard(shard_id)
                .map(|s| s.next_request_number)
                .unwrap_or(RequestNumber::FIRST);
            let log = ShardLog::create(dir, shard_id, next);
            catalog.publish(shard_id, log.snapshot());
            log
        })
    }

    fn append(
        &mut self,
        request: Request,
        shard_id: ShardId,
        assign_seq_only: bool,
    ) -> Result<Appended, WalError> {
        let config = self.config.clone();
        let catalog = Arc::clone(&self.catalog);
        let log = self.shard_log(shard_id);
        let had_active = log.has_active_segment();

        let result = log.append(request, assign_seq_only, &config);

        // Opening, sealing or abandoning a segment changes the list
        match log.active_extent() {
            Some((base, len)) if had_active => {
                catalog.publish_append(shard_id, base, len, log.next_request_number());
            }
            None if !had_active => {
                catalog.publish_next_number(shard_id, log.next_request_number());
            }
            _ => catalog.publish(shard_id, log.snapshot()),
        }

        match &result {
            Ok(_) if !assign_seq_only => self.appends_since_bookmark += 1,
            // Only the state file remembers a number that left no record
            Ok(_) => self.save_next_numbers()?,
            Err(_) => {
                if let Err(e) = self.save_next_numbers() {
                    tracing::warn!(%shard_id, error = %e, "failed to record consumed number");
                }
            }
        }
        result
    }

    fn save_next_numbers(&mut self) -> Result<(), WalError> {
        let mut state = self.state.clone();
        self.record_next_numbers(&mut state);
        state.save(&self.config.dir)?;
        self.state = state;
        Ok(())
    }

    fn commit(
        &mut self,
        server_id: ServerId,
        shard_id: ShardId,
        request_number: RequestNumber,
    ) -> Result<Committed, WalError> {
        let confirmed = self
            .shards
            .get(&shard_id)
            .and_then(|log| log.confirmed(server_id))
            .ok_or(WalError::UnknownServer {
                server_id,
                shard_id,
            })?;
        if request_number > confirmed {
            return Err(WalError::CommitAhead {
                server_id,
                shard_id,
                requested: request_number,
                confirmed,
            });
        }

        // Compaction must never see a mark that was not saved
        let mut state = self.state.clone();
        self.record_next_numbers(&mut state);
        let mark = state
            .shard_mut(shard_id)
            .low_water_marks
            .entry(server_id)
            .or_insert(request_number);
        *mark = (*mark).max(request_number);
        let low_water_mark = *mark;
        state.save(&self.config.dir)?;
        self.state = state;

        tracing::debug!(%server_id, %shard_id, %low_water_mark, "commit recorded");
        Ok(Committed {
            server_id,
            shard_id,
            low_water_mark,
        })
    }

    /// Copy every shard's next request number into `state`
    fn record_next_numbers(&self, state: &mut WalState) {
        for (shard_id, log) in &self.shards {
            state.shard_mut(*shard_id).next_request_number = log.next_request_number();
        }
    }

    fn bookmark(&mut self) -> Result<Bookmark, WalError> {
        for log in self.shards.values_mut() {
            log.sync()?;
        }

        let mut state = self.state.clone();
        self.record_next_numbers(&mut state);
        let offsets = self
            .shards
            .iter()
            .map(|(id, log)| (*id, log.end_offset()))
            .collect();
        let next_numbers = self
            .shards
            .iter()
            .map(|(id, log)| (*id, log.next_request_number()))
            .collect();
        let bookmark = state.push_bookmark(offsets, next_numbers, self.config.bookmarks_to_keep);
        state.save(&self.config.dir)?;
        self.state = state;
        self.appends_since_bookmark = 0;

        tracing::info!(id = bookmark.id, shards = bookmark.offsets.len(), "bookmark recorded");
        Ok(bookmark)
    }

    fn maybe_bookmark(&mut self) {
        if self.config.bookmark_after == 0 || self.appends_since_bookmark < self.config.bookmark_after
        {
            return;
        }
        if let Err(e) = self.bookmark() {
            tracing::warn!(error = %e, "automatic bookmark failed");
        }
    }

    fn close(&mut self, should_bookmark: bool) -> Result<Closed, WalError> {
        let bookmark = if should_bookmark {
            Some(self.bookmark()?)
        } else {
            None
        };

        let mut sealed_segments = 0;
        let mut first_error = None;
        for (shard_id, log) in self.shards.iter_mut() {
            match log.seal_active() {
                Ok(true) => sealed_segments += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(%shard_id, error = %e, "failed to seal segment");
                    first_error.get_or_insert(e);
                }
            }
            self.catalog.publish(*shard_id, log.snapshot());
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        tracing::info!(sealed_segments, bookmarked = bookmark.is_some(), "closed active segments");
        Ok(Closed {
            bookmark,
            sealed_segments,
        })
    }

    fn compact(&mut self) -> Result<CompactionReport, WalError> {
        let mut report = CompactionReport::default();
        let empty = BTreeMap::new();
        for (shard_id, log) in self.shards.iter_mut() {
            let marks = self
                .state
                .shard(*shard_id)
                .map(|s| &s.low_water_marks)
                .unwrap_or(&empty);
            let (removed, bytes) = log.compact(marks)?;
            if removed > 0 {
                self.catalog.publish(*shard_id, log.snapshot());
            }
            report.segments_removed += removed;
            report.bytes_reclaimed += bytes;
        }

        tracing::info!(
            segments_removed = report.segments_removed,
            bytes_reclaimed = report.bytes_reclaimed,
            "compaction finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "sequencer_tests.rs"]
mod tests;
