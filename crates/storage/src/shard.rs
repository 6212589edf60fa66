// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The log of a single shard, owned by the sequencer thread

use crate::catalog::ShardSnapshot;
use crate::config::WalConfig;
use crate::entry::{Appended, RecordSpan};
use crate::error::WalError;
use crate::record::WalRecord;
use crate::replay::{repair_segments, scan_segment};
use crate::segment::{self, AppendError, SegmentSpan, SegmentWriter};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use sw_core::{Request, RequestNumber, ServerId, ShardId};

/// A sealed segment and the highest request number it holds per server
#[derive(Debug, Clone)]
struct SealedSegment {
    span: SegmentSpan,
    max_per_server: BTreeMap<ServerId, RequestNumber>,
}

impl SealedSegment {
    /// True if every record in the segment is at or below its server's mark
    fn is_committed(&self, low_water_marks: &BTreeMap<ServerId, RequestNumber>) -> bool {
        self.max_per_server
            .iter()
            .all(|(server, max)| low_water_marks.get(server).is_some_and(|lwm| lwm >= max))
    }
}

struct ActiveSegment {
    writer: SegmentWriter,
    max_per_server: BTreeMap<ServerId, RequestNumber>,
}

/// What happened to a shard log when it was opened
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct RecoveryReport {
    pub segments: usize,
    pub records: u64,
    pub bytes_truncated: u64,
}

pub(crate) struct ShardLog {
    shard_id: ShardId,
    dir: PathBuf,
    sealed: Vec<SealedSegment>,
    active: Option<ActiveSegment>,
    end_offset: u64,
    next_request_number: RequestNumber,
    /// Highest confirmed request number per originating server
    confirmed: BTreeMap<ServerId, RequestNumber>,
}

impl ShardLog {
    /// Open a shard log, repairing a torn tail and rebuilding its summaries
    ///
    /// Every segment found on disk is treated as sealed.
    pub fn recover(
        wal_dir: &Path,
        shard_id: ShardId,
        recorded_next: RequestNumber,
        low_water_marks: &BTreeMap<ServerId, RequestNumber>,
    ) -> Result<(Self, RecoveryReport), WalError> {
        let dir = segment::shard_dir(wal_dir, shard_id);
        let (spans, bytes_truncated) = repair_segments(&dir)?;

        let mut report = RecoveryReport {
            segments: spans.len(),
            bytes_truncated,
            ..RecoveryReport::default()
        };
        let mut confirmed = low_water_marks.clone();
        let mut max_durable: Option<RequestNumber> = None;
        let mut sealed = Vec::with_capacity(spans.len());

        for span in spans {
            let scan = scan_segment(&span)?;
            if let Some((offset, kind)) = &scan.corruption {
                tracing::warn!(
                    %shard_id,
                    offset,
                    error = %kind,
                    "sealed segment is corrupt; replay will stop there"
                );
            }
            report.records += scan.records;
            max_durable = max_durable.max(scan.max_request_number);
            for (server, max) in &scan.max_per_server {
                let entry = confirmed.entry(*server).or_insert(*max);
                *entry = (*entry).max(*max);
            }
            sealed.push(SealedSegment {
                span,
                max_per_server: scan.max_per_server,
            });
        }

        let end_offset = sealed.last().map(|s| s.span.end_offset()).unwrap_or(0);
        let next_request_number = match max_durable {
            Some(max) => recorded_next.max(max.next()),
            None => recorded_next,
        };

        let log = Self {
            shard_id,
            dir,
            sealed,
            active: None,
            end_offset,
            next_request_number,
            confirmed,
        };
        Ok((log, report))
    }

    /// An empty log for a shard seen for the first time
    pub fn create(wal_dir: &Path, shard_id: ShardId, recorded_next: RequestNumber) -> Self {
        Self {
            shard_id,
            dir: segment::shard_dir(wal_dir, shard_id),
            sealed: Vec::new(),
            active: None,
            end_offset: 0,
            next_request_number: recorded_next,
            confirmed: BTreeMap::new(),
        }
    }

    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    pub fn end_offset(&self) -> u64 {
        self.end_offset
    }

    pub fn next_request_number(&self) -> RequestNumber {
        self.next_request_number
    }

    /// Highest confirmed request number from `server_id`, if any
    pub fn confirmed(&self, server_id: ServerId) -> Option<RequestNumber> {
        self.confirmed.get(&server_id).copied()
    }

    pub fn has_active_segment(&self) -> bool {
        self.active.is_some()
    }

    /// Base offset and length of the active segment
    pub fn active_extent(&self) -> Option<(u64, u64)> {
        self.active
            .as_ref()
            .map(|a| (a.writer.base_offset(), a.writer.len()))
    }

    /// Assign the next request number and persist the request
    ///
    /// The number is consumed whether or not the write succeeds.
    pub fn append(
        &mut self,
        request: Request,
        assign_seq_only: bool,
        config: &WalConfig,
    ) -> Result<Appended, WalError> {
        let request_number = self.next_request_number;
        self.next_request_number = request_number.next();
        let server_id = request.originating_server_id;

        if assign_seq_only {
            self.note_confirmed(server_id, request_number);
            return Ok(Appended {
                shard_id: self.shard_id,
                request_number,
                span: None,
            });
        }

        let shard_id = self.shard_id;
        let write_failure = move |source: io::Error| WalError::WriteFailure {
            shard_id,
            request_number,
            source,
        };

        let bytes = WalRecord::new(request_number, self.shard_id, request)
            .encode()
            .map_err(write_failure)?;

        let active = self.active_segment().map_err(write_failure)?;
        let (prev_len, prev_records) = (active.writer.len(), active.writer.records());

        let (start_offset, end_offset) = match active.writer.append(&bytes) {
            Ok(span) => span,
            Err(AppendError {
                source,
                rolled_back,
            }) => {
                tracing::warn!(
                    %shard_id,
                    %request_number,
                    error = %source,
                    rolled_back,
                    "append failed"
                );
                if !rolled_back {
                    self.abandon_active();
                }
                return Err(write_failure(source));
            }
        };

        if active.writer.unsynced() >= config.flush_after {
            if let Err(source) = active.writer.sync() {
                tracing::warn!(
                    %shard_id,
                    %request_number,
                    error = %source,
                    "sync failed, rolling back append"
                );
                if active.writer.rollback(prev_len, prev_records).is_err() {
                    self.abandon_active();
                }
                return Err(write_failure(source));
            }
        }

        let max = active
            .max_per_server
            .entry(server_id)
            .or_insert(request_number);
        *max = (*max).max(request_number);
        let rotate = active.writer.records() >= config.segment_max_records
            || active.writer.len() >= config.segment_max_bytes;

        self.end_offset = end_offset;
        self.note_confirmed(server_id, request_number);

        if rotate {
            if let Err(e) = self.seal_active() {
                tracing::warn!(shard_id = %self.shard_id, error = %e, "segment rotation failed");
            }
        }

        Ok(Appended {
            shard_id,
            request_number,
            span: Some(RecordSpan {
                start_offset,
                end_offset,
            }),
        })
    }

    fn note_confirmed(&mut self, server_id: ServerId, request_number: RequestNumber) {
        let entry = self.confirmed.entry(server_id).or_insert(request_number);
        *entry = (*entry).max(request_number);
    }

    /// The active segment, opening one at the end of the log if needed
    fn active_segment(&mut self) -> io::Result<&mut ActiveSegment> {
        if self.active.is_none() {
            // An empty sealed segment at the end offset is reopened in place
            if self
                .sealed
                .last()
                .is_some_and(|s| s.span.len == 0 && s.span.base_offset == self.end_offset)
            {
                self.sealed.pop();
            }
            let writer = SegmentWriter::create(&self.dir, self.end_offset)?;
            tracing::debug!(
                shard_id = %self.shard_id,
                base_offset = self.end_offset,
                "opened segment"
            );
            self.active = Some(ActiveSegment {
                writer,
                max_per_server: BTreeMap::new(),
            });
        }
        self.active
            .as_mut()
            .ok_or_else(|| io::Error::other("active segment unavailable"))
    }

    /// Give up on an active segment whose tail could not be rolled back
    ///
    /// The segment keeps only the bytes of confirmed records; anything past
    /// them is cut off again on the next open.
    fn abandon_active(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let mut span = active.writer.span();
        span.len = self.end_offset.saturating_sub(span.base_offset);
        tracing::warn!(
            shard_id = %self.shard_id,
            base_offset = span.base_offset,
            "sealing segment after failed rollback"
        );
        drop(active.writer);

        if span.len == 0 {
            if let Err(e) = fs::remove_file(&span.path) {
                tracing::warn!(path = %span.path.display(), error = %e, "failed to remove segment");
            }
            return;
        }
        self.sealed.push(SealedSegment {
            span,
            max_per_server: active.max_per_server,
        });
    }

    /// Fsync the active segment
    pub fn sync(&mut self) -> Result<(), WalError> {
        if let Some(active) = self.active.as_mut() {
            active
                .writer
                .sync()
                .map_err(|source| WalError::Persist {
                    what: "segment",
                    source,
                })?;
        }
        Ok(())
    }

    /// Seal the active segment; returns whether there was one
    pub fn seal_active(&mut self) -> Result<bool, WalError> {
        let Some(active) = self.active.take() else {
            return Ok(false);
        };
        let span = active.writer.span();
        self.sealed.push(SealedSegment {
            span,
            max_per_server: active.max_per_server,
        });
        active.writer.seal().map_err(|source| WalError::Persist {
            what: "segment",
            source,
        })?;
        tracing::debug!(shard_id = %self.shard_id, "sealed segment");
        Ok(true)
    }

    /// Delete the longest prefix of sealed segments that are fully committed
    ///
    /// The newest segment is always kept so the end offset survives a restart.
    /// Returns the number of segments removed and the bytes they held.
    pub fn compact(
        &mut self,
        low_water_marks: &BTreeMap<ServerId, RequestNumber>,
    ) -> Result<(usize, u64), WalError> {
        let retain_last = usize::from(self.active.is_none());
        let candidates = self.sealed.len().saturating_sub(retain_last);
        let removable = self.sealed[..candidates]
            .iter()
            .take_while(|s| s.is_committed(low_water_marks))
            .count();

        let mut bytes = 0;
        let mut removed = 0;
        for sealed in &self.sealed[..removable] {
            match fs::remove_file(&sealed.span.path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    self.sealed.drain(..removed);
                    return Err(WalError::Persist {
                        what: "segment removal",
                        source,
                    });
                }
            }
            bytes += sealed.span.len;
            removed += 1;
        }
        self.sealed.drain(..removed);

        if removed > 0 {
            tracing::info!(shard_id = %self.shard_id, removed, bytes, "compacted shard");
        }
        Ok((removed, bytes))
    }

    /// Segment list for readers
    pub fn snapshot(&self) -> ShardSnapshot {
        let mut segments: Vec<SegmentSpan> = self.sealed.iter().map(|s| s.span.clone()).collect();
        if let Some(active) = &self.active {
            segments.push(active.writer.span());
        }
        ShardSnapshot {
            segments,
            end_offset: self.end_offset,
            next_request_number: self.next_request_number,
        }
    }
}

#[cfg(test)]
#[path = "shard_tests.rs"]
mod tests;
