// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay of a shard log from an arbitrary offset
//!
//! A cursor works against a fixed list of segment spans taken when it opens.
//! Records appended later are not visible; open a new cursor from the last
//! `end_offset` to continue.
//!
//! The first invalid record (undecodable line, torn tail or checksum mismatch)
//! ends the stream with an error. Nothing is yielded after an error.

use crate::error::{ReplayError, ReplayErrorKind, WalError};
use crate::record::WalRecord;
use crate::segment::{self, SegmentSpan};
use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use sw_core::{Request, RequestNumber, ServerId, ShardId};

/// Where a replay starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayFrom {
    /// First byte of the oldest retained segment
    Start,
    /// A logical offset, usually a bookmark or a previous `end_offset`
    Offset(u64),
}

/// A request reconstructed from the log
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayRequest {
    pub request_number: RequestNumber,
    pub request: Request,
    pub shard_id: ShardId,
    pub server_id: ServerId,
    pub start_offset: u64,
    /// Exclusive; a cursor opened here resumes with the next record
    pub end_offset: u64,
}

impl ReplayRequest {
    fn from_record(record: WalRecord, start_offset: u64, end_offset: u64) -> Self {
        Self {
            request_number: record.request_number,
            request: record.request,
            shard_id: record.shard_id,
            server_id: record.server_id,
            start_offset,
            end_offset,
        }
    }
}

/// A validated record and its logical byte span
pub(crate) struct ScannedRecord {
    pub record: WalRecord,
    pub start_offset: u64,
    pub end_offset: u64,
}

/// Line reader over one segment, bounded by the span's length
pub(crate) struct SegmentReader {
    reader: BufReader<io::Take<File>>,
    position: u64,
    line: Vec<u8>,
}

impl SegmentReader {
    /// Open `span` positioned at logical offset `from`
    pub fn open(span: &SegmentSpan, from: u64) -> io::Result<Self> {
        let skip = from.saturating_sub(span.base_offset).min(span.len);
        let mut file = File::open(&span.path)?;
        file.seek(SeekFrom::Start(skip))?;
        Ok(Self {
            reader: BufReader::new(file.take(span.len - skip)),
            position: span.base_offset + skip,
            line: Vec::new(),
        })
    }

    /// Logical offset of the next unread byte
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Next valid record, `None` at the end of the span
    pub fn next_record(&mut self) -> Option<Result<ScannedRecord, (u64, ReplayErrorKind)>> {
        loop {
            self.line.clear();
            let start = self.position;
            let read = match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => return None,
                Ok(read) => read,
                Err(e) => return Some(Err((start, ReplayErrorKind::Io(e)))),
            };
            self.position += read as u64;

            let Some(body) = self.line.strip_suffix(b"\n") else {
                return Some(Err((
                    start,
                    ReplayErrorKind::Corrupted {
                        reason: "truncated record".to_string(),
                    },
                )));
            };

            // Skip blank lines
            if body.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let record = match std::str::from_utf8(body)
                .map_err(|e| e.to_string())
                .and_then(|line| WalRecord::from_line(line).map_err(|e| e.to_string()))
            {
                Ok(record) => record,
                Err(reason) => {
                    return Some(Err((start, ReplayErrorKind::Corrupted { reason })));
                }
            };

            if !record.verify() {
                return Some(Err((
                    start,
                    ReplayErrorKind::ChecksumMismatch {
                        request_number: record.request_number,
                    },
                )));
            }

            return Some(Ok(ScannedRecord {
                record,
                start_offset: start,
                end_offset: self.position,
            }));
        }
    }
}

/// Forward-only iterator over the requests of one shard
pub struct ReplayCursor {
    shard_id: ShardId,
    segments: VecDeque<SegmentSpan>,
    reader: Option<SegmentReader>,
    position: u64,
    done: bool,
}

impl std::fmt::Debug for ReplayCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayCursor")
            .field("shard_id", &self.shard_id)
            .field("position", &self.position)
            .field("remaining_segments", &self.segments.len())
            .field("done", &self.done)
            .finish()
    }
}

impl ReplayCursor {
    /// Open a cursor over the files currently in `wal_dir`
    ///
    /// Use this when no [`Wal`](crate::Wal) is running on the directory;
    /// a live WAL hands out cursors through [`WalHandle::replay`](crate::WalHandle::replay).
    pub fn open(wal_dir: &Path, shard_id: ShardId, from: ReplayFrom) -> Result<Self, ReplayError> {
        let offset = match from {
            ReplayFrom::Offset(offset) => offset,
            ReplayFrom::Start => 0,
        };
        let segments = segment::list_segments(&segment::shard_dir(wal_dir, shard_id))
            .map_err(|e| ReplayError::new(shard_id, offset, e.into()))?;
        let end_offset = segments.last().map(SegmentSpan::end_offset).unwrap_or(0);
        Self::from_segments(shard_id, segments, end_offset, from)
    }

    pub(crate) fn from_segments(
        shard_id: ShardId,
        segments: Vec<SegmentSpan>,
        end_offset: u64,
        from: ReplayFrom,
    ) -> Result<Self, ReplayError> {
        let first_offset = segments
            .first()
            .map(|s| s.base_offset)
            .unwrap_or(end_offset);

        let offset = match from {
            ReplayFrom::Start => first_offset,
            ReplayFrom::Offset(offset) => offset,
        };
        if offset > end_offset {
            return Err(ReplayError::new(
                shard_id,
                offset,
                ReplayErrorKind::OffsetOutOfRange { end: end_offset },
            ));
        }
        if offset < first_offset {
            return Err(ReplayError::new(
                shard_id,
                offset,
                ReplayErrorKind::OffsetCompacted {
                    first: first_offset,
                },
            ));
        }

        let segments = segments
            .into_iter()
            .filter(|s| s.end_offset() > offset)
            .collect();

        tracing::debug!(%shard_id, offset, end_offset, "replay cursor opened");

        Ok(Self {
            shard_id,
            segments,
            reader: None,
            position: offset,
            done: false,
        })
    }

    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    /// Offset a new cursor would have to start from to continue this one
    pub fn position(&self) -> u64 {
        self.position
    }

    fn fail(
        &mut self,
        offset: u64,
        kind: ReplayErrorKind,
    ) -> Option<Result<ReplayRequest, ReplayError>> {
        self.done = true;
        self.reader = None;
        self.segments.clear();
        Some(Err(ReplayError::new(self.shard_id, offset, kind)))
    }
}

impl Iterator for ReplayCursor {
    type Item = Result<ReplayRequest, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if self.reader.is_none() {
                let Some(span) = self.segments.pop_front() else {
                    self.done = true;
                    return None;
                };
                // Gaps between segments are skipped
                let from = self.position.max(span.base_offset);
                match SegmentReader::open(&span, from) {
                    Ok(reader) => {
                        self.position = reader.position();
                        self.reader = Some(reader);
                    }
                    Err(e) => return self.fail(from, e.into()),
                }
            }
            let Some(reader) = self.reader.as_mut() else {
                continue;
            };

            match reader.next_record() {
                None => {
                    self.reader = None;
                }
                Some(Ok(scanned)) => {
                    if scanned.record.shard_id != self.shard_id {
                        let reason =
                            format!("record belongs to shard {}", scanned.record.shard_id);
                        let kind = ReplayErrorKind::Corrupted { reason };
                        return self.fail(scanned.start_offset, kind);
                    }
                    self.position = scanned.end_offset;
                    return Some(Ok(ReplayRequest::from_record(
                        scanned.record,
                        scanned.start_offset,
                        scanned.end_offset,
                    )));
                }
                Some(Err((offset, kind))) => return self.fail(offset, kind),
            }
        }
    }
}

impl std::iter::FusedIterator for ReplayCursor {}

/// What a full scan of one segment found
#[derive(Debug, Default)]
pub(crate) struct SegmentScan {
    pub records: u64,
    /// Highest request number per originating server
    pub max_per_server: BTreeMap<ServerId, RequestNumber>,
    pub max_request_number: Option<RequestNumber>,
    /// Logical offset just past the last valid record
    pub valid_end: u64,
    pub corruption: Option<(u64, ReplayErrorKind)>,
}

pub(crate) fn scan_segment(span: &SegmentSpan) -> io::Result<SegmentScan> {
    let mut reader = SegmentReader::open(span, span.base_offset)?;
    let mut scan = SegmentScan {
        valid_end: span.base_offset,
        ..SegmentScan::default()
    };

    while let Some(result) = reader.next_record() {
        match result {
            Ok(scanned) => {
                let record = scanned.record;
                scan.records += 1;
                scan.valid_end = scanned.end_offset;
                scan.max_request_number = scan.max_request_number.max(Some(record.request_number));
                let max = scan
                    .max_per_server
                    .entry(record.server_id)
                    .or_insert(record.request_number);
                *max = (*max).max(record.request_number);
            }
            Err(corruption) => {
                scan.corruption = Some(corruption);
                break;
            }
        }
    }

    // Trailing blank lines are part of the valid prefix
    if scan.corruption.is_none() {
        scan.valid_end = reader.position();
    }
    Ok(scan)
}

/// List a shard's segments, cutting off any bytes that overlap the next
/// segment and any torn tail of the last one
///
/// Returns the surviving segments and the number of bytes removed.
pub(crate) fn repair_segments(shard_dir: &Path) -> io::Result<(Vec<SegmentSpan>, u64)> {
    let mut segments = segment::list_segments(shard_dir)?;
    let mut removed = 0;

    for i in 1..segments.len() {
        let next_base = segments[i].base_offset;
        let prev = &mut segments[i - 1];
        if prev.end_offset() > next_base {
            let keep = next_base - prev.base_offset;
            tracing::warn!(
                path = %prev.path.display(),
                keep,
                "segment overlaps its successor, truncating"
            );
            segment::truncate_segment(&prev.path, keep)?;
            removed += prev.len - keep;
            prev.len = keep;
        }
    }

    if let Some(last) = segments.last_mut() {
        let scan = scan_segment(last)?;
        if let Some((offset, kind)) = scan.corruption {
            let keep = scan.valid_end - last.base_offset;
            tracing::warn!(
                path = %last.path.display(),
                offset,
                error = %kind,
                keep,
                "torn tail in last segment, truncating"
            );
            segment::truncate_segment(&last.path, keep)?;
            removed += last.len - keep;
            last.len = keep;
        }
    }

    Ok((segments, removed))
}

/// Where a shard log first goes bad
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardCorruption {
    pub offset: u64,
    pub reason: String,
}

/// Result of [`validate_shard`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardValidation {
    pub shard_id: ShardId,
    pub segments: usize,
    pub valid_records: u64,
    pub last_request_number: Option<RequestNumber>,
    pub first_offset: u64,
    pub end_offset: u64,
    pub corruption: Option<ShardCorruption>,
}

impl ShardValidation {
    pub fn is_valid(&self) -> bool {
        self.corruption.is_none()
    }
}

/// Read every record of a shard and report the first problem, if any
pub fn validate_shard(wal_dir: &Path, shard_id: ShardId) -> Result<ShardValidation, WalError> {
    let segments = segment::list_segments(&segment::shard_dir(wal_dir, shard_id))?;
    let end_offset = segments.last().map(SegmentSpan::end_offset).unwrap_or(0);
    let first_offset = segments.first().map(|s| s.base_offset).unwrap_or(0);
    let segment_count = segments.len();

    let mut validation = ShardValidation {
        shard_id,
        segments: segment_count,
        valid_records: 0,
        last_request_number: None,
        first_offset,
        end_offset,
        corruption: None,
    };

    let cursor = ReplayCursor::from_segments(shard_id, segments, end_offset, ReplayFrom::Start)
        .map_err(|e| WalError::Io(io::Error::other(e)))?;
    for result in cursor {
        match result {
            Ok(request) => {
                validation.valid_records += 1;
                validation.last_request_number = Some(request.request_number);
            }
            Err(e) => {
                tracing::warn!(error = %e, "shard validation found corruption");
                validation.corruption = Some(ShardCorruption {
                    offset: e.offset,
                    reason: e.kind.to_string(),
                });
            }
        }
    }

    Ok(validation)
}

/// Truncate a torn tail of a shard log; returns the number of bytes removed
///
/// Only run this while no [`Wal`](crate::Wal) has the directory open. Opening
/// a WAL performs the same repair.
pub fn repair_shard(wal_dir: &Path, shard_id: ShardId) -> Result<u64, WalError> {
    let (_, removed) = repair_segments(&segment::shard_dir(wal_dir, shard_id))?;
    if removed > 0 {
        tracing::info!(%shard_id, removed, "shard repaired");
    }
    Ok(removed)
}

/// Shards that have a log directory under `wal_dir`
pub fn shard_ids(wal_dir: &Path) -> Result<Vec<ShardId>, WalError> {
    Ok(segment::list_shards(wal_dir)?)
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
