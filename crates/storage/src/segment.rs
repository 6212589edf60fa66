// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Segment files of a shard log
//!
//! A shard log is a sequence of segment files named after the logical
//! offset of their first byte (`<base:020>.log`). Offsets are logical:
//! compaction deletes whole segments without renumbering what remains.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use sw_core::ShardId;

const SEGMENT_EXTENSION: &str = "log";
const SHARD_DIR_PREFIX: &str = "shard-";

/// Directory holding the segments of one shard
pub fn shard_dir(wal_dir: &Path, shard_id: ShardId) -> PathBuf {
    wal_dir.join(format!("{}{:010}", SHARD_DIR_PREFIX, shard_id.0))
}

/// Shard id encoded in a shard directory name
pub fn parse_shard_dir_name(name: &str) -> Option<ShardId> {
    let digits = name.strip_prefix(SHARD_DIR_PREFIX)?;
    if digits.len() != 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(ShardId)
}

/// Shards with a directory under `wal_dir`, in ascending order
pub fn list_shards(wal_dir: &Path) -> io::Result<Vec<ShardId>> {
    let entries = match fs::read_dir(wal_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut shards = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(shard_id) = entry.file_name().to_str().and_then(parse_shard_dir_name) {
            shards.push(shard_id);
        }
    }
    shards.sort();
    Ok(shards)
}

/// File name of the segment starting at `base_offset`
pub fn segment_file_name(base_offset: u64) -> String {
    format!("{:020}.{}", base_offset, SEGMENT_EXTENSION)
}

/// Base offset encoded in a segment file name
pub fn parse_segment_file_name(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(".log")?;
    if stem.len() != 20 || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Location and readable length of one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSpan {
    pub base_offset: u64,
    pub len: u64,
    pub path: PathBuf,
}

impl SegmentSpan {
    /// Logical offset one past the last byte
    pub fn end_offset(&self) -> u64 {
        self.base_offset + self.len
    }
}

/// List the segments of a shard directory ordered by base offset
///
/// A missing directory is an empty log.
pub fn list_segments(shard_dir: &Path) -> io::Result<Vec<SegmentSpan>> {
    let entries = match fs::read_dir(shard_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut segments = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(base_offset) = name.to_str().and_then(parse_segment_file_name) else {
            continue;
        };
        segments.push(SegmentSpan {
            base_offset,
            len: entry.metadata()?.len(),
            path: entry.path(),
        });
    }
    segments.sort_by_key(|s| s.base_offset);
    Ok(segments)
}

/// Failed segment append
#[derive(Debug)]
pub struct AppendError {
    pub source: io::Error,
    /// False if the partial write could not be cut off again
    pub rolled_back: bool,
}

/// Writer for the active (unsealed) segment of a shard
pub struct SegmentWriter {
    path: PathBuf,
    file: File,
    base_offset: u64,
    len: u64,
    records: u64,
    unsynced: u64,
    #[cfg(test)]
    fail_sync: bool,
}

impl SegmentWriter {
    /// Create the segment starting at `base_offset`
    ///
    /// An existing empty file at that offset is reused; a non-empty one is
    /// an error since sealed segments are never written again.
    pub fn create(shard_dir: &Path, base_offset: u64) -> io::Result<Self> {
        fs::create_dir_all(shard_dir)?;
        let path = shard_dir.join(segment_file_name(base_offset));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        if file.metadata()?.len() != 0 {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("segment already has data: {}", path.display()),
            ));
        }

        Ok(Self {
            path,
            file,
            base_offset,
            len: 0,
            records: 0,
            unsynced: 0,
            #[cfg(test)]
            fail_sync: false,
        })
    }

    /// Append one encoded record, returning its logical byte span
    ///
    /// On failure the file is cut back to its previous length so that no
    /// torn record is left behind.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(u64, u64), AppendError> {
        let start = self.end_offset();
        if let Err(source) = self.file.write_all(bytes) {
            let rolled_back = self.file.set_len(self.len).is_ok();
            return Err(AppendError {
                source,
                rolled_back,
            });
        }

        self.len += bytes.len() as u64;
        self.records += 1;
        self.unsynced += 1;
        Ok((start, self.end_offset()))
    }

    /// Cut the segment back to `len` bytes, forgetting the records past it
    pub fn rollback(&mut self, len: u64, records: u64) -> io::Result<()> {
        self.file.set_len(len)?;
        self.len = len;
        self.records = records;
        self.unsynced = self.unsynced.min(records);
        Ok(())
    }

    /// Force appended records to disk
    pub fn sync(&mut self) -> io::Result<()> {
        if self.sync_refused() {
            return Err(io::Error::other("sync refused"));
        }
        if self.unsynced > 0 {
            self.file.sync_all()?;
            self.unsynced = 0;
        }
        Ok(())
    }

    /// Flush, sync and give up the file; the segment is never written again
    pub fn seal(mut self) -> io::Result<SegmentSpan> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(self.span())
    }

    pub fn span(&self) -> SegmentSpan {
        SegmentSpan {
            base_offset: self.base_offset,
            len: self.len,
            path: self.path.clone(),
        }
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub fn end_offset(&self) -> u64 {
        self.base_offset + self.len
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Records appended since the segment was created
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Appends not yet synced to disk
    pub fn unsynced(&self) -> u64 {
        self.unsynced
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
impl SegmentWriter {
    /// Swap the handle for a read-only one so writes and truncation fail
    pub(crate) fn reopen_read_only(&mut self) -> io::Result<()> {
        self.file = File::open(&self.path)?;
        Ok(())
    }

    pub(crate) fn set_sync_failure(&mut self, fail: bool) {
        self.fail_sync = fail;
    }

    fn sync_refused(&self) -> bool {
        self.fail_sync
    }
}

#[cfg(not(test))]
impl SegmentWriter {
    fn sync_refused(&self) -> bool {
        false
    }
}

/// Cut a segment file back to `len` bytes and sync it
pub fn truncate_segment(path: &Path, len: u64) -> io::Result<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(len)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
#[path = "segment_tests.rs"]
mod tests;
