// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log record framing with checksum verification
//!
//! Each record is one line of JSON terminated by `\n`. The line carries the
//! request number, shard, originating server, append timestamp, the request
//! itself and a CRC32 over all of them.

use serde::{Deserialize, Serialize};
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};
use sw_core::{FieldValue, Request, RequestNumber, ServerId, ShardId};

/// A single record in a shard log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    pub request_number: RequestNumber,
    pub shard_id: ShardId,
    /// Server the request originated from
    pub server_id: ServerId,
    /// Microseconds since Unix epoch
    pub timestamp_micros: u64,
    pub request: Request,
    /// CRC32 of request number, shard, server and serialized request
    pub checksum: u32,
}

impl WalRecord {
    /// Create a record with computed checksum
    pub fn new(request_number: RequestNumber, shard_id: ShardId, request: Request) -> Self {
        let timestamp_micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Self::new_with_timestamp(request_number, shard_id, timestamp_micros, request)
    }

    /// Create a record with a specific timestamp (for testing)
    pub fn new_with_timestamp(
        request_number: RequestNumber,
        shard_id: ShardId,
        timestamp_micros: u64,
        request: Request,
    ) -> Self {
        let server_id = request.originating_server_id;
        let checksum = Self::calculate_checksum(request_number, shard_id, server_id, &request);
        Self {
            request_number,
            shard_id,
            server_id,
            timestamp_micros,
            request,
            checksum,
        }
    }

    fn calculate_checksum(
        request_number: RequestNumber,
        shard_id: ShardId,
        server_id: ServerId,
        request: &Request,
    ) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&request_number.0.to_le_bytes());
        hasher.update(&shard_id.0.to_le_bytes());
        hasher.update(&server_id.0.to_le_bytes());
        // Request only holds strings, numbers and enums, so this cannot fail
        let json = serde_json::to_string(request).unwrap_or_default();
        hasher.update(json.as_bytes());
        hasher.finalize()
    }

    /// Verify the checksum matches the record contents
    pub fn verify(&self) -> bool {
        self.checksum
            == Self::calculate_checksum(
                self.request_number,
                self.shard_id,
                self.server_id,
                &self.request,
            )
    }

    /// Serialize to one line of JSON (without the trailing newline)
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from a single line of JSON
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Encode as the exact bytes appended to a segment
    ///
    /// Non-finite doubles are rejected: JSON has no representation for
    /// them, so the record could never be read back.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        if has_non_finite(&self.request) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "request contains a non-finite double",
            ));
        }
        let mut line = self
            .to_line()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            .into_bytes();
        line.push(b'\n');
        Ok(line)
    }
}

fn has_non_finite(request: &Request) -> bool {
    request
        .series
        .iter()
        .flat_map(|s| s.points.iter())
        .flat_map(|p| p.values.iter())
        .any(|v| matches!(v, FieldValue::Double(d) if !d.is_finite()))
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
