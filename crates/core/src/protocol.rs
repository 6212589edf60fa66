// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Series protocol carried by write-ahead log requests
//!
//! The log never interprets a [`Request`]; these types only need to be
//! serializable and streamable through the processor pipeline.

use crate::id::ServerId;
use serde::{Deserialize, Serialize};

/// A single column value in a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int64(i64),
    Double(f64),
    String(String),
}

/// One row of a series
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Microseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_micros: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
    pub values: Vec<FieldValue>,
}

impl Point {
    pub fn new(timestamp_micros: i64, values: Vec<FieldValue>) -> Self {
        Self {
            timestamp_micros: Some(timestamp_micros),
            sequence_number: None,
            values,
        }
    }
}

/// A named set of points sharing one list of fields
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub fields: Vec<String>,
    pub points: Vec<Point>,
}

impl Series {
    pub fn new(name: impl Into<String>, fields: Vec<String>, points: Vec<Point>) -> Self {
        Self {
            name: name.into(),
            fields,
            points,
        }
    }

    /// Copy of this series under another name, with the same fields and points
    pub fn renamed(&self, alias: &str) -> Series {
        Series {
            name: alias.to_string(),
            fields: self.fields.clone(),
            points: self.points.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// What a request asks the storage layer to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Write,
    Delete,
    Query,
    DropDatabase,
}

/// Mutation request sequenced and persisted by the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub kind: RequestKind,
    pub database: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<Series>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub originating_server_id: ServerId,
}

impl Request {
    /// A write request for the given series
    pub fn write(database: impl Into<String>, series: Vec<Series>, server: ServerId) -> Self {
        Self {
            kind: RequestKind::Write,
            database: database.into(),
            series,
            query: None,
            originating_server_id: server,
        }
    }

    /// A request removing a database; carries no series
    pub fn drop_database(database: impl Into<String>, server: ServerId) -> Self {
        Self {
            kind: RequestKind::DropDatabase,
            database: database.into(),
            series: Vec::new(),
            query: None,
            originating_server_id: server,
        }
    }

    /// Total number of points across all series
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
