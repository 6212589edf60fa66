// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bookmarks command

use crate::output::{self, OutputFormat};
use serde::Serialize;
use std::fmt;
use sw_storage::{Bookmark, WalConfig, WalState};

#[derive(Serialize)]
#[serde(transparent)]
struct BookmarkRow(Bookmark);

impl fmt::Display for BookmarkRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bookmark = &self.0;
        write!(
            f,
            "{:<6} {}",
            bookmark.id,
            bookmark.taken_at.format("%Y-%m-%dT%H:%M:%SZ")
        )?;
        let offsets: Vec<String> = bookmark
            .offsets
            .iter()
            .map(|(shard, offset)| format!("{shard}={offset}"))
            .collect();
        if offsets.is_empty() {
            write!(f, " -")
        } else {
            write!(f, " {}", offsets.join(" "))
        }
    }
}

pub fn handle(config: &WalConfig, format: OutputFormat) -> anyhow::Result<()> {
    let state = WalState::load(&config.dir)?;
    let rows: Vec<_> = state.bookmarks.into_iter().map(BookmarkRow).collect();
    output::print_list(
        "ID     TAKEN AT             SHARD=OFFSET",
        "No bookmarks",
        &rows,
        format,
    );
    Ok(())
}
