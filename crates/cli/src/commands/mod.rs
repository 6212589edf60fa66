// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod bookmarks;
pub mod compact;
pub mod replay;
pub mod shards;
pub mod validate;
