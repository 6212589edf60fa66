// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator configuration, read from the `[coordinator]` table

use crate::error::CoordinatorError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use sw_core::ServerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Number of shards series are spread across
    pub shard_count: u32,
    /// Server id stamped on every request this node originates
    pub server_id: ServerId,
    /// How long a write waits for each shard to confirm
    #[serde(with = "humantime_serde")]
    pub confirmation_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            shard_count: 4,
            server_id: ServerId(1),
            confirmation_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    coordinator: Option<CoordinatorConfig>,
}

impl CoordinatorConfig {
    pub fn load(path: &Path) -> Result<Self, CoordinatorError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoordinatorError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Parse the `[coordinator]` table; a missing table means defaults
    pub fn from_toml_str(text: &str) -> Result<Self, CoordinatorError> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| CoordinatorError::Config(e.to_string()))?;
        let config = file.coordinator.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.shard_count == 0 {
            return Err(CoordinatorError::Config(
                "shard_count must be at least 1".to_string(),
            ));
        }
        if self.confirmation_timeout.is_zero() {
            return Err(CoordinatorError::Config(
                "confirmation_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
