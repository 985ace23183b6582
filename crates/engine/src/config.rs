// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration

use crate::dispatch::DispatcherConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading an engine configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine configuration
///
/// Loadable from TOML; durations accept humantime strings ("30s", "5m").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root of the durable data directory (resources, locks, actions)
    pub data_dir: PathBuf,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    /// How long `perform` polls for the advisory lock before giving up;
    /// unset means fail immediately on contention
    #[serde(default, with = "humantime_serde::option")]
    pub lock_wait_timeout: Option<Duration>,
    /// Poll interval while waiting for the advisory lock
    #[serde(default = "default_lock_poll_interval", with = "humantime_serde")]
    pub lock_poll_interval: Duration,
}

fn default_lock_poll_interval() -> Duration {
    Duration::from_millis(200)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            dispatcher: DispatcherConfig::default(),
            lock_wait_timeout: None,
            lock_poll_interval: default_lock_poll_interval(),
        }
    }
}

impl EngineConfig {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}
