// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Runtime options for the core substrate.
///
/// Typically loaded from a YAML file; every field has a default so hosts
/// only write the options they change.
///
/// # Example
/// ```yaml
/// executor:
///   max_concurrent_runs: 8
/// watch:
///   status_interval_secs: 30
///   list_interval_secs: 60
///   channel_capacity: 8
/// ```
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub executor: ExecutorOptions,
    #[serde(default)]
    pub watch: WatchOptions,
}

/// Pipeline executor options.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ExecutorOptions {
    /// Upper bound on concurrently executing runs. `None` means unbounded.
    pub max_concurrent_runs: Option<usize>,
}

/// Watch-stream cadences and buffering.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchOptions {
    /// Poll interval for status-like resources.
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,
    /// Poll interval for list-like resources.
    #[serde(default = "default_list_interval")]
    pub list_interval_secs: u64,
    /// Buffered channel capacity for watch streams.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            status_interval_secs: default_status_interval(),
            list_interval_secs: default_list_interval(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_status_interval() -> u64 {
    30
}

fn default_list_interval() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    8
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Loads a [`CoreConfig`] from a YAML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<CoreConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config = serde_yaml::from_str(&contents)?;
    Ok(config)
}
