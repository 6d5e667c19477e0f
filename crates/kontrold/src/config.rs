//! Daemon configuration file.
//!
//! TOML, one `[jobs.<name>]` table per monitored job. The job tables
//! deserialize straight into `kontrol_state::JobSpec`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use kontrol_state::JobSpec;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Randomize the status surface's response code (test harness mode).
    #[serde(default)]
    pub chaos: bool,

    #[serde(default)]
    pub host: HostConfig,

    /// Monitored jobs, keyed by unique name.
    #[serde(default)]
    pub jobs: BTreeMap<String, JobSpec>,
}

/// Container-host connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_socket")]
    pub socket: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            socket: default_socket(),
        }
    }
}

fn default_socket() -> String {
    kontrol_host::docker::DEFAULT_SOCKET.to_string()
}

/// Load and parse the config file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
