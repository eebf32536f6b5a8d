//! Runner configuration loaded from TOML.
//!
//! ```toml
//! [runner]
//! thread_name = "handoff-worker"
//! max_updates = 10
//! ```

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_THREAD_NAME: &str = "handoff-worker";
pub const DEFAULT_MAX_UPDATES: usize = 10;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "HANDOFF_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Top-level layout of the config file.
#[derive(Debug, Default, Deserialize)]
pub struct HandoffConfig {
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Settings for a single [`TaskRunner`](crate::TaskRunner).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Name given to the worker thread (shows up in panics and debuggers).
    thread_name: String,
    /// Default batch size for `invoke_finished_callbacks`.
    max_updates: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            max_updates: DEFAULT_MAX_UPDATES,
        }
    }
}

impl RunnerConfig {
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    #[must_use]
    pub fn with_max_updates(mut self, max_updates: usize) -> Self {
        self.max_updates = max_updates;
        self
    }

    #[must_use]
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Batch size for one drain call. Never zero.
    #[must_use]
    pub fn max_updates(&self) -> usize {
        self.max_updates.max(1)
    }
}

impl HandoffConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Load the config at `path`. A missing file yields `Ok(None)`.
    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match Self::from_toml_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Load from [`config_path`]. No resolvable path or no file yields `Ok(None)`.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }
}

/// `$HANDOFF_CONFIG` if set, otherwise `~/.handoff/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".handoff").join("config.toml"))
}
