//! Configuration for effio hosts.
//!
//! The effect core reads no configuration of its own. This crate describes
//! the host substrate it runs on (the tokio runtime) and the logging setup,
//! loaded from `~/.effio/config.toml`:
//!
//! ```toml
//! [host]
//! worker_threads = 4
//! thread_name = "effio-worker"
//! enable_time = true
//!
//! [logging]
//! filter = "effio=info"
//! ```
//!
//! Every field is optional; [`EffioConfig::resolve`] fills in defaults.

mod logging;
mod resolved;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub use logging::init_tracing;
pub use resolved::{ResolvedConfig, ResolvedHostConfig, ResolvedLoggingConfig};

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct EffioConfig {
    pub host: Option<HostConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct HostConfig {
    /// Tokio worker threads. Default: available parallelism.
    pub worker_threads: Option<usize>,
    /// Worker thread name. Default: `effio-worker`.
    pub thread_name: Option<String>,
    /// Enable the tokio timer driver. Default: true.
    pub enable_time: Option<bool>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl EffioConfig {
    /// Load the config from its default location.
    ///
    /// A missing file, an unreadable one, or one that fails to parse yields
    /// `None`; the latter two are logged.
    pub fn load() -> Option<Self> {
        let path = config_path()?;
        if !path.exists() {
            return None;
        }

        match Self::load_from(&path) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!("Ignoring effio config: {err}");
                None
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Apply defaults to every unset field.
    #[must_use]
    pub fn resolve(&self) -> ResolvedConfig {
        ResolvedConfig::from_config(self)
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".effio").join("config.toml"))
}
