//! Configuration with every default applied.

use std::num::NonZeroUsize;
use std::thread;

use crate::EffioConfig;

pub(crate) const DEFAULT_THREAD_NAME: &str = "effio-worker";
pub(crate) const DEFAULT_LOG_FILTER: &str = "effio=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub host: ResolvedHostConfig,
    pub logging: ResolvedLoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHostConfig {
    /// Always at least 1.
    pub worker_threads: usize,
    pub thread_name: String,
    pub enable_time: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLoggingConfig {
    pub filter: String,
}

impl ResolvedConfig {
    pub fn from_config(config: &EffioConfig) -> Self {
        let host = config.host.clone().unwrap_or_default();
        let logging = config.logging.clone().unwrap_or_default();

        let worker_threads = host
            .worker_threads
            .unwrap_or_else(default_worker_threads)
            .max(1);
        let thread_name = host
            .thread_name
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_THREAD_NAME.to_string());
        let filter = logging
            .filter
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Self {
            host: ResolvedHostConfig {
                worker_threads,
                thread_name,
                enable_time: host.enable_time.unwrap_or(true),
            },
            logging: ResolvedLoggingConfig { filter },
        }
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self::from_config(&EffioConfig::default())
    }
}

impl Default for ResolvedHostConfig {
    fn default() -> Self {
        ResolvedConfig::default().host
    }
}

impl Default for ResolvedLoggingConfig {
    fn default() -> Self {
        ResolvedConfig::default().logging
    }
}

fn default_worker_threads() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
