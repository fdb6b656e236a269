//! Host substrate bootstrap: a tokio runtime wired to an effio [`Runtime`].

use std::io;

use thiserror::Error;
use tokio::runtime::{Builder, Handle};

use effio_config::ResolvedHostConfig;
use effio_types::{Outcome, Value};

use crate::effect::Effect;
use crate::runtime::Runtime;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("no tokio runtime is active on this thread")]
    NoRuntime,
    #[error("failed to build the tokio host runtime")]
    Build(#[source] io::Error),
}

/// An owned multi-thread tokio runtime and an effio [`Runtime`] that yields
/// onto it.
#[derive(Debug)]
pub struct HostRuntime {
    tokio: tokio::runtime::Runtime,
    runtime: Runtime,
}

impl HostRuntime {
    pub fn from_config(config: &ResolvedHostConfig) -> Result<Self, HostError> {
        let mut builder = Builder::new_multi_thread();
        builder
            .worker_threads(config.worker_threads)
            .thread_name(config.thread_name.clone());
        if config.enable_time {
            builder.enable_time();
        }
        let tokio = builder.build().map_err(HostError::Build)?;
        let runtime = Runtime::tokio(tokio.handle().clone());

        tracing::debug!(
            worker_threads = config.worker_threads,
            thread_name = %config.thread_name,
            enable_time = config.enable_time,
            "Started host runtime"
        );
        Ok(Self { tokio, runtime })
    }

    #[must_use]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        self.tokio.handle()
    }

    /// Perform `effect` and block until it resolves.
    ///
    /// The calling thread enters the host context for the synchronous first
    /// step, so templates may create timers before their first suspension.
    /// Must not be called from one of the host's own worker threads.
    pub fn perform_blocking<T: Value>(&self, effect: &Effect<T>) -> Outcome<T> {
        let signal = {
            let _context = self.tokio.enter();
            self.runtime.perform(effect)
        };
        signal.wait()
    }
}
