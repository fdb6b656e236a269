//! The handle executions run on.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

use effio_signal::CompletionSignal;
use effio_types::{Outcome, Value};

use crate::effect::Effect;
use crate::execution;
use crate::host::HostError;
use crate::scheduler::{Scheduler, TokioScheduler};

/// Whether an execution may take its first step on the caller's stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YieldPolicy {
    /// Advance synchronously until the first suspension point.
    #[default]
    Immediate,
    /// Hand the first step to the host scheduler before taking it.
    YieldFirst,
}

/// Entry point for performing effects.
///
/// Carries the host scheduler and is passed explicitly to every template
/// that asks for it, so nested performances run on the same host. Cheap to
/// clone.
#[derive(Clone)]
pub struct Runtime {
    scheduler: Arc<dyn Scheduler>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn Scheduler>) -> Self {
        Self { scheduler }
    }

    /// A runtime that yields onto the given tokio runtime.
    #[must_use]
    pub fn tokio(handle: Handle) -> Self {
        Self::new(Arc::new(TokioScheduler::new(handle)))
    }

    /// A runtime on the tokio runtime entered by the calling thread.
    pub fn current() -> Result<Self, HostError> {
        let handle = Handle::try_current().map_err(|_| HostError::NoRuntime)?;
        Ok(Self::tokio(handle))
    }

    #[must_use]
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    /// Start one execution of `effect` and return its completion signal.
    ///
    /// Pure and failed effects resolve before this returns. Deferred effects
    /// run on the calling stack until they first suspend.
    pub fn perform<T: Value>(&self, effect: &Effect<T>) -> CompletionSignal<T> {
        self.perform_with(effect, YieldPolicy::Immediate)
    }

    /// Start one execution of `effect` under an explicit yield policy.
    ///
    /// The policy only matters for deferred effects; resolved ones never
    /// touch the scheduler.
    pub fn perform_with<T: Value>(
        &self,
        effect: &Effect<T>,
        policy: YieldPolicy,
    ) -> CompletionSignal<T> {
        execution::launch(self, effect, policy)
    }

    /// Perform `effect` and block the calling thread until it resolves.
    ///
    /// Must not be called from a thread the execution itself needs.
    pub fn block_on<T: Value>(&self, effect: &Effect<T>) -> Outcome<T> {
        self.perform(effect).wait()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}
