//! Execution engine: one independent run of an effect.
//!
//! # Lifecycle
//!
//! `launch` creates the completion signal first and hands it to a fresh
//! [`Execution`]. The execution's future is built from the effect's template
//! when the first step is taken: on the caller's stack for
//! [`YieldPolicy::Immediate`], inside the scheduled task for
//! [`YieldPolicy::YieldFirst`], so no template code runs ahead of the yield.
//!
//! The execution is its own waker: whenever something it awaits resolves,
//! the wake-up re-polls the future on the waking thread, inside the host
//! context provided by [`Scheduler::resume`](crate::scheduler::Scheduler::resume),
//! until the next suspension or completion. Then the signal is resolved and
//! every reference to the execution is released.
//!
//! # Scheduling states
//!
//! | State      | Meaning                                             |
//! |------------|-----------------------------------------------------|
//! | `IDLE`     | suspended, waiting for a wake-up                    |
//! | `RUNNING`  | a thread owns the future and is polling it          |
//! | `NOTIFIED` | woken while running; the owner polls again          |
//! | `COMPLETE` | resolved; further wake-ups are ignored              |
//!
//! Only the thread that moved the state to `RUNNING` touches the future, so a
//! step never overlaps another step of the same execution.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Wake, Waker};

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};

use effio_signal::CompletionSignal;
use effio_types::{EffectError, ExecutionId, Outcome, Value};

use crate::effect::{Effect, Kind, Template};
use crate::runtime::{Runtime, YieldPolicy};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const NOTIFIED: u8 = 2;
const COMPLETE: u8 = 3;

/// Start one execution of `effect`.
pub(crate) fn launch<T: Value>(
    runtime: &Runtime,
    effect: &Effect<T>,
    policy: YieldPolicy,
) -> CompletionSignal<T> {
    match effect.kind() {
        Kind::Pure(value) => CompletionSignal::resolved(Ok(value.clone())),
        Kind::Failed(error) => CompletionSignal::resolved(Err(error.clone())),
        Kind::Deferred(template) => {
            let signal = CompletionSignal::new();
            let execution = Arc::new(Execution {
                id: ExecutionId::next(),
                state: AtomicU8::new(RUNNING),
                future: Mutex::new(None),
                signal: signal.clone(),
                runtime: runtime.clone(),
            });
            tracing::trace!(execution = %execution.id, ?policy, "Starting execution");

            match policy {
                YieldPolicy::Immediate => execution.start(template),
                YieldPolicy::YieldFirst => {
                    let template = Arc::clone(template);
                    runtime
                        .scheduler()
                        .schedule_later(Box::new(move || execution.start(&template)));
                }
            }
            signal
        }
    }
}

/// Build a fresh future from `template`, turning panics into failures.
fn instantiate<T: Value>(
    template: &Template<T>,
    runtime: &Runtime,
    id: ExecutionId,
) -> BoxFuture<'static, Outcome<T>> {
    let future = match panic::catch_unwind(AssertUnwindSafe(|| template(runtime))) {
        Ok(future) => future,
        Err(payload) => {
            return future::ready(Err(panic_failure(id, payload.as_ref()))).boxed();
        }
    };

    AssertUnwindSafe(future)
        .catch_unwind()
        .map(move |result| {
            result.unwrap_or_else(|payload| Err(panic_failure(id, payload.as_ref())))
        })
        .boxed()
}

fn panic_failure(id: ExecutionId, payload: &(dyn Any + Send)) -> EffectError {
    let message = panic_payload_to_string(payload);
    tracing::warn!(execution = %id, panic = %message, "Effect panicked");
    EffectError::panicked(message)
}

fn panic_payload_to_string(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

struct Execution<T> {
    id: ExecutionId,
    state: AtomicU8,
    /// Empty until the first step, and again once complete.
    future: Mutex<Option<BoxFuture<'static, Outcome<T>>>>,
    signal: CompletionSignal<T>,
    runtime: Runtime,
}

impl<T: Value> Execution<T> {
    /// Build the future from `template` and take the first step.
    fn start(self: Arc<Self>, template: &Template<T>) {
        let future = instantiate(template, &self.runtime, self.id);
        *self.future.lock().unwrap_or_else(PoisonError::into_inner) = Some(future);
        self.run();
    }

    /// Drive the future until it suspends or completes.
    ///
    /// Caller must own the `RUNNING` state.
    fn run(self: Arc<Self>) {
        let waker = Waker::from(Arc::clone(&self));
        let mut cx = Context::from_waker(&waker);

        loop {
            let poll = {
                let mut slot = self.future.lock().unwrap_or_else(PoisonError::into_inner);
                let Some(future) = slot.as_mut() else {
                    return;
                };
                let poll = future.as_mut().poll(&mut cx);
                if poll.is_ready() {
                    // Drop per-run state before anyone observes the outcome.
                    *slot = None;
                }
                poll
            };

            match poll {
                Poll::Ready(outcome) => {
                    self.state.store(COMPLETE, Ordering::Release);
                    self.complete(outcome);
                    return;
                }
                Poll::Pending => {
                    match self.state.compare_exchange(
                        RUNNING,
                        IDLE,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(_) => return,
                        Err(_) => {
                            // Woken mid-step: take the notification and poll again.
                            self.state.store(RUNNING, Ordering::Release);
                        }
                    }
                }
            }
        }
    }

    fn complete(&self, outcome: Outcome<T>) {
        let ok = outcome.is_ok();
        if let Err(violation) = self.signal.resolve(outcome) {
            // The engine resolves each signal from exactly one place; reaching
            // this is an engine bug, not a computation failure.
            tracing::error!(execution = %self.id, %violation, "Execution resolved twice");
            panic!(
                "execution {} violated the completion contract: {violation}",
                self.id
            );
        }
        tracing::debug!(execution = %self.id, ok, "Execution finished");
    }

    fn wake_up(self: Arc<Self>) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let next = match current {
                IDLE => RUNNING,
                RUNNING => NOTIFIED,
                _ => return,
            };
            match self
                .state
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    if next == RUNNING {
                        let scheduler = Arc::clone(self.runtime.scheduler());
                        scheduler.resume(Box::new(move || self.run()));
                    }
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl<T: Value> Wake for Execution<T> {
    fn wake(self: Arc<Self>) {
        self.wake_up();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        Arc::clone(self).wake_up();
    }
}
