//! Single-assignment completion signals.
//!
//! A [`CompletionSignal`] is resolved exactly once with an [`Outcome`] and can
//! be observed any number of times, from any thread:
//!
//! - **[`CompletionSignal::on_resolve`]**: register a one-shot continuation
//! - **[`CompletionSignal::wait`]**: block the current thread until resolved
//! - **`.await`**: the signal is a [`Future`] yielding a clone of the outcome
//!
//! Each handle that is polled keeps at most one waker registered, replaced on
//! every poll and removed when the handle is dropped.
//!
//! Resolving a second time is a contract violation and is reported as
//! [`SignalError::AlreadyResolved`]; the first outcome is kept.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use effio_types::{EffectError, Outcome, SignalError, Value};

/// One-shot callback run with the resolved outcome.
pub type Continuation<T> = Box<dyn FnOnce(Outcome<T>) + Send + 'static>;

/// Write-once, many-reader outcome cell.
///
/// Cloning a signal yields another handle to the same cell.
pub struct CompletionSignal<T> {
    inner: Arc<Inner<T>>,
    /// Slot of this handle's waker, once it has been polled while pending.
    waker_key: Option<u64>,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    resolved: Condvar,
}

enum State<T> {
    Pending {
        continuations: Vec<Continuation<T>>,
        wakers: HashMap<u64, Waker>,
        next_key: u64,
    },
    Resolved(Outcome<T>),
}

impl<T> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Value> CompletionSignal<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Pending {
                    continuations: Vec::new(),
                    wakers: HashMap::new(),
                    next_key: 0,
                }),
                resolved: Condvar::new(),
            }),
            waker_key: None,
        }
    }

    /// A signal that is already resolved to `outcome`.
    #[must_use]
    pub fn resolved(outcome: Outcome<T>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Resolved(outcome)),
                resolved: Condvar::new(),
            }),
            waker_key: None,
        }
    }

    /// Resolve the signal and run every registered continuation.
    ///
    /// Continuations and wakers run on the calling thread after the internal
    /// lock is released, so they may freely observe or await this signal.
    pub fn resolve(&self, outcome: Outcome<T>) -> Result<(), SignalError> {
        let (continuations, wakers) = {
            let mut state = self.inner.lock();
            if matches!(*state, State::Resolved(_)) {
                tracing::error!(
                    ok = outcome.is_ok(),
                    "Completion signal resolved more than once"
                );
                return Err(SignalError::AlreadyResolved);
            }
            match mem::replace(&mut *state, State::Resolved(outcome.clone())) {
                State::Pending {
                    continuations,
                    wakers,
                    ..
                } => (continuations, wakers),
                State::Resolved(_) => (Vec::new(), HashMap::new()),
            }
        };
        self.inner.resolved.notify_all();

        for waker in wakers.into_values() {
            waker.wake();
        }
        for continuation in continuations {
            continuation(outcome.clone());
        }
        Ok(())
    }

    /// Resolve with a value.
    pub fn succeed(&self, value: T) -> Result<(), SignalError> {
        self.resolve(Ok(value))
    }

    /// Resolve with a failure.
    pub fn fail(&self, error: EffectError) -> Result<(), SignalError> {
        self.resolve(Err(error))
    }

    /// Register `continuation` to run exactly once with the outcome.
    ///
    /// If the signal is already resolved the continuation runs immediately on
    /// the calling thread; otherwise it runs on whichever thread resolves it.
    pub fn on_resolve<F>(&self, continuation: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        let outcome = {
            let mut state = self.inner.lock();
            match &mut *state {
                State::Pending { continuations, .. } => {
                    continuations.push(Box::new(continuation));
                    return;
                }
                State::Resolved(outcome) => outcome.clone(),
            }
        };
        continuation(outcome);
    }

    #[cfg(test)]
    fn registered_wakers(&self) -> usize {
        match &*self.inner.lock() {
            State::Pending { wakers, .. } => wakers.len(),
            State::Resolved(_) => 0,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(*self.inner.lock(), State::Resolved(_))
    }

    /// The outcome, if already resolved. Never blocks.
    #[must_use]
    pub fn try_outcome(&self) -> Option<Outcome<T>> {
        match &*self.inner.lock() {
            State::Resolved(outcome) => Some(outcome.clone()),
            State::Pending { .. } => None,
        }
    }

    /// Block the current thread until the signal is resolved.
    ///
    /// Intended for callers outside any async context. Blocking a thread that
    /// the resolver itself needs to make progress deadlocks.
    pub fn wait(&self) -> Outcome<T> {
        let mut state = self.inner.lock();
        loop {
            if let State::Resolved(outcome) = &*state {
                return outcome.clone();
            }
            state = self
                .inner
                .resolved
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block for at most `timeout`. Returns `None` if still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Outcome<T>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.lock();
        loop {
            if let State::Resolved(outcome) = &*state {
                return Some(outcome.clone());
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (guard, _) = self
                .inner
                .resolved
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }
}

impl<T: Value> Default for CompletionSignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CompletionSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            waker_key: None,
        }
    }
}

impl<T> Drop for CompletionSignal<T> {
    fn drop(&mut self) {
        let Some(key) = self.waker_key else {
            return;
        };
        let stale = match &mut *self.inner.lock() {
            State::Pending { wakers, .. } => wakers.remove(&key),
            State::Resolved(_) => None,
        };
        // Released outside the lock: the waker may own the last reference to
        // something that holds another handle to this signal.
        drop(stale);
    }
}

impl<T> fmt::Debug for CompletionSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolved = matches!(*self.inner.lock(), State::Resolved(_));
        f.debug_struct("CompletionSignal")
            .field("resolved", &resolved)
            .finish()
    }
}

impl<T: Value> Future for CompletionSignal<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut state = this.inner.lock();
        let stale = match &mut *state {
            State::Resolved(outcome) => return Poll::Ready(outcome.clone()),
            State::Pending {
                wakers, next_key, ..
            } => {
                let key = *this.waker_key.get_or_insert_with(|| {
                    *next_key += 1;
                    *next_key
                });
                match wakers.get_mut(&key) {
                    Some(waker) if waker.will_wake(cx.waker()) => None,
                    Some(waker) => Some(mem::replace(waker, cx.waker().clone())),
                    None => {
                        wakers.insert(key, cx.waker().clone());
                        None
                    }
                }
            }
        };
        drop(state);
        drop(stale);
        Poll::Pending
    }
}
