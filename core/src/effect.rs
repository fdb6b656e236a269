//! Immutable effect values.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};

use effio_signal::CompletionSignal;
use effio_types::{EffectError, Outcome, Value};

use crate::runtime::Runtime;

/// Restart function of a deferred effect.
///
/// Every call builds a fresh future that exclusively owns all state of one
/// execution. Calling it must not run any of the computation's steps.
pub(crate) type Template<T> = Arc<dyn Fn(&Runtime) -> BoxFuture<'static, Outcome<T>> + Send + Sync>;

/// Description of a computation producing `T` or failing with [`EffectError`].
///
/// Building an effect never runs anything. Performing it on a [`Runtime`]
/// starts one independent execution; performing the same value again starts
/// another one that shares no progress with the first. Clones share the same
/// immutable description.
pub struct Effect<T> {
    kind: Arc<Kind<T>>,
}

pub(crate) enum Kind<T> {
    Pure(T),
    Failed(EffectError),
    Deferred(Template<T>),
}

impl<T: Value> Effect<T> {
    /// An effect that resolves to `value` without suspending.
    pub fn pure(value: T) -> Self {
        Self::from_kind(Kind::Pure(value))
    }

    /// An effect that resolves to `error` without running any code.
    pub fn failed(error: impl Into<EffectError>) -> Self {
        Self::from_kind(Kind::Failed(error.into()))
    }

    /// [`Effect::pure`] or [`Effect::failed`] depending on `result`.
    pub fn from_result<E>(result: Result<T, E>) -> Self
    where
        E: Into<EffectError>,
    {
        match result {
            Ok(value) => Self::pure(value),
            Err(error) => Self::failed(error),
        }
    }

    /// Wrap a possibly-suspending computation.
    ///
    /// `template` is called once per performance to build that execution's
    /// future; it is never called here.
    ///
    /// ```ignore
    /// let fetch = Effect::deferred(|| async {
    ///     tokio::time::sleep(Duration::from_millis(10)).await;
    ///     Ok(load_token())
    /// });
    /// ```
    pub fn deferred<F, Fut>(template: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        Self::from_kind(Kind::Deferred(Arc::new(move |_: &Runtime| {
            template().boxed()
        })))
    }

    /// Like [`Effect::deferred`], but the template receives the runtime the
    /// execution runs on so it can perform inner effects.
    ///
    /// ```ignore
    /// let both = Effect::deferred_with(move |rt| {
    ///     let token = token.clone();
    ///     async move {
    ///         let first = rt.perform(&token).await?;
    ///         let second = rt.perform(&token).await?;
    ///         Ok(format!("{first} -- {second}"))
    ///     }
    /// });
    /// ```
    pub fn deferred_with<F, Fut>(template: F) -> Self
    where
        F: Fn(Runtime) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        Self::from_kind(Kind::Deferred(Arc::new(move |rt: &Runtime| {
            template(rt.clone()).boxed()
        })))
    }

    /// Build the effect to run anew on every performance.
    ///
    /// `build` is called at perform time, once per execution, and the effect
    /// it returns is performed in place.
    pub fn suspend<F>(build: F) -> Self
    where
        F: Fn() -> Effect<T> + Send + Sync + 'static,
    {
        Self::deferred_with(move |rt| {
            let effect = build();
            async move { rt.perform(&effect).await }
        })
    }

    /// Whether performing this effect resolves without running any steps.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(*self.kind, Kind::Deferred(_))
    }

    /// Start one execution on `runtime`. Shorthand for [`Runtime::perform`].
    pub fn perform(&self, runtime: &Runtime) -> CompletionSignal<T> {
        runtime.perform(self)
    }

    fn from_kind(kind: Kind<T>) -> Self {
        Self {
            kind: Arc::new(kind),
        }
    }

    pub(crate) fn kind(&self) -> &Kind<T> {
        &self.kind
    }
}

/// Awaiting an effect performs it on the tokio runtime of the current task.
///
/// ```ignore
/// let token = fetch_token.clone().await?;
/// ```
///
/// Resolved effects need no runtime. A deferred effect awaited outside any
/// tokio context resolves to a failure wrapping
/// [`HostError::NoRuntime`](crate::HostError::NoRuntime).
impl<T: Value> IntoFuture for Effect<T> {
    type Output = Outcome<T>;
    type IntoFuture = BoxFuture<'static, Outcome<T>>;

    fn into_future(self) -> Self::IntoFuture {
        match &*self.kind {
            Kind::Pure(value) => future::ready(Ok(value.clone())).boxed(),
            Kind::Failed(error) => future::ready(Err(error.clone())).boxed(),
            Kind::Deferred(_) => match Runtime::current() {
                Ok(rt) => rt.perform(&self).boxed(),
                Err(err) => future::ready(Err(EffectError::from_error(err))).boxed(),
            },
        }
    }
}

impl<T> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            kind: Arc::clone(&self.kind),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.kind {
            Kind::Pure(value) => f.debug_tuple("Pure").field(value).finish(),
            Kind::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
            Kind::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}
