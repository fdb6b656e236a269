//! Composition: mapping, chaining, parallel and ordered joins.
//!
//! Every combinator returns a new deferred effect. Nothing is performed at
//! construction time; the inner effects are performed afresh each time the
//! combined effect is.

use std::sync::Arc;

use effio_types::Value;

use crate::effect::Effect;
use crate::runtime::YieldPolicy;

/// Resolve to `f(value)`; failures pass through without calling `f`.
pub fn map<T, U, F>(effect: Effect<T>, f: F) -> Effect<U>
where
    T: Value,
    U: Value,
    F: Fn(T) -> U + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Effect::deferred_with(move |rt| {
        let effect = effect.clone();
        let f = Arc::clone(&f);
        async move {
            let value = rt.perform(&effect).await?;
            Ok(f(value))
        }
    })
}

/// Perform `effect`, then perform `f(value)` and adopt its outcome.
///
/// A failure of `effect` short-circuits; `f` is not called.
pub fn bind<T, U, F>(effect: Effect<T>, f: F) -> Effect<U>
where
    T: Value,
    U: Value,
    F: Fn(T) -> Effect<U> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Effect::deferred_with(move |rt| {
        let effect = effect.clone();
        let f = Arc::clone(&f);
        async move {
            let value = rt.perform(&effect).await?;
            let next = f(value);
            rt.perform(&next).await
        }
    })
}

/// Run two effects concurrently and pair their results.
///
/// See [`all`] for start order and failure semantics.
pub fn all2<A, B>(a: Effect<A>, b: Effect<B>) -> Effect<(A, B)>
where
    A: Value,
    B: Value,
{
    Effect::deferred_with(move |rt| {
        let (a, b) = (a.clone(), b.clone());
        async move {
            let a = rt.perform_with(&a, YieldPolicy::YieldFirst);
            let b = rt.perform_with(&b, YieldPolicy::Immediate);
            Ok((a.await?, b.await?))
        }
    })
}

/// Run three effects concurrently and collect their results in order.
///
/// See [`all`] for start order and failure semantics.
pub fn all3<A, B, C>(a: Effect<A>, b: Effect<B>, c: Effect<C>) -> Effect<(A, B, C)>
where
    A: Value,
    B: Value,
    C: Value,
{
    Effect::deferred_with(move |rt| {
        let (a, b, c) = (a.clone(), b.clone(), c.clone());
        async move {
            let a = rt.perform_with(&a, YieldPolicy::YieldFirst);
            let b = rt.perform_with(&b, YieldPolicy::YieldFirst);
            let c = rt.perform_with(&c, YieldPolicy::Immediate);
            Ok((a.await?, b.await?, c.await?))
        }
    })
}

/// Run every effect concurrently and collect the results in input order.
///
/// All branches are started before any is awaited. Every branch but the last
/// yields its first step to the host scheduler, so a branch that does
/// non-suspending work up front cannot hold up the start of the next one.
///
/// The signals are then awaited in input order. The first failure met that
/// way wins, even if a later branch failed earlier in wall-clock time.
/// Branches still in flight are not cancelled; they run to completion and
/// their outcomes are dropped.
pub fn all<T: Value>(effects: Vec<Effect<T>>) -> Effect<Vec<T>> {
    let effects: Arc<[Effect<T>]> = effects.into();
    Effect::deferred_with(move |rt| {
        let effects = Arc::clone(&effects);
        async move {
            let last = effects.len().saturating_sub(1);
            let signals: Vec<_> = effects
                .iter()
                .enumerate()
                .map(|(index, effect)| {
                    let policy = if index == last {
                        YieldPolicy::Immediate
                    } else {
                        YieldPolicy::YieldFirst
                    };
                    rt.perform_with(effect, policy)
                })
                .collect();

            let mut values = Vec::with_capacity(signals.len());
            for signal in signals {
                values.push(signal.await?);
            }
            Ok(values)
        }
    })
}

/// Perform the effects one at a time, in order.
///
/// Effect `i + 1` starts only after effect `i` has resolved. The first
/// failure ends the sequence; later effects are never started.
pub fn sequence<T: Value>(effects: Vec<Effect<T>>) -> Effect<Vec<T>> {
    let effects: Arc<[Effect<T>]> = effects.into();
    Effect::deferred_with(move |rt| {
        let effects = Arc::clone(&effects);
        async move {
            let mut values = Vec::with_capacity(effects.len());
            for effect in effects.iter() {
                values.push(rt.perform(effect).await?);
            }
            Ok(values)
        }
    })
}

impl<T: Value> Effect<T> {
    /// Method form of [`map`].
    pub fn map<U, F>(&self, f: F) -> Effect<U>
    where
        U: Value,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        map(self.clone(), f)
    }

    /// Method form of [`bind`].
    pub fn bind<U, F>(&self, f: F) -> Effect<U>
    where
        U: Value,
        F: Fn(T) -> Effect<U> + Send + Sync + 'static,
    {
        bind(self.clone(), f)
    }
}
