//! Restartable effects for effio.
//!
//! An [`Effect`] describes an asynchronous computation without running it.
//! Performing it on a [`Runtime`] starts one independent execution and hands
//! back a [`CompletionSignal`]; performing the same value again starts another
//! execution that shares no progress with the first.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `effect` | The immutable `Pure` / `Failed` / `Deferred` description |
//! | `execution` | Per-run state machine driven by wake-ups |
//! | `combinators` | `map`, `bind`, `all2`, `all3`, `all`, `sequence` |
//! | `runtime` | The handle effects are performed on, and the yield policy |
//! | `scheduler` | The host seam: tokio-backed and explicitly drained queues |
//! | `host` | Building a tokio host from configuration |
//!
//! # Usage
//!
//! ```ignore
//! use effio_core::{Effect, Runtime, all3};
//!
//! let op = Effect::deferred(|| async {
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//!     Ok(next_ticket())
//! });
//! let rt = Runtime::current()?;
//! let (a, b, c) = rt.perform(&all3(op.clone(), op.clone(), op)).await?;
//! ```

mod combinators;
mod effect;
mod execution;
pub mod host;
mod runtime;
pub mod scheduler;

pub use combinators::{all, all2, all3, bind, map, sequence};
pub use effect::Effect;
pub use host::{HostError, HostRuntime};
pub use runtime::{Runtime, YieldPolicy};
pub use scheduler::{QueueScheduler, Scheduler, Task, TokioScheduler};

pub use effio_signal::CompletionSignal;
pub use effio_types::{EffectError, ExecutionId, Outcome, SignalError, Value};
