//! Core value types for effio.
//!
//! This crate contains the outcome and error vocabulary shared by every other
//! effio crate. No IO, no async, minimal dependencies.

mod error;
mod ids;

pub use error::{EffectError, Outcome, SignalError};
pub use ids::ExecutionId;

/// Bound on anything an effect can produce.
///
/// A pure effect hands out one clone per performance, and a completion signal
/// hands the same outcome to every reader, so results must be clonable and
/// shareable across threads.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + Send + Sync + 'static {}
