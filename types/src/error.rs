use std::error::Error as StdError;
use std::io;
use std::sync::Arc;

use thiserror::Error;

type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// Result of one execution: a value or an [`EffectError`].
pub type Outcome<T> = Result<T, EffectError>;

/// Failure payload of an effect.
///
/// Cheap to clone so a single failure can be handed to every reader of a
/// completion signal. The cause chain, if any, is reachable through
/// [`std::error::Error::source`].
#[derive(Debug, Clone, Error)]
#[error(transparent)]
pub struct EffectError(Repr);

#[derive(Debug, Clone, Error)]
enum Repr {
    #[error("{message}")]
    Message {
        message: String,
        #[source]
        cause: Option<Cause>,
    },
    #[error(transparent)]
    Foreign(Cause),
    #[error("effect panicked: {0}")]
    Panic(String),
}

impl EffectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(Repr::Message {
            message: message.into(),
            cause: None,
        })
    }

    /// Wrap a host error, keeping its display and source chain unchanged.
    pub fn from_error<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Repr::Foreign(Arc::new(err)))
    }

    /// Attach `message` on top of `cause`.
    pub fn context<E>(message: impl Into<String>, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self(Repr::Message {
            message: message.into(),
            cause: Some(Arc::new(cause)),
        })
    }

    /// A panic caught while advancing an effect.
    pub fn panicked(message: impl Into<String>) -> Self {
        Self(Repr::Panic(message.into()))
    }

    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self.0, Repr::Panic(_))
    }

    /// The panic message, if this failure came from a panic.
    #[must_use]
    pub fn panic_message(&self) -> Option<&str> {
        match &self.0 {
            Repr::Panic(message) => Some(message),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for EffectError {
    fn from(err: anyhow::Error) -> Self {
        let message = err.to_string();
        let boxed: Box<dyn StdError + Send + Sync + 'static> = err.into();
        let cause: Cause = Arc::from(boxed);
        match cause.source() {
            // anyhow's boxed form displays the outermost context only; keep
            // that as the message and expose the rest of the chain.
            Some(_) => Self(Repr::Foreign(cause)),
            None => Self(Repr::Message {
                message,
                cause: None,
            }),
        }
    }
}

impl From<io::Error> for EffectError {
    fn from(err: io::Error) -> Self {
        Self::from_error(err)
    }
}

impl From<&str> for EffectError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for EffectError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Misuse of a completion signal.
///
/// These indicate a bug in whoever resolves the signal, never a data-level
/// failure of the computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("completion signal was already resolved")]
    AlreadyResolved,
}
