use std::error::Error;
use std::fmt;

use crate::handler::HandlerId;

/// Error raised when a handler cannot be invoked with the published arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    /// The handler declares a different number of parameters.
    Arity { expected: usize, actual: usize },
    /// The argument at `index` could not be decoded into the parameter type.
    Argument { index: usize, message: String },
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationError::Arity { expected, actual } => write!(
                f,
                "handler expects {} argument(s), got {}",
                expected, actual
            ),
            InvocationError::Argument { index, message } => {
                write!(f, "argument {} has the wrong type: {}", index, message)
            }
        }
    }
}

impl Error for InvocationError {}

/// Error type for registry and dispatch operations on a [`Bus`](crate::bus::Bus).
#[derive(Debug)]
pub enum BusError {
    /// The handler record cannot be dispatched (empty topic, transactional without async).
    InvalidHandler { topic: String, reason: &'static str },
    /// No registration with this identity exists for the topic.
    HandlerNotFound { topic: String, id: HandlerId },
    /// A synchronous handler rejected the published arguments.
    Invocation {
        topic: String,
        source: InvocationError,
    },
    /// The published arguments could not be converted into opaque values.
    Encode(serde_json::Error),
    /// A worker thread for an asynchronous handler could not be started.
    Spawn(std::io::Error),
    /// The registry mutex was poisoned by a panicking thread.
    LockPoisoned(&'static str),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::InvalidHandler { topic, reason } => {
                write!(f, "invalid handler for topic '{}': {}", topic, reason)
            }
            BusError::HandlerNotFound { topic, id } => {
                write!(f, "handler {} not found for topic '{}'", id, topic)
            }
            BusError::Invocation { topic, source } => {
                write!(f, "invocation failed on topic '{}': {}", topic, source)
            }
            BusError::Encode(e) => write!(f, "failed to encode arguments: {}", e),
            BusError::Spawn(e) => write!(f, "failed to spawn async handler: {}", e),
            BusError::LockPoisoned(operation) => {
                write!(f, "bus lock poisoned during {}", operation)
            }
        }
    }
}

impl Error for BusError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BusError::Invocation { source, .. } => Some(source),
            BusError::Encode(e) => Some(e),
            BusError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BusError {
    fn from(err: serde_json::Error) -> Self {
        BusError::Encode(err)
    }
}
