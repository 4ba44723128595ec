//! Error types for the network relay.

use std::error::Error;
use std::fmt;

use crate::error::BusError;

/// Error type for node lifecycle and remote calls.
#[derive(Debug)]
pub enum NodeError {
    /// `start` was called on a node that is already listening.
    AlreadyStarted,
    /// The operation needs a listening node.
    NotStarted,
    /// The service path cannot be mounted as a route.
    InvalidPath { path: String, reason: &'static str },
    /// Binding the listen address (or building the runtime) failed.
    Io(std::io::Error),
    /// The remote could not be dialed, or the call did not complete.
    RemoteUnreachable { endpoint: String, reason: String },
    /// The remote registration service answered `false`.
    RegistrationRejected { endpoint: String, topic: String },
    /// The local bus rejected the subscription.
    Bus(BusError),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::AlreadyStarted => write!(f, "node already started"),
            NodeError::NotStarted => write!(f, "node not started"),
            NodeError::InvalidPath { path, reason } => {
                write!(f, "invalid service path '{}': {}", path, reason)
            }
            NodeError::Io(e) => write!(f, "I/O error: {}", e),
            NodeError::RemoteUnreachable { endpoint, reason } => {
                write!(f, "remote {} unreachable: {}", endpoint, reason)
            }
            NodeError::RegistrationRejected { endpoint, topic } => {
                write!(f, "remote {} rejected subscription to '{}'", endpoint, topic)
            }
            NodeError::Bus(e) => write!(f, "bus error: {}", e),
        }
    }
}

impl Error for NodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NodeError::Io(e) => Some(e),
            NodeError::Bus(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NodeError {
    fn from(err: std::io::Error) -> Self {
        NodeError::Io(err)
    }
}

impl From<BusError> for NodeError {
    fn from(err: BusError) -> Self {
        NodeError::Bus(err)
    }
}
