//! netbus: in-process publish/subscribe with a peer-to-peer relay.
//!
//! The [`Bus`] dispatches published arguments to typed handlers, synchronously
//! or on worker threads. With the `net` feature, a [`net::Node`] lets one
//! process subscribe to topics published in another: publications are
//! forwarded over HTTP and re-published on the subscriber's bus, so ordinary
//! handlers fire unchanged.

pub mod bus;
mod config;
mod error;
pub mod handler;
pub mod lock;

#[cfg(feature = "net")]
pub mod net;

pub use bus::{Bus, WaitHandle};
pub use config::NodeConfig;
pub use error::{BusError, InvocationError};
pub use handler::{Args, Callable, Handler, HandlerId, IntoArgs, SubscribeOptions};

#[cfg(feature = "net")]
pub use net::{Node, NodeError};
