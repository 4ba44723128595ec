//! Handlers: the callables a [`Bus`](crate::bus::Bus) dispatches to.
//!
//! Published arguments travel as an ordered list of opaque JSON values
//! ([`Args`]). A typed handler is any `Fn(A1, .., An)` whose parameters
//! implement `DeserializeOwned`; each positional argument is decoded into the
//! matching parameter when the handler runs, and a mismatch surfaces as an
//! [`InvocationError`](crate::InvocationError) instead of a panic.
//!
//! ```
//! use netbus::Bus;
//!
//! let bus = Bus::new();
//! bus.subscribe("greet", |name: String, times: u32| {
//!     for _ in 0..times {
//!         println!("hello {name}");
//!     }
//! })
//! .unwrap();
//! bus.publish("greet", ("world", 2)).unwrap();
//! ```

mod args;
mod callable;

pub use args::{Args, IntoArgs};
pub use callable::{Callable, Handler, HandlerId, SubscribeOptions};
