//! net: peer-to-peer relay on top of the [`Bus`](crate::bus::Bus).
//!
//! A subscriber node asks a publisher node's [`RegistrationService`] to
//! forward a topic. The publisher installs a forwarding handler into its own
//! bus; every local publish on that topic then calls the subscriber's
//! [`PushEndpoint`], which re-publishes the event on the subscriber's bus.
//!
//! ```text
//!   node A (subscriber)                         node B (publisher)
//!   ───────────────────                         ──────────────────
//!   subscribe_remote("x", f) ── Register ─────▶ RegistrationService
//!                                                 └─ bus.subscribe("x", forwarder)
//!
//!   PushEndpoint ◀───────────── PushEvent ───── forwarder ◀─ bus.publish("x", 10)
//!     └─ bus.publish("x", 10) ─▶ f(10)
//! ```
//!
//! A [`Node`] serves both services at once, so any node can play either role.
//!
//! Requires the `net` feature.

mod client;
mod error;
mod http;
mod node;
mod push;
mod registration;
mod wire;

pub use client::RpcClient;
pub use error::NodeError;
pub use http::{router, RelayState};
pub use node::Node;
pub use push::PushEndpoint;
pub use registration::RegistrationService;
pub use wire::{
    normalize_path, route, validate_path, ClientArg, PeerEndpoint, SubscribeArg, SubscriptionKind,
    PUSH_METHOD, REGISTER_METHOD,
};
