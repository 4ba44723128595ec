//! Bus - in-process topic dispatch.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                            Bus                              │
//! │  subscribe* / unsubscribe / has_subscribers                 │
//! │  publish / publish_and_track / wait                         │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                      │
//!          ▼                    ▼                      ▼
//! ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────┐
//! │  TopicRegistry  │  │    WaitGroup    │  │     TopicLocks      │
//! │ (under bus lock)│  │ (pending async) │  │ (transactional FIFO)│
//! └─────────────────┘  └─────────────────┘  └─────────────────────┘
//! ```
//!
//! Handlers come in three flavours:
//!
//! - **sync**: run on the publisher's thread, in registration order;
//! - **async**: run on their own worker thread, unordered;
//! - **async transactional**: run on their own worker thread, one at a time
//!   per topic, in publish order.
//!
//! Any of them may be registered `once`, in which case it is removed from the
//! registry the moment a publish selects it.
//!
//! ## Usage
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use netbus::Bus;
//!
//! let bus = Bus::new();
//! let total = Arc::new(Mutex::new(0));
//!
//! let sink = total.clone();
//! bus.subscribe_async("deposit", move |amount: i64| {
//!     *sink.lock().unwrap() += amount;
//! }, false).unwrap();
//!
//! bus.publish("deposit", (5,)).unwrap();
//! let handle = bus.publish_and_track("deposit", (7,)).unwrap();
//! bus.wait(&handle);
//!
//! assert_eq!(*total.lock().unwrap(), 12);
//! ```

mod bus;
mod registry;
mod wait_group;

pub use bus::Bus;
pub use registry::{HandlerRecord, TopicRegistry};
pub use wait_group::{PendingGuard, WaitGroup, WaitHandle};
