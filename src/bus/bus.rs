//! Bus - topic registry plus dispatch engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use tracing::{debug, warn};

use super::registry::{HandlerRecord, TopicRegistry};
use super::wait_group::{WaitGroup, WaitHandle};
use crate::error::BusError;
use crate::handler::{Args, Callable, Handler, HandlerId, IntoArgs, SubscribeOptions};
use crate::lock::TopicLocks;

const WORKER_NAME: &str = "netbus-worker";

/// In-process publish/subscribe dispatcher.
///
/// Owns one topic registry behind one mutex, one bus-wide counter of pending
/// asynchronous invocations, and one ticket lock per topic for transactional
/// handlers. Share it between threads with `Arc<Bus>`.
///
/// ## Example
///
/// ```
/// use netbus::Bus;
///
/// let bus = Bus::new();
/// let id = bus.subscribe("topic", |a: i64| assert_eq!(a, 10)).unwrap();
/// assert!(bus.has_subscribers("topic"));
///
/// bus.publish("topic", (10,)).unwrap();
///
/// bus.unsubscribe("topic", id).unwrap();
/// assert!(!bus.has_subscribers("topic"));
/// ```
#[derive(Default)]
pub struct Bus {
    registry: Mutex<TopicRegistry>,
    pending: WaitGroup,
    transactions: TopicLocks,
    next_id: AtomicU64,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Register a persistent synchronous handler.
    pub fn subscribe<H, A>(&self, topic: &str, handler: H) -> Result<HandlerId, BusError>
    where
        H: Handler<A>,
    {
        self.subscribe_with(topic, handler, SubscribeOptions::persistent())
    }

    /// Register a synchronous handler that runs on the next publish only.
    pub fn subscribe_once<H, A>(&self, topic: &str, handler: H) -> Result<HandlerId, BusError>
    where
        H: Handler<A>,
    {
        self.subscribe_with(topic, handler, SubscribeOptions::once())
    }

    /// Register a persistent handler that runs on its own worker thread.
    ///
    /// With `transactional`, invocations for this topic run one at a time in
    /// publish order.
    pub fn subscribe_async<H, A>(
        &self,
        topic: &str,
        handler: H,
        transactional: bool,
    ) -> Result<HandlerId, BusError>
    where
        H: Handler<A>,
    {
        self.subscribe_with(topic, handler, SubscribeOptions::asynchronous(transactional))
    }

    /// Register an asynchronous handler that runs on the next publish only.
    pub fn subscribe_once_async<H, A>(
        &self,
        topic: &str,
        handler: H,
    ) -> Result<HandlerId, BusError>
    where
        H: Handler<A>,
    {
        self.subscribe_with(topic, handler, SubscribeOptions::once_async())
    }

    /// Register a typed handler with explicit options.
    pub fn subscribe_with<H, A>(
        &self,
        topic: &str,
        handler: H,
        options: SubscribeOptions,
    ) -> Result<HandlerId, BusError>
    where
        H: Handler<A>,
    {
        self.subscribe_callable(topic, Callable::new(handler), options)
    }

    /// Register an already erased callable.
    ///
    /// The same callable may be registered any number of times; each
    /// registration gets its own id and is invoked once per publish.
    pub fn subscribe_callable(
        &self,
        topic: &str,
        callable: Callable,
        options: SubscribeOptions,
    ) -> Result<HandlerId, BusError> {
        validate(topic, &options)?;

        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry("subscribe")?.insert(
            topic,
            HandlerRecord {
                id,
                callable,
                options,
            },
        );
        debug!(topic = %topic, handler = %id, ?options, "handler subscribed");
        Ok(id)
    }

    /// Remove the registration with the given id.
    pub fn unsubscribe(&self, topic: &str, id: HandlerId) -> Result<(), BusError> {
        match self.registry("unsubscribe")?.remove(topic, id) {
            Some(_) => {
                debug!(topic = %topic, handler = %id, "handler unsubscribed");
                Ok(())
            }
            None => Err(BusError::HandlerNotFound {
                topic: topic.to_string(),
                id,
            }),
        }
    }

    /// True iff the topic has at least one registered handler.
    ///
    /// A poisoned registry reports no subscribers.
    pub fn has_subscribers(&self, topic: &str) -> bool {
        self.registry("has_subscribers")
            .map(|registry| registry.has_subscribers(topic))
            .unwrap_or(false)
    }

    /// True while the registration `id` is still on `topic`; false once it
    /// was unsubscribed or, for a once handler, taken by a publish.
    pub fn is_subscribed(&self, topic: &str, id: HandlerId) -> bool {
        self.registry("is_subscribed")
            .map(|registry| registry.contains(topic, id))
            .unwrap_or(false)
    }

    pub fn handler_count(&self, topic: &str) -> usize {
        self.registry("handler_count")
            .map(|registry| registry.handler_count(topic))
            .unwrap_or(0)
    }

    /// Topics with at least one handler, sorted.
    pub fn topics(&self) -> Vec<String> {
        self.registry("topics")
            .map(|registry| registry.topics())
            .unwrap_or_default()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Publish to every handler of `topic`.
    ///
    /// Synchronous handlers run on this thread, in registration order, before
    /// `publish` returns; asynchronous handlers are only scheduled. If a
    /// synchronous handler rejects the arguments the remaining handlers still
    /// run and the first failure is returned.
    pub fn publish(&self, topic: &str, args: impl IntoArgs) -> Result<(), BusError> {
        let args = Arc::new(args.into_args()?);
        let handlers = self.registry("publish")?.take_for_dispatch(topic);
        if handlers.is_empty() {
            debug!(topic = %topic, "published with no subscribers");
            return Ok(());
        }

        let mut first_error = None;
        for record in handlers {
            let outcome = if record.options.is_async {
                self.schedule(topic, record, Arc::clone(&args))
            } else {
                record
                    .callable
                    .invoke(&args)
                    .map_err(|source| BusError::Invocation {
                        topic: topic.to_string(),
                        source,
                    })
            };

            if let Err(err) = outcome {
                warn!(topic = %topic, error = %err, "handler dispatch failed");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Publish, returning a handle on the bus-wide pending counter.
    ///
    /// See [`WaitHandle`]: waiting covers every asynchronous invocation the bus
    /// is tracking, not just the ones this call scheduled.
    pub fn publish_and_track(
        &self,
        topic: &str,
        args: impl IntoArgs,
    ) -> Result<WaitHandle, BusError> {
        self.publish(topic, args)?;
        Ok(self.wait_handle())
    }

    /// A handle on the bus-wide pending counter.
    pub fn wait_handle(&self) -> WaitHandle {
        WaitHandle::new(self.pending.clone())
    }

    /// Block until the handle's counter reaches zero.
    pub fn wait(&self, handle: &WaitHandle) {
        handle.wait();
    }

    /// Block until no asynchronous work is pending on this bus.
    pub fn wait_async(&self) {
        self.pending.wait();
    }

    /// Number of asynchronous invocations scheduled and not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.pending()
    }

    /// Hand an async record to a worker thread.
    ///
    /// The pending count and, for transactional handlers, the topic ticket are
    /// taken here on the publishing thread, so ticket order is publish order.
    fn schedule(
        &self,
        topic: &str,
        record: HandlerRecord,
        args: Arc<Args>,
    ) -> Result<(), BusError> {
        let guard = self.pending.add();
        let ticket = record
            .options
            .transactional
            .then(|| self.transactions.ticket(topic));
        let worker_topic = topic.to_string();

        // Topics may contain bytes a thread name cannot.
        thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let _guard = guard;
                if let Some(ticket) = &ticket {
                    ticket.wait();
                }
                if let Err(err) = record.callable.invoke(&args) {
                    warn!(
                        topic = %worker_topic,
                        handler = %record.id,
                        error = %err,
                        "async handler failed"
                    );
                }
            })
            .map(|_| ())
            .map_err(BusError::Spawn)
    }

    fn registry(&self, operation: &'static str) -> Result<MutexGuard<'_, TopicRegistry>, BusError> {
        self.registry
            .lock()
            .map_err(|_| BusError::LockPoisoned(operation))
    }
}

fn validate(topic: &str, options: &SubscribeOptions) -> Result<(), BusError> {
    if topic.is_empty() {
        return Err(BusError::InvalidHandler {
            topic: topic.to_string(),
            reason: "topic must not be empty",
        });
    }
    if options.transactional && !options.is_async {
        return Err(BusError::InvalidHandler {
            topic: topic.to_string(),
            reason: "transactional handlers must be async",
        });
    }
    Ok(())
}
