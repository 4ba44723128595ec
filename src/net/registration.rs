//! Registration service: the publisher side of the relay.
//!
//! A remote peer calls `register` to ask for a topic. The service installs a
//! forwarding handler into its own bus; from then on every local publish on
//! that topic is pushed to the peer's push endpoint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde_json::Value;
use tracing::{debug, info, warn};

use super::client::RpcClient;
use super::wire::{ClientArg, PeerEndpoint, SubscribeArg, SubscriptionKind};
use crate::bus::Bus;
use crate::handler::{Callable, HandlerId, SubscribeOptions};

/// A registered remote subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RemoteSubscriber {
    endpoint: PeerEndpoint,
    push_service_name: String,
    kind: SubscriptionKind,
    handler: HandlerId,
}

impl RemoteSubscriber {
    fn matches(&self, arg: &SubscribeArg) -> bool {
        self.kind == arg.subscription_kind
            && self.endpoint == arg.endpoint()
            && self.push_service_name == arg.push_service_name
    }
}

type SubscriberTable = Arc<Mutex<HashMap<String, Vec<RemoteSubscriber>>>>;

/// Accepts remote subscriptions and forwards matching publications.
pub struct RegistrationService {
    bus: Arc<Bus>,
    client: RpcClient,
    subscribers: SubscriberTable,
}

impl RegistrationService {
    pub fn new(bus: Arc<Bus>, client: RpcClient) -> Self {
        Self {
            bus,
            client,
            subscribers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Handle a remote subscription request.
    ///
    /// Returns `false` when the subscription cannot be installed. Registering
    /// the same subscriber endpoint twice for a topic with the same kind
    /// succeeds without adding a second forwarder, as long as the first one is
    /// still live. A once and a persistent subscription are independent.
    pub fn register(&self, arg: SubscribeArg) -> bool {
        if arg.topic.is_empty() {
            warn!(subscriber = %arg.endpoint(), "registration with empty topic rejected");
            return false;
        }

        let mut subscribers = lock(&self.subscribers);
        if let Some(list) = subscribers.get_mut(&arg.topic) {
            if let Some(position) = list.iter().position(|s| s.matches(&arg)) {
                if self.bus.is_subscribed(&arg.topic, list[position].handler) {
                    debug!(topic = %arg.topic, subscriber = %arg.endpoint(), "already subscribed");
                    return true;
                }
                // A one-shot forwarder already taken by a publish; replace it.
                list.remove(position);
            }
        }

        let options = match arg.subscription_kind {
            SubscriptionKind::Subscribe => SubscribeOptions::persistent(),
            SubscriptionKind::SubscribeOnce => SubscribeOptions::once(),
        };
        let installed = Arc::new(OnceLock::new());
        let forwarder = self.forwarder(&arg, Arc::clone(&installed));
        let handler = match self.bus.subscribe_callable(&arg.topic, forwarder, options) {
            Ok(id) => id,
            Err(e) => {
                warn!(topic = %arg.topic, error = %e, "failed to install forwarder");
                return false;
            }
        };
        // Set while the table is still locked, so a forwarder that fires at
        // once blocks in `forget` until its id is known.
        let _ = installed.set(handler);

        info!(
            topic = %arg.topic,
            subscriber = %arg.endpoint(),
            kind = ?arg.subscription_kind,
            "remote subscriber registered"
        );
        subscribers
            .entry(arg.topic.clone())
            .or_default()
            .push(RemoteSubscriber {
                endpoint: arg.endpoint(),
                push_service_name: arg.push_service_name,
                kind: arg.subscription_kind,
                handler,
            });
        true
    }

    /// Remove a subscriber's forwarder. Returns `false` if it was not registered.
    pub fn unregister(&self, arg: &SubscribeArg) -> bool {
        let mut subscribers = lock(&self.subscribers);
        let Some(list) = subscribers.get_mut(&arg.topic) else {
            return false;
        };
        let Some(position) = list.iter().position(|s| s.matches(arg)) else {
            return false;
        };
        let subscriber = list.remove(position);
        if list.is_empty() {
            subscribers.remove(&arg.topic);
        }

        if let Err(e) = self.bus.unsubscribe(&arg.topic, subscriber.handler) {
            debug!(topic = %arg.topic, error = %e, "forwarder already gone");
        }
        info!(topic = %arg.topic, subscriber = %subscriber.endpoint, "remote subscriber removed");
        true
    }

    /// True if this subscriber endpoint is registered for the topic.
    pub fn has_client_subscribed(&self, arg: &SubscribeArg) -> bool {
        lock(&self.subscribers)
            .get(&arg.topic)
            .is_some_and(|list| list.iter().any(|s| s.matches(arg)))
    }

    /// Number of remote subscribers registered for the topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        lock(&self.subscribers).get(topic).map_or(0, Vec::len)
    }

    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    /// Build the handler that pushes one topic's publications to one peer.
    ///
    /// Delivery failures are logged and swallowed: one unreachable peer must
    /// not keep the publish from reaching the other handlers.
    fn forwarder(&self, arg: &SubscribeArg, installed: Arc<OnceLock<HandlerId>>) -> Callable {
        let client = self.client.clone();
        let subscribers = Arc::clone(&self.subscribers);
        let endpoint = arg.endpoint();
        let method = arg.push_service_name.clone();
        let topic = arg.topic.clone();
        let once = arg.subscription_kind == SubscriptionKind::SubscribeOnce;

        Callable::raw(move |args: &[Value]| {
            if once {
                forget(&subscribers, &topic, &installed);
            }

            let payload = ClientArg {
                args: args.to_vec(),
                topic: topic.clone(),
            };
            match client.call::<_, bool>(&endpoint, &method, &payload) {
                Ok(true) => debug!(topic = %topic, subscriber = %endpoint, "event forwarded"),
                Ok(false) => {
                    warn!(topic = %topic, subscriber = %endpoint, "subscriber refused event")
                }
                Err(e) => {
                    warn!(topic = %topic, subscriber = %endpoint, error = %e, "delivery failed")
                }
            }
            Ok(())
        })
    }
}

/// Drop a consumed one-shot subscriber so the peer may register again.
///
/// Only the entry for this forwarder's own registration is removed; a newer
/// registration by the same peer stays.
fn forget(subscribers: &SubscriberTable, topic: &str, installed: &OnceLock<HandlerId>) {
    let mut subscribers = lock(subscribers);
    let Some(&handler) = installed.get() else {
        return;
    };
    if let Some(list) = subscribers.get_mut(topic) {
        list.retain(|s| s.handler != handler);
        if list.is_empty() {
            subscribers.remove(topic);
        }
    }
}

// The table is only ever appended to or filtered; a poisoned guard is still consistent.
fn lock(subscribers: &SubscriberTable) -> MutexGuard<'_, HashMap<String, Vec<RemoteSubscriber>>> {
    subscribers.lock().unwrap_or_else(PoisonError::into_inner)
}
