//! Peer node: registration service and push endpoint behind one address.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::{Builder, Runtime};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::client::RpcClient;
use super::error::NodeError;
use super::http::{router, RelayState};
use super::push::PushEndpoint;
use super::registration::RegistrationService;
use super::wire::{
    validate_path, PeerEndpoint, SubscribeArg, SubscriptionKind, PUSH_METHOD, REGISTER_METHOD,
};
use crate::bus::Bus;
use crate::config::NodeConfig;
use crate::handler::{Callable, Handler, HandlerId, SubscribeOptions};

struct Running {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
}

/// A process that can both publish to remote subscribers and subscribe to
/// remote publishers.
///
/// The node owns a small tokio runtime for its HTTP server and outbound
/// calls; its own API is synchronous and may be used from any thread that is
/// not itself driving an async runtime.
///
/// ## Example
///
/// ```no_run
/// use netbus::net::Node;
///
/// let a = Node::new("127.0.0.1:2035", "/a")?;
/// let b = Node::new("127.0.0.1:2030", "/b")?;
/// a.start()?;
/// b.start()?;
///
/// a.subscribe_remote("x", |n: i64| println!("got {n}"), "127.0.0.1:2030", "/b")?;
/// b.bus().publish("x", (10,))?;
///
/// a.stop();
/// b.stop();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Node {
    endpoint: PeerEndpoint,
    bus: Arc<Bus>,
    registration: Arc<RegistrationService>,
    push: Arc<PushEndpoint>,
    client: RpcClient,
    state: Mutex<Option<Running>>,
    runtime: Option<Runtime>,
}

impl Node {
    /// Create a node with a fresh bus and default configuration.
    pub fn new(address: &str, path: &str) -> Result<Self, NodeError> {
        Self::with_bus(address, path, Arc::new(Bus::new()))
    }

    /// Create a node on top of an existing bus.
    pub fn with_bus(address: &str, path: &str, bus: Arc<Bus>) -> Result<Self, NodeError> {
        Self::with_config(address, path, bus, NodeConfig::default())
    }

    pub fn with_config(
        address: &str,
        path: &str,
        bus: Arc<Bus>,
        config: NodeConfig,
    ) -> Result<Self, NodeError> {
        let endpoint = PeerEndpoint::new(address, path);
        validate_path(&endpoint.path).map_err(|reason| NodeError::InvalidPath {
            path: endpoint.path.clone(),
            reason,
        })?;

        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name("netbus-node")
            .enable_all()
            .build()?;
        let client = RpcClient::new(runtime.handle().clone(), &config)?;

        Ok(Self {
            endpoint,
            registration: Arc::new(RegistrationService::new(Arc::clone(&bus), client.clone())),
            push: Arc::new(PushEndpoint::new(Arc::clone(&bus))),
            bus,
            client,
            state: Mutex::new(None),
            runtime: Some(runtime),
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bind the listen address and start serving both services.
    pub fn start(&self) -> Result<(), NodeError> {
        let mut state = self.state();
        if state.is_some() {
            return Err(NodeError::AlreadyStarted);
        }
        let runtime = self.runtime.as_ref().ok_or(NodeError::NotStarted)?;
        let app = router(
            &self.endpoint.path,
            RelayState {
                registration: Arc::clone(&self.registration),
                push: Arc::clone(&self.push),
            },
        )?;

        let listener = std::net::TcpListener::bind(self.endpoint.listen_address().as_str())?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        let listener = {
            let _enter = runtime.enter();
            tokio::net::TcpListener::from_std(listener)?
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        runtime.spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                warn!(error = %e, "relay server stopped with error");
            }
        });

        info!(address = %local_addr, path = %self.endpoint.path, "node started");
        *state = Some(Running {
            local_addr,
            shutdown: shutdown_tx,
        });
        Ok(())
    }

    /// Stop accepting connections. Handlers already running are not
    /// interrupted. Does nothing if the node is not started.
    pub fn stop(&self) {
        match self.state().take() {
            Some(running) => {
                let _ = running.shutdown.send(());
                info!(address = %running.local_addr, path = %self.endpoint.path, "node stopped");
            }
            None => debug!(path = %self.endpoint.path, "stop on idle node ignored"),
        }
    }

    pub fn is_started(&self) -> bool {
        self.state().is_some()
    }

    /// The bound socket address.
    pub fn local_addr(&self) -> Result<SocketAddr, NodeError> {
        self.state()
            .as_ref()
            .map(|running| running.local_addr)
            .ok_or(NodeError::NotStarted)
    }

    /// Address remote publishers should push to.
    ///
    /// Normally the configured address; when the node was configured with
    /// port `0` and is running, the port that was actually bound.
    pub fn advertised_address(&self) -> String {
        let state = self.state();
        match state.as_ref() {
            Some(running) if has_ephemeral_port(&self.endpoint.address) => {
                let addr = running.local_addr;
                if addr.ip().is_unspecified() {
                    format!(":{}", addr.port())
                } else {
                    addr.to_string()
                }
            }
            _ => self.endpoint.address.clone(),
        }
    }

    // =========================================================================
    // Remote subscriptions
    // =========================================================================

    /// Subscribe `handler` to `topic` on the node at `remote_address`/`remote_path`.
    ///
    /// The remote is asked to forward the topic to this node's push endpoint;
    /// only if it agrees is `handler` registered on the local bus. Failures are
    /// logged and returned; the subscription then simply does not exist.
    pub fn subscribe_remote<H, A>(
        &self,
        topic: &str,
        handler: H,
        remote_address: &str,
        remote_path: &str,
    ) -> Result<HandlerId, NodeError>
    where
        H: Handler<A>,
    {
        self.remote_subscribe(
            topic,
            Callable::new(handler),
            &PeerEndpoint::new(remote_address, remote_path),
            SubscriptionKind::Subscribe,
        )
    }

    /// Like [`subscribe_remote`](Self::subscribe_remote), but only the next
    /// publication on the remote is forwarded, and the local handler runs once.
    pub fn subscribe_remote_once<H, A>(
        &self,
        topic: &str,
        handler: H,
        remote_address: &str,
        remote_path: &str,
    ) -> Result<HandlerId, NodeError>
    where
        H: Handler<A>,
    {
        self.remote_subscribe(
            topic,
            Callable::new(handler),
            &PeerEndpoint::new(remote_address, remote_path),
            SubscriptionKind::SubscribeOnce,
        )
    }

    fn remote_subscribe(
        &self,
        topic: &str,
        callable: Callable,
        remote: &PeerEndpoint,
        kind: SubscriptionKind,
    ) -> Result<HandlerId, NodeError> {
        let arg = SubscribeArg {
            subscriber_address: self.advertised_address(),
            subscriber_path: self.endpoint.path.clone(),
            push_service_name: PUSH_METHOD.to_string(),
            subscription_kind: kind,
            topic: topic.to_string(),
        };

        let accepted = self
            .client
            .call::<_, bool>(remote, REGISTER_METHOD, &arg)
            .map_err(|e| {
                warn!(topic = %topic, remote = %remote, error = %e, "remote subscribe failed");
                e
            })?;
        if !accepted {
            warn!(topic = %topic, remote = %remote, "remote refused subscription");
            return Err(NodeError::RegistrationRejected {
                endpoint: remote.to_string(),
                topic: topic.to_string(),
            });
        }

        let options = match kind {
            SubscriptionKind::Subscribe => SubscribeOptions::persistent(),
            SubscriptionKind::SubscribeOnce => SubscribeOptions::once(),
        };
        let id = self.bus.subscribe_callable(topic, callable, options)?;
        info!(topic = %topic, remote = %remote, kind = ?kind, "subscribed to remote topic");
        Ok(id)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    pub fn registration(&self) -> &Arc<RegistrationService> {
        &self.registration
    }

    pub fn push_endpoint(&self) -> &Arc<PushEndpoint> {
        &self.push
    }

    /// Configured address and normalized service path.
    pub fn endpoint(&self) -> &PeerEndpoint {
        &self.endpoint
    }

    fn state(&self) -> MutexGuard<'_, Option<Running>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.stop();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

fn has_ephemeral_port(address: &str) -> bool {
    address
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.trim_end_matches('/') == "0")
}
