//! Shared helpers for relay tests.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use netbus::net::{Node, SubscribeArg, SubscriptionKind, PUSH_METHOD};
use netbus::{Bus, NodeConfig};

/// Route library logs to the test harness. Set `RUST_LOG=netbus=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_config() -> NodeConfig {
    NodeConfig::default()
        .with_request_timeout(Duration::from_secs(2))
        .with_connect_timeout(Duration::from_millis(500))
}

/// A node on an ephemeral loopback port, not yet started.
pub fn node(path: &str) -> Node {
    init_tracing();
    Node::with_config("127.0.0.1:0", path, Arc::new(Bus::new()), test_config()).unwrap()
}

/// A started node on an ephemeral loopback port.
pub fn started_node(path: &str) -> Node {
    let node = node(path);
    node.start().unwrap();
    node
}

/// `host:port` other nodes should dial to reach `node`.
pub fn address_of(node: &Node) -> String {
    node.local_addr().unwrap().to_string()
}

/// A loopback address nothing is listening on.
pub fn dead_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

pub fn subscribe_arg(address: &str, path: &str, kind: SubscriptionKind, topic: &str) -> SubscribeArg {
    SubscribeArg {
        subscriber_address: address.to_string(),
        subscriber_path: path.to_string(),
        push_service_name: PUSH_METHOD.to_string(),
        subscription_kind: kind,
        topic: topic.to_string(),
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Collects values from handlers running on any thread.
#[derive(Clone)]
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, value: T) {
        self.values.lock().unwrap().push(value);
    }

    pub fn values(&self) -> Vec<T> {
        self.values.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.values.lock().unwrap().len()
    }
}
