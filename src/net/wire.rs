//! Wire types shared by the registration and push services.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method name of the publisher-side registration call.
pub const REGISTER_METHOD: &str = "RegistrationService.Register";

/// Method name of the subscriber-side push call.
pub const PUSH_METHOD: &str = "PushService.PushEvent";

/// Whether a remote subscription survives its first delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionKind {
    Subscribe,
    SubscribeOnce,
}

/// A remote peer's request to receive forwarded events for `topic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeArg {
    pub subscriber_address: String,
    pub subscriber_path: String,
    pub push_service_name: String,
    pub subscription_kind: SubscriptionKind,
    pub topic: String,
}

impl SubscribeArg {
    /// Where forwarded events for this subscription are pushed.
    pub fn endpoint(&self) -> PeerEndpoint {
        PeerEndpoint::new(&self.subscriber_address, &self.subscriber_path)
    }
}

/// A forwarded publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientArg {
    pub args: Vec<Value>,
    pub topic: String,
}

/// Where to dial to reach a node's services.
///
/// `address` is `host:port`; a bare `:port` means "this machine" (all
/// interfaces when listening, loopback when dialing). `path` is the service
/// path both calls are mounted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerEndpoint {
    pub address: String,
    pub path: String,
}

impl PeerEndpoint {
    pub fn new(address: impl Into<String>, path: impl AsRef<str>) -> Self {
        Self {
            address: address.into(),
            path: normalize_path(path.as_ref()),
        }
    }

    /// URL of `method` on this endpoint.
    pub fn method_url(&self, method: &str) -> String {
        format!("{}{}", self.base_url(), route(&self.path, method))
    }

    /// `scheme://host:port` used for outbound calls.
    pub fn base_url(&self) -> String {
        let address = self.address.trim_end_matches('/');
        if address.contains("://") {
            address.to_string()
        } else if address.starts_with(':') {
            format!("http://127.0.0.1{}", address)
        } else {
            format!("http://{}", address)
        }
    }

    /// Socket address to bind when serving this endpoint.
    pub fn listen_address(&self) -> String {
        let address = self
            .address
            .split_once("://")
            .map_or(self.address.as_str(), |(_, rest)| rest)
            .trim_end_matches('/');
        if address.starts_with(':') {
            format!("0.0.0.0{}", address)
        } else {
            address.to_string()
        }
    }
}

impl fmt::Display for PeerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.address, self.path)
    }
}

/// Canonical service path: a leading `/`, no trailing `/`. The root is `/`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{}", trimmed)
}

/// Check that a normalized service path can be mounted as literal routes.
///
/// Segments must be non-empty and must not start with `:` or `*`, which the
/// router would read as parameters. `?`, `#`, whitespace and control
/// characters never survive a URL round trip and are refused too.
pub fn validate_path(path: &str) -> Result<(), &'static str> {
    if path == "/" {
        return Ok(());
    }
    for segment in path.trim_start_matches('/').split('/') {
        if segment.is_empty() {
            return Err("empty path segment");
        }
        if segment.starts_with(':') || segment.starts_with('*') {
            return Err("path segments may not start with ':' or '*'");
        }
        if segment
            .chars()
            .any(|c| c == '?' || c == '#' || c.is_whitespace() || c.is_control())
        {
            return Err("path contains characters not allowed in a route");
        }
    }
    Ok(())
}

/// Route of `method` under a normalized service path.
pub fn route(path: &str, method: &str) -> String {
    if path == "/" {
        format!("/{}", method)
    } else {
        format!("{}/{}", path, method)
    }
}
