//! Outbound RPC over HTTP, callable from synchronous code.

use std::sync::mpsc;

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::debug;

use super::error::NodeError;
use super::wire::PeerEndpoint;
use crate::config::NodeConfig;

/// Blocking RPC client.
///
/// Each call is spawned onto the owning node's tokio runtime and the calling
/// thread waits on a channel for the reply. That keeps the call usable from
/// bus handlers, which run on plain threads, without nesting runtimes.
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    runtime: Handle,
}

impl RpcClient {
    pub fn new(runtime: Handle, config: &NodeConfig) -> Result<Self, NodeError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| NodeError::Io(std::io::Error::other(e)))?;
        Ok(Self { http, runtime })
    }

    /// Call `method` on `endpoint` with a JSON body and decode the JSON reply.
    ///
    /// Blocks until the reply arrives or the configured timeout elapses. Any
    /// failure along the way is reported as `RemoteUnreachable`.
    pub fn call<Req, Resp>(
        &self,
        endpoint: &PeerEndpoint,
        method: &str,
        request: &Req,
    ) -> Result<Resp, NodeError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned + Send + 'static,
    {
        let url = endpoint.method_url(method);
        let unreachable = |reason: String| NodeError::RemoteUnreachable {
            endpoint: endpoint.to_string(),
            reason,
        };

        let body = serde_json::to_vec(request).map_err(|e| unreachable(e.to_string()))?;
        let http = self.http.clone();
        let (reply_tx, reply_rx) = mpsc::channel();

        debug!(url = %url, "rpc call");
        self.runtime.spawn(async move {
            let result = async {
                http.post(&url)
                    .header(CONTENT_TYPE, "application/json")
                    .body(body)
                    .send()
                    .await?
                    .error_for_status()?
                    .json::<Resp>()
                    .await
            }
            .await;
            let _ = reply_tx.send(result);
        });

        match reply_rx.recv() {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => Err(unreachable(e.to_string())),
            Err(_) => Err(unreachable("runtime shut down before the call completed".into())),
        }
    }
}
