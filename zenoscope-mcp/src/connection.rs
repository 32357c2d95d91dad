//! Gateway connection management
//!
//! Spawns the gateway daemon as a child process and speaks the
//! line-delimited JSON-RPC protocol over its stdio. Responses are
//! correlated to requests by id, so a slow operation cannot hand its
//! response to the wrong caller.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use zenoscope_protocol::{HostCodec, RpcRequest, RpcResponse, METHOD_INITIALIZE, METHOD_SHUTDOWN};

use crate::bridge::GatewayHandle;
use crate::config::GatewaySection;
use crate::error::McpError;

/// How long to wait for the gateway to answer one request
pub const RESPONSE_TIMEOUT_SECS: u64 = 30;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<RpcResponse>>>>;

/// Connection to a spawned gateway process
pub struct GatewayConnection {
    request_tx: mpsc::Sender<RpcRequest>,
    pending: PendingMap,
    next_id: AtomicU64,
    // held so the child is killed if the server goes away
    _child: Child,
}

impl GatewayConnection {
    /// Spawn the gateway process and wire up its stdio
    pub fn spawn(config: &GatewaySection) -> Result<Self, McpError> {
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(path) = &config.zenoh_config {
            command.env("ZENOH_CONFIG", path);
        }

        let mut child = command
            .spawn()
            .map_err(|e| McpError::ProcessSpawn(format!("{}: {}", config.command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Internal("gateway stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Internal("gateway stdout unavailable".into()))?;

        let (request_tx, request_rx) = mpsc::channel::<RpcRequest>(32);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        spawn_writer(stdin, request_rx);
        spawn_reader(stdout, pending.clone());

        info!(command = %config.command, "Gateway process spawned");

        Ok(Self {
            request_tx,
            pending,
            next_id: AtomicU64::new(1),
            _child: child,
        })
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Send one request and wait for its matching response
    async fn request(&self, request: RpcRequest) -> Result<Value, McpError> {
        let id = request.id;
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if self.request_tx.send(request).await.is_err() {
            self.pending.lock().await.remove(&id);
            return Err(McpError::ConnectionClosed);
        }

        let response = match tokio::time::timeout(
            Duration::from_secs(RESPONSE_TIMEOUT_SECS),
            rx,
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(McpError::ConnectionClosed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(McpError::ResponseTimeout {
                    seconds: RESPONSE_TIMEOUT_SECS,
                });
            }
        };

        if let Some(error) = response.error {
            return Err(McpError::Gateway(error.message));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Perform the `initialize` handshake
    pub async fn initialize(&self) -> Result<(), McpError> {
        let ready = self
            .request(RpcRequest::new(self.next_id(), METHOD_INITIALIZE))
            .await?;
        debug!(ready = %ready, "Gateway initialized");
        Ok(())
    }

    /// Ask the gateway to shut down; best-effort
    pub async fn shutdown(&self) {
        if let Err(e) = self
            .request(RpcRequest::new(self.next_id(), METHOD_SHUTDOWN))
            .await
        {
            warn!(error = %e, "Gateway shutdown request failed");
        }
    }
}

impl GatewayHandle for GatewayConnection {
    async fn call(&self, operation: &str, input: Value) -> Result<Value, McpError> {
        self.request(RpcRequest::execute(self.next_id(), operation, input))
            .await
    }
}

fn spawn_writer(stdin: ChildStdin, mut request_rx: mpsc::Receiver<RpcRequest>) {
    tokio::spawn(async move {
        let mut sink = FramedWrite::new(stdin, HostCodec::new());
        while let Some(request) = request_rx.recv().await {
            if let Err(e) = sink.send(request).await {
                error!(error = %e, "Failed to send to gateway");
                break;
            }
        }
    });
}

fn spawn_reader(stdout: ChildStdout, pending: PendingMap) {
    tokio::spawn(async move {
        let mut stream = FramedRead::new(stdout, HostCodec::new());
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(response) => {
                    let waiter = pending.lock().await.remove(&response.id);
                    match waiter {
                        Some(tx) => {
                            let _ = tx.send(response);
                        }
                        None => {
                            warn!(id = response.id, "Response without a waiting request")
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to decode gateway response");
                    break;
                }
            }
        }
        info!("Gateway connection closed");
        // wake up anyone still waiting; their oneshot senders drop here
        pending.lock().await.clear();
    });
}
