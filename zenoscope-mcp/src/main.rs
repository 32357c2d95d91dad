//! zenoscope MCP server
//!
//! Exposes Zenoh topic discovery and sampling as MCP tools over stdio. The
//! actual bus connection lives in the gateway daemon, spawned here as a
//! child process and driven through the extension bridge.

use tracing::{error, info, warn};

use zenoscope_protocol::{SessionInfo, OP_SESSION_INFO};
use zenoscope_utils::LogConfig;

mod bridge;
mod config;
mod connection;
mod discover;
mod dispatch;
mod error;
mod protocol;
mod sample;
mod server;
mod tools;

use bridge::ExtensionBridge;
use config::McpConfig;
use connection::GatewayConnection;
use server::McpServer;

#[tokio::main]
async fn main() {
    // stdout carries the MCP protocol, so logs go to a file
    if let Err(e) = zenoscope_utils::init_logging_with_config(LogConfig::mcp_server()) {
        eprintln!("zenoscope-mcp: failed to init logging: {e}");
    }

    let config = match McpConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            eprintln!("zenoscope-mcp: failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let connection = match GatewayConnection::spawn(&config.gateway) {
        Ok(connection) => connection,
        Err(e) => {
            error!(error = %e, "Failed to spawn gateway");
            eprintln!("zenoscope-mcp: failed to spawn gateway: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = connection.initialize().await {
        error!(error = %e, "Gateway handshake failed");
        eprintln!("zenoscope-mcp: gateway handshake failed: {e}");
        std::process::exit(1);
    }

    let bridge = ExtensionBridge::new(connection);

    // connectivity breadcrumb in the log; nothing fatal if it fails
    match bridge
        .invoke(OP_SESSION_INFO, serde_json::json!({}))
        .await
        .and_then(|payload| serde_json::from_value::<SessionInfo>(payload).map_err(Into::into))
    {
        Ok(session) => info!(
            zid = %session.zid,
            peers = session.peers.len(),
            routers = session.routers.len(),
            "Gateway bus session ready"
        ),
        Err(e) => warn!(error = %e, "Could not read gateway session info"),
    }

    let mut server = McpServer::new(bridge);
    let run_result = server.run().await;

    let bridge = server.into_bridge();
    bridge.host().shutdown().await;

    if let Err(e) = run_result {
        error!(error = %e, "MCP server terminated abnormally");
        std::process::exit(1);
    }
}
