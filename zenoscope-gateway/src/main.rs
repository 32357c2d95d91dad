//! zenoscope gateway - daemon owning the live Zenoh session
//!
//! Spawned as a child process by the MCP server; speaks line-delimited
//! JSON-RPC on stdio and keeps all bus-side state (discovery watchers,
//! sample buffers) in-process.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use zenoscope_utils::LogConfig;

mod discovery;
mod ops;
mod rpc;
mod state;

use state::GatewayState;

#[tokio::main]
async fn main() {
    // stdout carries the RPC protocol, so logs go to a file
    if let Err(e) = zenoscope_utils::init_logging_with_config(LogConfig::gateway()) {
        eprintln!("zenoscope-gateway: failed to init logging: {e}");
    }

    let config = match std::env::var("ZENOH_CONFIG") {
        Ok(path) => zenoh::Config::from_file(&path).unwrap_or_else(|e| {
            warn!(path = %path, error = %e, "Failed to load Zenoh config, using default");
            zenoh::Config::default()
        }),
        Err(_) => zenoh::Config::default(),
    };

    let session = match zenoh::open(config).await {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!(error = %e, "Failed to open Zenoh session");
            std::process::exit(1);
        }
    };

    info!(zid = %session.zid(), "Zenoh session open");

    let state = Arc::new(RwLock::new(GatewayState::new()));

    if let Err(e) = rpc::run(session, state).await {
        error!(error = %e, "Gateway terminated abnormally");
        std::process::exit(1);
    }
}
