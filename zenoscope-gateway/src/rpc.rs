//! The gateway's stdio RPC loop
//!
//! Reads line-delimited JSON-RPC requests from stdin, writes responses to
//! stdout. Requests are handled one at a time; `shutdown` cancels all
//! background tasks and exits the loop.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::RwLock;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use zenoscope_protocol::{
    CodecError, GatewayCodec, RpcError, RpcRequest, RpcResponse, METHOD_EXECUTE,
    METHOD_INITIALIZE, METHOD_SHUTDOWN,
};
use zenoscope_utils::{Result, ZenoscopeError};

use crate::ops;
use crate::state::GatewayState;

/// Run the RPC loop until stdin closes or `shutdown` is received
pub async fn run(session: Arc<zenoh::Session>, state: Arc<RwLock<GatewayState>>) -> Result<()> {
    let mut reader = FramedRead::new(tokio::io::stdin(), GatewayCodec::new());
    let mut writer = FramedWrite::new(tokio::io::stdout(), GatewayCodec::new());

    info!("Gateway RPC loop starting");

    while let Some(frame) = reader.next().await {
        let request = match frame {
            Ok(request) => request,
            Err(CodecError::Json(e)) => {
                warn!(error = %e, "Failed to parse request");
                let response = RpcResponse::error(
                    0,
                    RpcError::new(RpcError::PARSE_ERROR, format!("Parse error: {e}")),
                );
                send(&mut writer, response).await?;
                continue;
            }
            Err(e) => return Err(ZenoscopeError::protocol(e.to_string())),
        };

        debug!(method = %request.method, id = request.id, "Incoming request");
        let shutting_down = request.method == METHOD_SHUTDOWN;

        let response = handle_request(&request, &session, &state).await;
        send(&mut writer, response).await?;

        if shutting_down {
            break;
        }
    }

    info!("Gateway RPC loop exiting");
    Ok(())
}

async fn send(
    writer: &mut FramedWrite<tokio::io::Stdout, GatewayCodec>,
    response: RpcResponse,
) -> Result<()> {
    writer
        .send(response)
        .await
        .map_err(|e| ZenoscopeError::protocol(e.to_string()))
}

async fn handle_request(
    request: &RpcRequest,
    session: &Arc<zenoh::Session>,
    state: &Arc<RwLock<GatewayState>>,
) -> RpcResponse {
    match request.method.as_str() {
        METHOD_INITIALIZE => {
            RpcResponse::success(request.id, serde_json::json!({ "ready": true }))
        }

        METHOD_SHUTDOWN => {
            state.write().await.cancel_all();
            info!("Shutdown requested, all watchers and subscriptions cancelled");
            RpcResponse::success(request.id, serde_json::json!({}))
        }

        METHOD_EXECUTE => {
            let operation = request
                .params
                .get("operation")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let input = request
                .params
                .get("input")
                .cloned()
                .unwrap_or_else(|| serde_json::Value::Object(Default::default()));

            match ops::dispatch(operation, &input, session, state).await {
                Ok(data) => RpcResponse::success(
                    request.id,
                    serde_json::json!({
                        "success": true,
                        "data": data,
                        "message": null,
                    }),
                ),
                Err(e) => {
                    warn!(operation = %operation, error = %e, "Operation failed");
                    RpcResponse::error(
                        request.id,
                        RpcError::new(RpcError::OPERATION_FAILED, e.to_string()),
                    )
                }
            }
        }

        other => RpcResponse::error(
            request.id,
            RpcError::new(
                RpcError::METHOD_NOT_FOUND,
                format!("Unknown method: {other}"),
            ),
        ),
    }
}
