//! Extension bridge - the call-and-unwrap layer in front of the gateway
//!
//! Services never touch the connection directly: they invoke named
//! operations through [`ExtensionBridge`], which forwards to whatever
//! [`GatewayHandle`] was injected (the spawned gateway process in
//! production, a scripted double in tests) and normalizes the operation
//! result envelope exactly once.

use serde_json::Value;
use tracing::debug;

use zenoscope_protocol::OpResult;

use crate::error::McpError;

/// Fixed identity of the bus extension the bridge forwards to
pub const EXTENSION_ID: &str = "zenoh-bus";

/// A handle capable of executing named gateway operations.
///
/// Injected into the bridge rather than reached through ambient state so
/// services can run against test doubles or multiple gateway instances.
pub trait GatewayHandle {
    /// Execute one operation and return the raw result value
    async fn call(&self, operation: &str, input: Value) -> Result<Value, McpError>;
}

/// Thin invoke layer over a [`GatewayHandle`]
pub struct ExtensionBridge<H> {
    host: H,
}

impl<H: GatewayHandle> ExtensionBridge<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Invoke a named operation and unwrap to its effective payload.
    ///
    /// Gateway responses historically arrive either as a bare payload or
    /// wrapped in a `{success, data, message}` envelope; both resolve here.
    /// No retries, no timeout of its own — timing belongs to the caller.
    pub async fn invoke(&self, operation: &str, input: Value) -> Result<Value, McpError> {
        debug!(extension = EXTENSION_ID, operation = %operation, "Invoking gateway operation");
        let result = self.host.call(operation, input).await?;

        match OpResult::from(result) {
            OpResult::Enveloped {
                success: false,
                message,
                ..
            } => Err(McpError::Gateway(message.unwrap_or_else(|| {
                format!("operation {operation} failed")
            }))),
            other => Ok(other.into_payload()),
        }
    }
}

/// Scripted gateway double for service and dispatcher tests
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Inner {
        calls: Mutex<Vec<(String, Value)>>,
        script: Mutex<VecDeque<Result<Value, String>>>,
    }

    /// Records every call and answers from a scripted queue of responses
    #[derive(Clone, Default)]
    pub struct FakeGateway {
        inner: Arc<Inner>,
    }

    impl FakeGateway {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a successful raw response
        pub fn respond(&self, value: Value) {
            self.inner.script.lock().unwrap().push_back(Ok(value));
        }

        /// Queue a successful response wrapped in the gateway envelope
        pub fn respond_enveloped(&self, data: Value) {
            self.respond(serde_json::json!({
                "success": true,
                "data": data,
                "message": null,
            }));
        }

        /// Queue a failed call
        pub fn respond_err(&self, message: &str) {
            self.inner
                .script
                .lock()
                .unwrap()
                .push_back(Err(message.to_string()));
        }

        /// Every `(operation, input)` pair seen so far
        pub fn calls(&self) -> Vec<(String, Value)> {
            self.inner.calls.lock().unwrap().clone()
        }

        /// Operation names seen so far, in order
        pub fn ops(&self) -> Vec<String> {
            self.calls().into_iter().map(|(op, _)| op).collect()
        }

        pub fn call_count(&self) -> usize {
            self.inner.calls.lock().unwrap().len()
        }
    }

    impl GatewayHandle for FakeGateway {
        async fn call(&self, operation: &str, input: Value) -> Result<Value, McpError> {
            self.inner
                .calls
                .lock()
                .unwrap()
                .push((operation.to_string(), input));
            match self.inner.script.lock().unwrap().pop_front() {
                Some(Ok(value)) => Ok(value),
                Some(Err(message)) => Err(McpError::Gateway(message)),
                None => panic!("unscripted gateway call: {operation}"),
            }
        }
    }
}
