//! zenoscope-protocol: Shared wire definitions for gateway communication
//!
//! This crate defines the JSON-RPC message types, the typed operation
//! payloads, and the newline-delimited JSON codec used between the zenoscope
//! MCP server and the bus gateway daemon over the gateway's stdio.

pub mod codec;
pub mod messages;
pub mod types;

// Re-export main types at crate root
pub use codec::{CodecError, GatewayCodec, HostCodec};
pub use messages::{
    OpResult, RpcError, RpcRequest, RpcResponse, JSONRPC_VERSION, METHOD_EXECUTE,
    METHOD_INITIALIZE, METHOD_SHUTDOWN, OP_GET_TOPICS, OP_LIST_SUBSCRIPTIONS, OP_POLL,
    OP_SESSION_INFO, OP_START_DISCOVERY, OP_STOP_DISCOVERY, OP_SUBSCRIBE, OP_UNSUBSCRIBE,
};
pub use types::{
    PollResult, SampleRecord, SessionInfo, SubscribeAck, SubscriptionInfo, TopicStats,
    TopicsSnapshot,
};
