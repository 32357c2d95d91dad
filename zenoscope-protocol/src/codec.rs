//! Message codec for gateway stdio framing
//!
//! Frames are newline-delimited JSON: one complete JSON-RPC message per
//! line. Newlines cannot occur inside a serialized message, so scanning for
//! the delimiter is safe.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::{RpcRequest, RpcResponse};

/// Maximum frame size (16 MB)
const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

/// Codec for RpcRequest (encoding) and RpcResponse (decoding)
/// Used by the MCP server side of the connection
pub struct HostCodec;

impl HostCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HostCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for HostCodec {
    type Item = RpcResponse;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src)
    }
}

impl Encoder<RpcRequest> for HostCodec {
    type Error = CodecError;

    fn encode(&mut self, item: RpcRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst)
    }
}

/// Codec for RpcResponse (encoding) and RpcRequest (decoding)
/// Used by the gateway side
pub struct GatewayCodec;

impl GatewayCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GatewayCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for GatewayCodec {
    type Item = RpcRequest;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src)
    }
}

impl Encoder<RpcResponse> for GatewayCodec {
    type Error = CodecError;

    fn encode(&mut self, item: RpcResponse, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst)
    }
}

/// Decode one newline-terminated JSON frame, skipping blank lines
fn decode_frame<T: serde::de::DeserializeOwned>(
    src: &mut BytesMut,
) -> Result<Option<T>, CodecError> {
    loop {
        let Some(pos) = src.iter().position(|&b| b == b'\n') else {
            if src.len() > MAX_FRAME_SIZE {
                return Err(CodecError::FrameTooLarge {
                    size: src.len(),
                    max: MAX_FRAME_SIZE,
                });
            }
            return Ok(None);
        };

        let line = src.split_to(pos + 1);
        let body = &line[..pos];
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            continue;
        }

        let msg: T = serde_json::from_slice(body)?;
        return Ok(Some(msg));
    }
}

/// Encode one JSON frame with a trailing newline
fn encode_frame<T: serde::Serialize>(item: &T, dst: &mut BytesMut) -> Result<(), CodecError> {
    let data = serde_json::to_vec(item)?;

    if data.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: data.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    dst.reserve(data.len() + 1);
    dst.put_slice(&data);
    dst.put_u8(b'\n');
    Ok(())
}
