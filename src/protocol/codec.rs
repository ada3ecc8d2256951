//! Line codec: one JSON-RPC envelope per line of text.

use crate::error::DecodeError;
use crate::protocol::types::{Envelope, JSONRPC_VERSION, RequestId};
use serde_json::Value;
use tracing::warn;

/// Fallback line if an envelope ever fails to serialize.
const ENCODE_FAILURE_LINE: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error: response could not be encoded"}}"#;

/// Decodes one raw input line; bytes that are not UTF-8 are a parse failure.
pub fn decode_bytes(line: &[u8]) -> Result<Envelope, DecodeError> {
    let text = std::str::from_utf8(line)
        .map_err(|e| DecodeError::ParseFailure(format!("invalid UTF-8: {}", e)))?;
    decode(text)
}

/// Decodes one line into an envelope, checking only its structural shape.
pub fn decode(line: &str) -> Result<Envelope, DecodeError> {
    let value: Value =
        serde_json::from_str(line).map_err(|e| DecodeError::ParseFailure(e.to_string()))?;

    if !value.is_object() {
        return Err(DecodeError::ParseFailure(
            "message must be a JSON object".into(),
        ));
    }

    let id = value
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value::<RequestId>(id).ok());

    let envelope: Envelope =
        serde_json::from_value(value).map_err(|e| DecodeError::InvalidEnvelope {
            id: id.clone(),
            reason: e.to_string().into(),
        })?;

    if envelope.jsonrpc != JSONRPC_VERSION {
        return Err(DecodeError::InvalidEnvelope {
            id,
            reason: "jsonrpc must be '2.0'".into(),
        });
    }

    if envelope.kind().is_none() {
        return Err(DecodeError::InvalidEnvelope {
            id,
            reason: "message must carry either a method or a result/error".into(),
        });
    }

    Ok(envelope)
}

/// Encodes an envelope as a single line without the trailing newline.
pub fn encode(envelope: &Envelope) -> String {
    match serde_json::to_string(envelope) {
        Ok(line) => line,
        Err(e) => {
            warn!("Failed to encode response: {}", e);
            ENCODE_FAILURE_LINE.to_string()
        }
    }
}
