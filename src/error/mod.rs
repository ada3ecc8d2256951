//! Error types for the MCP tool server.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.

use crate::protocol::types::RequestId;
use serde_json::{Value, json};
use std::borrow::Cow;
use thiserror::Error;

/// Main error type for the MCP tool server.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON-RPC 2.0 and MCP protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Parse error")]
    ParseError,

    #[error("Invalid Request: {0}")]
    InvalidRequest(Cow<'static, str>),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(Cow<'static, str>),

    #[error("Internal error: {0}")]
    InternalError(Cow<'static, str>),

    /// A tool ran and failed; `detail` travels in the error's `data` member.
    #[error("Internal error: {message}")]
    ToolFailure { message: String, detail: Value },
}

impl ProtocolError {
    /// Returns the JSON-RPC 2.0 error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::InternalError(_) | Self::ToolFailure { .. } => -32603,
        }
    }

    /// Machine-readable detail for the error's `data` member, if any.
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::ToolFailure { detail, .. } => Some(detail.clone()),
            _ => None,
        }
    }
}

/// Failures while turning one input line into an envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line is not valid JSON, or not a JSON object.
    #[error("Parse error: {0}")]
    ParseFailure(String),

    /// Valid JSON, but not a JSON-RPC 2.0 envelope.
    #[error("Invalid envelope: {reason}")]
    InvalidEnvelope {
        id: Option<RequestId>,
        reason: Cow<'static, str>,
    },
}

impl DecodeError {
    /// The protocol error the stream loop answers with.
    pub fn to_protocol_error(&self) -> ProtocolError {
        match self {
            Self::ParseFailure(_) => ProtocolError::ParseError,
            Self::InvalidEnvelope { reason, .. } => ProtocolError::InvalidRequest(reason.clone()),
        }
    }

    /// Identifier to echo back; parse failures never have one.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::ParseFailure(_) => None,
            Self::InvalidEnvelope { id, .. } => id.clone(),
        }
    }
}

/// Errors raised by external collaborators (relational store, key-value store, log file).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{0} is not connected")]
    NotConnected(&'static str),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Domain '{0}' is not available in this build")]
    DomainUnavailable(&'static str),
}

/// Tool lookup, argument validation and execution errors.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(Cow<'static, str>),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Tool registered twice: {0}")]
    DuplicateTool(String),
}

impl ToolError {
    /// Short tag for the `kind` field of a tool failure's detail.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::MissingArgument(_) | Self::InvalidArguments(_) => "validation",
            Self::Collaborator(_) => "collaborator",
            Self::ExecutionFailed(_) => "execution",
            Self::DuplicateTool(_) => "registry",
        }
    }

    /// Converts a failure of `tool` into the protocol error sent to the client.
    pub fn into_protocol(self, tool: &str) -> ProtocolError {
        match self {
            Self::NotFound(name) => ProtocolError::MethodNotFound(name),
            Self::MissingArgument(_) | Self::InvalidArguments(_) => {
                ProtocolError::InvalidParams(self.to_string().into())
            }
            Self::Collaborator(_) | Self::ExecutionFailed(_) | Self::DuplicateTool(_) => {
                ProtocolError::ToolFailure {
                    detail: json!({ "tool": tool, "kind": self.kind() }),
                    message: self.to_string(),
                }
            }
        }
    }
}

/// Result type alias for McpError.
pub type Result<T> = std::result::Result<T, McpError>;

/// Result type alias for ProtocolError.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Result type alias for CollaboratorError.
pub type CollabResult<T> = std::result::Result<T, CollaboratorError>;

/// Result type alias for ToolError.
pub type ToolResult<T> = std::result::Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_codes() {
        assert_eq!(ProtocolError::ParseError.code(), -32700);
        assert_eq!(ProtocolError::InvalidRequest("test".into()).code(), -32600);
        assert_eq!(ProtocolError::MethodNotFound("test".into()).code(), -32601);
        assert_eq!(ProtocolError::InvalidParams("test".into()).code(), -32602);
        assert_eq!(ProtocolError::InternalError("test".into()).code(), -32603);
    }

    #[test]
    fn test_tool_error_mapping() {
        assert_eq!(
            ToolError::NotFound("nope".into()).into_protocol("nope").code(),
            -32601
        );
        assert_eq!(
            ToolError::MissingArgument("key".into())
                .into_protocol("redis_get")
                .code(),
            -32602
        );

        let failure = ToolError::Collaborator(CollaboratorError::QueryFailed("boom".into()))
            .into_protocol("database_query");
        assert_eq!(failure.code(), -32603);
        assert!(failure.to_string().contains("boom"));
        let data = failure.data().unwrap();
        assert_eq!(data["tool"], "database_query");
        assert_eq!(data["kind"], "collaborator");
    }

    #[test]
    fn test_decode_error_mapping() {
        let parse = DecodeError::ParseFailure("eof".into());
        assert_eq!(parse.to_protocol_error().code(), -32700);
        assert!(parse.request_id().is_none());

        let invalid = DecodeError::InvalidEnvelope {
            id: Some(RequestId::Number(4)),
            reason: "bad".into(),
        };
        assert_eq!(invalid.to_protocol_error().code(), -32600);
        assert_eq!(invalid.request_id(), Some(RequestId::Number(4)));
    }

    #[test]
    fn test_error_conversion() {
        let err = CollaboratorError::ConnectionFailed("refused".into());
        let mcp_error: McpError = err.into();
        assert!(matches!(mcp_error, McpError::Collaborator(_)));
    }
}
