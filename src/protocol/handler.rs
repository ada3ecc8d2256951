//! Request handler trait and method dispatcher.

use crate::error::{ProtocolError, ProtocolResult, Result};
use crate::protocol::types::*;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Handler trait for processing MCP requests.
#[async_trait]
pub trait Handler: Send {
    /// Handle initialize request.
    async fn initialize(&mut self, params: InitializeParams) -> ProtocolResult<InitializeResult>;

    /// Handle initialized notification.
    async fn initialized(&mut self);

    /// List available tools.
    async fn list_tools(&mut self) -> ProtocolResult<ListToolsResult>;

    /// Call a tool.
    async fn call_tool(&mut self, params: CallToolParams) -> ProtocolResult<CallToolResult>;

    /// Release collaborator resources at end-of-stream.
    async fn shutdown(&mut self) -> Result<()>;
}

/// Method dispatcher that routes envelopes to the handler and builds responses.
pub struct Dispatcher<H: Handler> {
    handler: H,
}

impl<H: Handler> Dispatcher<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Dispatches one envelope; `None` means nothing is written back.
    #[instrument(skip(self, envelope), fields(method = envelope.method.as_deref().unwrap_or("-")))]
    pub async fn dispatch(&mut self, envelope: Envelope) -> Option<Envelope> {
        let Some(method) = envelope.method else {
            warn!("Unexpected response received: {:?}", envelope.id);
            return None;
        };

        debug!("Dispatching {} (id={:?})", method, envelope.id);

        let result = match method.as_str() {
            "initialize" => self.handle_initialize(envelope.params).await,
            "initialized" => {
                self.handler.initialized().await;
                return None;
            }
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(envelope.params).await,
            other => {
                warn!("Unknown method: {}", other);
                Err(ProtocolError::MethodNotFound(other.to_string()))
            }
        };

        Some(match result {
            Ok(value) => Envelope::success(envelope.id, value),
            Err(e) => {
                warn!(code = e.code(), "Request failed: {}", e);
                Envelope::failure(envelope.id, JsonRpcError::from(&e))
            }
        })
    }

    async fn handle_initialize(&mut self, params: Option<Value>) -> ProtocolResult<Value> {
        let params: InitializeParams = decode_params(params)?;
        let result = self.handler.initialize(params).await?;
        to_result(&result)
    }

    async fn handle_list_tools(&mut self) -> ProtocolResult<Value> {
        let result = self.handler.list_tools().await?;
        to_result(&result)
    }

    async fn handle_call_tool(&mut self, params: Option<Value>) -> ProtocolResult<Value> {
        let params: CallToolParams = decode_params(params)?;
        let result = self.handler.call_tool(params).await?;
        to_result(&result)
    }

    /// Collaborator teardown, forwarded to the handler.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.handler.shutdown().await
    }
}

fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> ProtocolResult<T> {
    let params = params.ok_or_else(|| ProtocolError::InvalidParams("Missing params".into()))?;
    serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams(e.to_string().into()))
}

fn to_result<T: Serialize>(result: &T) -> ProtocolResult<Value> {
    serde_json::to_value(result).map_err(|e| ProtocolError::InternalError(e.to_string().into()))
}
