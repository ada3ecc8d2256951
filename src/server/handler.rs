//! MCP request handler implementation.

use crate::collaborator::{Collaborator, Link, LinkState};
use crate::error::{ProtocolResult, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, Handler, InitializeParams, InitializeResult, ListToolsResult,
    ServerCapabilities, ServerInfo, ToolsCapability, MCP_VERSION,
};
use crate::server::state::SessionState;
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Handler for one domain: owns the tool registry, the collaborator link and
/// the handshake state.
pub struct ToolboxHandler<C: Collaborator> {
    server_info: ServerInfo,
    registry: ToolRegistry<C>,
    link: Link<C>,
    session: SessionState,
}

impl<C: Collaborator> ToolboxHandler<C> {
    pub fn new(server_info: ServerInfo, registry: ToolRegistry<C>, backend: C) -> Self {
        Self {
            server_info,
            registry,
            link: Link::new(backend),
            session: SessionState::new(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn link(&self) -> &Link<C> {
        &self.link
    }

    pub fn registry(&self) -> &ToolRegistry<C> {
        &self.registry
    }

    fn instructions(&self) -> String {
        let state = match self.link.state() {
            LinkState::Connected => "connected",
            LinkState::Disconnected => "not connected, will retry on first tool use",
        };
        format!(
            "{} ({} {}). Available tools: {}.",
            self.server_info.name,
            self.link.backend().name(),
            state,
            self.registry.names().join(", ")
        )
    }
}

#[async_trait]
impl<C: Collaborator + 'static> Handler for ToolboxHandler<C> {
    async fn initialize(&mut self, params: InitializeParams) -> ProtocolResult<InitializeResult> {
        info!(
            "Initialize request from {} v{} (protocol {})",
            params.client_info.name, params.client_info.version, params.protocol_version
        );
        debug!("Client capabilities: {:?}", params.capabilities);

        // A collaborator that is down does not fail the handshake
        if let Err(e) = self.link.ensure_connected().await {
            warn!(
                "{} unavailable during initialize, will retry lazily: {}",
                self.link.backend().name(),
                e
            );
        }

        self.session.set_ready(params.client_info);

        Ok(InitializeResult {
            protocol_version: MCP_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: self.server_info.clone(),
            instructions: Some(self.instructions()),
        })
    }

    async fn initialized(&mut self) {
        info!("Server initialized successfully");
        self.session.mark_notified();
    }

    async fn list_tools(&mut self) -> ProtocolResult<ListToolsResult> {
        let tools = self.registry.list();
        debug!("Listing {} tools", tools.len());
        Ok(ListToolsResult { tools })
    }

    async fn call_tool(&mut self, params: CallToolParams) -> ProtocolResult<CallToolResult> {
        let CallToolParams { name, arguments } = params;
        let seq = self.session.next_request_id();
        debug!(seq, "Tool call: {}", name);

        self.registry
            .invoke(&name, arguments, &mut self.link)
            .await
            .map_err(|e| {
                warn!(seq, kind = e.kind(), "Tool {} failed: {}", name, e);
                e.into_protocol(&name)
            })
    }

    async fn shutdown(&mut self) -> Result<()> {
        info!(
            "Shutting down after {} tool calls",
            self.session.request_count()
        );
        self.link.close().await?;
        Ok(())
    }
}
