//! MCP server stream loop.

use crate::error::Result;
use crate::protocol::codec;
use crate::protocol::handler::{Dispatcher, Handler};
use crate::protocol::transport::{StdioTransport, Transport};
use crate::protocol::types::{Envelope, JsonRpcError};
use tracing::{debug, info, instrument, warn};

/// Loop lifecycle, tracked for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Server created, not reading yet.
    Created,
    /// Reading and answering lines.
    Running,
    /// End-of-stream or fatal I/O error reached; collaborator closed.
    Stopped,
}

/// MCP Server: reads envelopes line by line and answers them in order.
pub struct McpServer<H: Handler> {
    dispatcher: Dispatcher<H>,
    state: LoopState,
}

impl<H: Handler> McpServer<H> {
    pub fn new(handler: H) -> Self {
        Self {
            dispatcher: Dispatcher::new(handler),
            state: LoopState::Created,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn handler(&self) -> &H {
        self.dispatcher.handler()
    }

    /// Run the server with stdio transport.
    pub async fn run(&mut self) -> Result<()> {
        let mut transport = StdioTransport::stdio();
        self.run_with_transport(&mut transport).await
    }

    /// Run the server with a custom transport until end-of-stream.
    ///
    /// The collaborator is closed on every exit path; a read or write failure
    /// is returned after teardown.
    #[instrument(skip(self, transport))]
    pub async fn run_with_transport<T: Transport>(&mut self, transport: &mut T) -> Result<()> {
        info!("MCP server loop started");
        self.state = LoopState::Running;

        let outcome = self.serve(transport).await;

        if let Err(e) = self.dispatcher.shutdown().await {
            warn!("Failed to close collaborator: {}", e);
        }
        self.state = LoopState::Stopped;
        info!("MCP server loop stopped");

        outcome
    }

    async fn serve<T: Transport>(&mut self, transport: &mut T) -> Result<()> {
        while let Some(line) = transport.read_line().await? {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let response = match codec::decode_bytes(&line) {
                Ok(envelope) => self.dispatcher.dispatch(envelope).await,
                Err(e) => {
                    warn!("Failed to decode message: {}", e);
                    let error = JsonRpcError::from(&e.to_protocol_error());
                    Some(Envelope::failure(e.request_id(), error))
                }
            };

            if let Some(response) = response {
                transport.write_line(&codec::encode(&response)).await?;
            }
        }

        debug!("EOF received, shutting down");
        Ok(())
    }
}
