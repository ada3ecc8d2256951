//! Connection status tool shared by the SQL and key-value tool sets.

use crate::collaborator::{Collaborator, Endpoint, Link};
use crate::error::ToolResult;
use crate::protocol::{CallToolResult, Tool};
use crate::tools::args::Arguments;
use crate::tools::registry::{json_result, ToolHandler};
use crate::tools::schema::InputSchema;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{instrument, warn};

#[derive(Debug, Serialize)]
struct StatusOutput {
    connected: bool,
    endpoint: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Reports connectivity; when the link is down it tries one reconnection.
pub struct ConnectionStatusTool {
    name: &'static str,
    description: &'static str,
}

impl ConnectionStatusTool {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

#[async_trait]
impl<C: Collaborator> ToolHandler<C> for ConnectionStatusTool {
    fn definition(&self) -> Tool {
        Tool {
            name: self.name.into(),
            description: self.description.into(),
            input_schema: InputSchema::object(),
        }
    }

    fn requires_connection(&self) -> bool {
        false
    }

    #[instrument(skip(self, _args, link), fields(tool = self.name))]
    async fn execute(&self, _args: &Arguments, link: &mut Link<C>) -> ToolResult<CallToolResult> {
        let error = match link.ensure_connected().await {
            Ok(()) => None,
            Err(e) => {
                warn!("Status check could not reconnect: {}", e);
                Some(e.to_string())
            }
        };

        json_result(&StatusOutput {
            connected: error.is_none(),
            endpoint: link.backend().endpoint(),
            error,
        })
    }
}
