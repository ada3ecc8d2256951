//! MCP server implementation.

pub mod handler;
pub mod state;

pub use handler::ToolboxHandler;
pub use state::{HandshakeState, SessionState};
