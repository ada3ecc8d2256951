//! MCP protocol implementation over JSON-RPC 2.0.

pub mod codec;
pub mod handler;
pub mod server;
pub mod transport;
pub mod types;

pub use codec::{decode, decode_bytes, encode};
pub use handler::{Dispatcher, Handler};
pub use server::{LoopState, McpServer};
pub use transport::{LineTransport, StdioTransport, Transport};
pub use types::*;
