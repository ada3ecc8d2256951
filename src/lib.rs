//! Minimal MCP tool server over stdio.
//!
//! One process serves one domain: a greeting tool backed by a log file, a
//! PostgreSQL tool set, or a Redis tool set. Requests arrive as newline
//! delimited JSON-RPC 2.0 envelopes and are answered in order.
//!
//! # Example
//!
//! ```no_run
//! use mcp_toolbox::{
//!     config::GreetingConfig,
//!     greeting::FileGreetingLog,
//!     protocol::{McpServer, ServerInfo},
//!     server::ToolboxHandler,
//!     tools::create_greeting_registry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let handler = ToolboxHandler::new(
//!         ServerInfo {
//!             name: "hello-mcp-server".into(),
//!             version: env!("CARGO_PKG_VERSION").into(),
//!         },
//!         create_greeting_registry()?,
//!         FileGreetingLog::new(GreetingConfig::default()),
//!     );
//!
//!     // Serves until stdin closes
//!     McpServer::new(handler).run().await?;
//!     Ok(())
//! }
//! ```

pub mod collaborator;
pub mod config;
pub mod database;
pub mod error;
pub mod greeting;
pub mod kv;
pub mod protocol;
pub mod server;
pub mod tools;

#[cfg(test)]
mod testing;

pub use collaborator::{Collaborator, Endpoint, Link, LinkState};
pub use config::{DatabaseConfig, Domain, GreetingConfig, KvConfig, ServerConfig};
pub use error::{McpError, Result};
pub use protocol::McpServer;
pub use server::ToolboxHandler;
pub use tools::ToolRegistry;
