//! MCP server binary entry point.

use anyhow::Result;
use mcp_toolbox::{
    collaborator::Collaborator,
    config::{Domain, ServerConfig},
    greeting::FileGreetingLog,
    protocol::{McpServer, ServerInfo},
    server::ToolboxHandler,
    tools::{self, ToolRegistry},
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = ServerConfig::from_env()?;
    info!("Serving the {:?} domain as {}", config.domain, config.name());

    match config.domain {
        Domain::Greeting => {
            let log = FileGreetingLog::new(config.greeting.clone());
            serve(&config, tools::create_greeting_registry()?, log).await
        }
        Domain::Sql => serve_sql(&config).await,
        Domain::Kv => serve_kv(&config).await,
    }
}

#[cfg(feature = "sql")]
async fn serve_sql(config: &ServerConfig) -> Result<()> {
    use mcp_toolbox::database::PostgresBackend;

    info!(
        "Database at {}:{}/{}",
        config.database.host, config.database.port, config.database.database
    );
    let backend = PostgresBackend::new(config.database.clone());
    serve(config, tools::create_sql_registry()?, backend).await
}

#[cfg(not(feature = "sql"))]
async fn serve_sql(_config: &ServerConfig) -> Result<()> {
    Err(mcp_toolbox::error::ConfigError::DomainUnavailable("sql").into())
}

#[cfg(feature = "kv")]
async fn serve_kv(config: &ServerConfig) -> Result<()> {
    use mcp_toolbox::kv::RedisBackend;

    info!("Redis at {} (db {})", config.kv.addr(), config.kv.db);
    let backend = RedisBackend::new(config.kv.clone());
    serve(config, tools::create_kv_registry()?, backend).await
}

#[cfg(not(feature = "kv"))]
async fn serve_kv(_config: &ServerConfig) -> Result<()> {
    Err(mcp_toolbox::error::ConfigError::DomainUnavailable("kv").into())
}

async fn serve<C: Collaborator + 'static>(
    config: &ServerConfig,
    registry: ToolRegistry<C>,
    backend: C,
) -> Result<()> {
    info!("Registered {} tools", registry.len());

    let server_info = ServerInfo {
        name: config.name().to_string(),
        version: config.version.to_string(),
    };
    let mut server = McpServer::new(ToolboxHandler::new(server_info, registry, backend));

    info!("MCP server ready, waiting for requests on stdin");

    if let Err(e) = server.run().await {
        warn!("Server stopped with an error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mcp_toolbox=info,warn"));

    // JSON to stderr; stdout carries protocol lines only
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .init();
}
