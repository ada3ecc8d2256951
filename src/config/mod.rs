//! Configuration types and builders.
//!
//! Everything is read from environment variables; there are no config files.
//! Builders take a lookup function so tests never touch the process
//! environment.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which tool set this server instance exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    #[default]
    Greeting,
    Sql,
    Kv,
}

impl Domain {
    /// Parse a domain from a string.
    ///
    /// Accepts common aliases for each domain.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "greeting" | "hello" => Some(Self::Greeting),
            "sql" | "database" | "db" => Some(Self::Sql),
            "kv" | "redis" => Some(Self::Kv),
            _ => None,
        }
    }

    /// Server name announced in the `initialize` result.
    pub fn server_name(self) -> &'static str {
        match self {
            Self::Greeting => "hello-mcp-server",
            Self::Sql => "database-mcp-server",
            Self::Kv => "redis-mcp-server",
        }
    }
}

impl TryFrom<&str> for Domain {
    type Error = ConfigError;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        Self::parse(s).ok_or_else(|| ConfigError::InvalidValue {
            field: "MCP_DOMAIN".into(),
            message: format!(
                "Unknown domain: '{}'. Valid domains: greeting, hello, sql, database, db, kv, redis",
                s
            )
            .into(),
        })
    }
}

/// Reads one variable and parses it, naming the variable on failure.
fn parse_var<T, F>(lookup: &F, key: &'static str) -> std::result::Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: key.into(),
                message: format!("cannot parse '{}'", raw).into(),
            }),
    }
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Relational store connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub pool_size: usize,
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            database: "postgres".into(),
            username: "postgres".into(),
            password: String::new(),
            pool_size: 25,
            connect_timeout: Duration::from_secs(5),
            query_timeout: Duration::from_secs(30),
        }
    }
}

impl DatabaseConfig {
    pub fn builder() -> DatabaseConfigBuilder {
        DatabaseConfigBuilder::default()
    }
}

/// Builder for DatabaseConfig with fluent API.
#[derive(Default)]
pub struct DatabaseConfigBuilder {
    config: DatabaseConfig,
}

impl DatabaseConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = database.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Overlays `DATABASE_*` variables read through `lookup`.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(mut self, lookup: F) -> Result<Self> {
        if let Some(host) = lookup("DATABASE_HOST") {
            self.config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "DATABASE_PORT")? {
            self.config.port = port;
        }
        if let Some(database) = lookup("DATABASE_NAME") {
            self.config.database = database;
        }
        if let Some(username) = lookup("DATABASE_USER") {
            self.config.username = username;
        }
        if let Some(password) = lookup("DATABASE_PASSWORD") {
            self.config.password = password;
        }
        if let Some(pool_size) = parse_var(&lookup, "DATABASE_POOL_SIZE")? {
            self.config.pool_size = pool_size;
        }
        if let Some(secs) = parse_var(&lookup, "DATABASE_CONNECT_TIMEOUT_SECS")? {
            self.config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var(&lookup, "DATABASE_QUERY_TIMEOUT_SECS")? {
            self.config.query_timeout = Duration::from_secs(secs);
        }
        Ok(self)
    }

    pub fn build(self) -> Result<DatabaseConfig> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> Result<()> {
        if self.config.host.is_empty() {
            return Err(ConfigError::MissingField("host".into()).into());
        }
        if self.config.database.is_empty() {
            return Err(ConfigError::MissingField("database".into()).into());
        }
        if self.config.username.is_empty() {
            return Err(ConfigError::MissingField("username".into()).into());
        }
        if self.config.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".into(),
                message: "Port must be greater than 0".into(),
            }
            .into());
        }
        if self.config.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool_size".into(),
                message: "Pool size must be greater than 0".into(),
            }
            .into());
        }
        Ok(())
    }
}

/// Key-value store connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub db: i64,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6379,
            password: String::new(),
            db: 0,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(10),
        }
    }
}

impl KvConfig {
    pub fn builder() -> KvConfigBuilder {
        KvConfigBuilder::default()
    }

    /// `host:port`, for logs.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Default)]
pub struct KvConfigBuilder {
    config: KvConfig,
}

impl KvConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn db(mut self, db: i64) -> Self {
        self.config.db = db;
        self
    }

    /// Overlays `REDIS_*` variables read through `lookup`.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(mut self, lookup: F) -> Result<Self> {
        if let Some(host) = lookup("REDIS_HOST") {
            self.config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "REDIS_PORT")? {
            self.config.port = port;
        }
        if let Some(password) = lookup("REDIS_PASSWORD") {
            self.config.password = password;
        }
        if let Some(db) = parse_var(&lookup, "REDIS_DB")? {
            self.config.db = db;
        }
        if let Some(secs) = parse_var(&lookup, "REDIS_CONNECT_TIMEOUT_SECS")? {
            self.config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var(&lookup, "REDIS_COMMAND_TIMEOUT_SECS")? {
            self.config.command_timeout = Duration::from_secs(secs);
        }
        Ok(self)
    }

    pub fn build(self) -> Result<KvConfig> {
        if self.config.host.is_empty() {
            return Err(ConfigError::MissingField("host".into()).into());
        }
        if self.config.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".into(),
                message: "Port must be greater than 0".into(),
            }
            .into());
        }
        if self.config.db < 0 {
            return Err(ConfigError::InvalidValue {
                field: "db".into(),
                message: "Database index must not be negative".into(),
            }
            .into());
        }
        Ok(self.config)
    }
}

/// Greeting log configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreetingConfig {
    pub log_file: PathBuf,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("hello_log.txt"),
        }
    }
}

impl GreetingConfig {
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        match lookup("GREETING_LOG_FILE") {
            None => Ok(Self::default()),
            Some(path) if path.trim().is_empty() => {
                Err(ConfigError::MissingField("GREETING_LOG_FILE".into()).into())
            }
            Some(path) => Ok(Self {
                log_file: PathBuf::from(path),
            }),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub version: Cow<'static, str>,
    pub domain: Domain,
    pub database: DatabaseConfig,
    pub kv: KvConfig,
    pub greeting: GreetingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").into(),
            domain: Domain::default(),
            database: DatabaseConfig::default(),
            kv: KvConfig::default(),
            greeting: GreetingConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn name(&self) -> &'static str {
        self.domain.server_name()
    }

    /// Build from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Only the selected domain's settings are read and validated.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let domain = match lookup("MCP_DOMAIN") {
            Some(raw) => Domain::try_from(raw.as_str())?,
            None => Domain::default(),
        };

        let mut config = Self {
            domain,
            ..Self::default()
        };

        match domain {
            Domain::Greeting => config.greeting = GreetingConfig::from_lookup(&lookup)?,
            Domain::Sql => {
                config.database = DatabaseConfig::builder().from_lookup(&lookup)?.build()?
            }
            Domain::Kv => config.kv = KvConfig::builder().from_lookup(&lookup)?.build()?,
        }

        Ok(config)
    }
}
