//! Redis backend using a multiplexed `redis` connection.

use crate::collaborator::{Collaborator, Endpoint};
use crate::config::KvConfig;
use crate::error::{CollabResult, CollaboratorError};
use crate::kv::traits::{KeyTtl, KvBackend};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Cmd, FromRedisValue, IntoConnectionInfo, Value as RedisValue};
use serde_json::{Map, Number, Value};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis backend. The connection exists only while connected.
pub struct RedisBackend {
    config: KvConfig,
    connection: Option<MultiplexedConnection>,
}

impl RedisBackend {
    pub fn new(config: KvConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    fn connection(&self) -> CollabResult<MultiplexedConnection> {
        self.connection
            .clone()
            .ok_or(CollaboratorError::NotConnected("redis"))
    }

    /// Runs one command under the configured command budget.
    async fn run<T: FromRedisValue>(&self, cmd: &Cmd) -> CollabResult<T> {
        let mut conn = self.connection()?;
        let budget = self.config.command_timeout;
        let reply: redis::RedisResult<T> = timeout(budget, cmd.query_async(&mut conn))
            .await
            .map_err(|_| CollaboratorError::Timeout(budget.as_millis() as u64))?;
        reply.map_err(|e| CollaboratorError::CommandFailed(e.to_string()))
    }
}

/// Converts a native reply into JSON.
pub fn reply_to_json(reply: RedisValue) -> Value {
    match reply {
        RedisValue::Nil => Value::Null,
        RedisValue::Int(n) => Value::from(n),
        RedisValue::BulkString(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        RedisValue::SimpleString(s) => Value::String(s),
        RedisValue::Okay => Value::String("OK".into()),
        RedisValue::Array(items) | RedisValue::Set(items) => {
            Value::Array(items.into_iter().map(reply_to_json).collect())
        }
        RedisValue::Map(pairs) => map_to_json(pairs),
        RedisValue::Double(d) => Number::from_f64(d).map_or(Value::Null, Value::Number),
        RedisValue::Boolean(b) => Value::Bool(b),
        RedisValue::VerbatimString { text, .. } => Value::String(text),
        other => Value::String(format!("{:?}", other)),
    }
}

/// Maps with text keys become objects; anything else a list of pairs.
fn map_to_json(pairs: Vec<(RedisValue, RedisValue)>) -> Value {
    let pairs: Vec<(Value, Value)> = pairs
        .into_iter()
        .map(|(k, v)| (reply_to_json(k), reply_to_json(v)))
        .collect();

    if pairs.iter().all(|(k, _)| k.is_string()) {
        let mut object = Map::with_capacity(pairs.len());
        for (k, v) in pairs {
            if let Value::String(k) = k {
                object.insert(k, v);
            }
        }
        Value::Object(object)
    } else {
        Value::Array(
            pairs
                .into_iter()
                .map(|(k, v)| Value::Array(vec![k, v]))
                .collect(),
        )
    }
}

#[async_trait]
impl Collaborator for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn connect(&mut self) -> CollabResult<()> {
        self.connection = None;
        info!("Connecting to Redis: {}", self.config.addr());

        let mut info = (self.config.host.as_str(), self.config.port)
            .into_connection_info()
            .map_err(|e| CollaboratorError::ConnectionFailed(e.to_string()))?;
        info.redis.db = self.config.db;
        if !self.config.password.is_empty() {
            info.redis.password = Some(self.config.password.clone());
        }

        let client = redis::Client::open(info)
            .map_err(|e| CollaboratorError::ConnectionFailed(e.to_string()))?;

        let wait = self.config.connect_timeout;
        let mut conn = timeout(wait, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CollaboratorError::Timeout(wait.as_millis() as u64))?
            .map_err(|e| CollaboratorError::ConnectionFailed(e.to_string()))?;

        let pong: redis::RedisResult<String> = timeout(wait, redis::cmd("PING").query_async(&mut conn))
            .await
            .map_err(|_| CollaboratorError::Timeout(wait.as_millis() as u64))?;
        pong.map_err(|e| CollaboratorError::ConnectionFailed(e.to_string()))?;

        info!("Successfully connected to Redis: {}", self.config.addr());
        self.connection = Some(conn);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        let Some(mut conn) = self.connection.clone() else {
            return false;
        };
        let ping: Result<redis::RedisResult<String>, _> =
            timeout(PING_TIMEOUT, redis::cmd("PING").query_async(&mut conn)).await;
        matches!(ping, Ok(Ok(_)))
    }

    async fn close(&mut self) -> CollabResult<()> {
        if self.connection.take().is_some() {
            debug!("Redis connection dropped");
        }
        Ok(())
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::network("redis", self.config.host.clone(), self.config.port)
            .with_database(self.config.db.to_string())
    }
}

/// `PX` argument; `PX 0` is rejected by the server, so it never goes out.
fn expiry_millis(expiry: Duration) -> u64 {
    (expiry.as_millis() as u64).max(1)
}

#[async_trait]
impl KvBackend for RedisBackend {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> CollabResult<Option<String>> {
        self.run(redis::cmd("GET").arg(key)).await
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str, expiry: Option<Duration>) -> CollabResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(expiry) = expiry {
            cmd.arg("PX").arg(expiry_millis(expiry));
        }
        self.run(&cmd).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, keys: &[String]) -> CollabResult<u64> {
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(key);
        }
        self.run(&cmd).await
    }

    #[instrument(skip(self))]
    async fn keys(&self, pattern: &str) -> CollabResult<Vec<String>> {
        self.run(redis::cmd("KEYS").arg(pattern)).await
    }

    #[instrument(skip(self))]
    async fn key_type(&self, key: &str) -> CollabResult<String> {
        self.run(redis::cmd("TYPE").arg(key)).await
    }

    #[instrument(skip(self))]
    async fn ttl(&self, key: &str) -> CollabResult<KeyTtl> {
        let seconds: i64 = self.run(redis::cmd("TTL").arg(key)).await?;
        Ok(KeyTtl::from_reply(seconds))
    }

    #[instrument(skip(self))]
    async fn info(&self, section: Option<&str>) -> CollabResult<String> {
        let mut cmd = redis::cmd("INFO");
        if let Some(section) = section {
            cmd.arg(section);
        }
        self.run(&cmd).await
    }

    async fn dbsize(&self) -> CollabResult<u64> {
        self.run(&redis::cmd("DBSIZE")).await
    }

    #[instrument(skip(self))]
    async fn flush(&self) -> CollabResult<()> {
        self.run(&redis::cmd("FLUSHDB")).await
    }

    #[instrument(skip(self, args))]
    async fn raw_command(&self, command: &str, args: &[String]) -> CollabResult<Value> {
        let mut cmd = redis::cmd(command);
        for arg in args {
            cmd.arg(arg);
        }
        let reply: RedisValue = self.run(&cmd).await?;
        Ok(reply_to_json(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_to_json() {
        assert_eq!(reply_to_json(RedisValue::Nil), Value::Null);
        assert_eq!(reply_to_json(RedisValue::Int(7)), json!(7));
        assert_eq!(reply_to_json(RedisValue::Okay), json!("OK"));
        assert_eq!(
            reply_to_json(RedisValue::BulkString(b"hello".to_vec())),
            json!("hello")
        );
        assert_eq!(
            reply_to_json(RedisValue::Array(vec![
                RedisValue::SimpleString("a".into()),
                RedisValue::Int(1),
                RedisValue::Nil,
            ])),
            json!(["a", 1, null])
        );
    }

    #[test]
    fn test_map_reply() {
        let text_keys = RedisValue::Map(vec![(
            RedisValue::BulkString(b"field".to_vec()),
            RedisValue::Int(1),
        )]);
        assert_eq!(reply_to_json(text_keys), json!({"field": 1}));

        let int_keys = RedisValue::Map(vec![(RedisValue::Int(1), RedisValue::Boolean(true))]);
        assert_eq!(reply_to_json(int_keys), json!([[1, true]]));
    }

    #[test]
    fn test_expiry_millis_never_zero() {
        assert_eq!(expiry_millis(Duration::from_micros(500)), 1);
        assert_eq!(expiry_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(expiry_millis(Duration::from_secs(60)), 60_000);
    }

    #[tokio::test]
    async fn test_commands_need_connection() {
        let backend = RedisBackend::new(KvConfig::default());
        assert!(!backend.is_connected().await);
        assert!(matches!(
            backend.get("a").await,
            Err(CollaboratorError::NotConnected("redis"))
        ));
    }

    #[test]
    fn test_endpoint_has_no_password() {
        let config = KvConfig::builder().password("s3cret").db(2).build().unwrap();
        let endpoint = RedisBackend::new(config).endpoint();
        assert_eq!(endpoint.database.as_deref(), Some("2"));
        assert!(!serde_json::to_string(&endpoint).unwrap().contains("s3cret"));
    }
}
