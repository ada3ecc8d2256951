//! Key-value store capability trait.

use crate::collaborator::Collaborator;
use crate::error::CollabResult;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Remaining lifetime of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Expires in the given number of seconds.
    Expires(i64),
    /// Exists without an expiry.
    Persistent,
    /// No such key.
    Absent,
}

impl KeyTtl {
    /// Interprets a `TTL` reply: -1 means no expiry, -2 means no key.
    pub fn from_reply(seconds: i64) -> Self {
        match seconds {
            -2 => Self::Absent,
            -1 => Self::Persistent,
            n => Self::Expires(n),
        }
    }

    /// The reply form, sentinels included.
    pub fn seconds(self) -> i64 {
        match self {
            Self::Expires(n) => n,
            Self::Persistent => -1,
            Self::Absent => -2,
        }
    }

    pub fn state(self) -> &'static str {
        match self {
            Self::Expires(_) => "expiring",
            Self::Persistent => "persistent",
            Self::Absent => "absent",
        }
    }
}

/// Capabilities the key-value tools need from a store.
///
/// Implementations: [`RedisBackend`](crate::kv::RedisBackend).
#[async_trait]
pub trait KvBackend: Collaborator {
    /// Value of `key`, `None` when the key does not exist.
    async fn get(&self, key: &str) -> CollabResult<Option<String>>;

    /// Stores `value`; `expiry` of `None` keeps the key forever.
    async fn set(&self, key: &str, value: &str, expiry: Option<Duration>) -> CollabResult<()>;

    /// Removes `keys`, returning how many existed.
    async fn delete(&self, keys: &[String]) -> CollabResult<u64>;

    /// Keys matching a glob pattern.
    async fn keys(&self, pattern: &str) -> CollabResult<Vec<String>>;

    /// Type tag of `key` (`string`, `list`, ..., `none`).
    async fn key_type(&self, key: &str) -> CollabResult<String>;

    async fn ttl(&self, key: &str) -> CollabResult<KeyTtl>;

    /// Server information text, optionally limited to one section.
    async fn info(&self, section: Option<&str>) -> CollabResult<String>;

    async fn dbsize(&self) -> CollabResult<u64>;

    /// Removes every key of the selected database.
    async fn flush(&self) -> CollabResult<()>;

    /// Runs an arbitrary command and returns its reply as JSON.
    async fn raw_command(&self, command: &str, args: &[String]) -> CollabResult<Value>;
}
