//! In-memory collaborators for unit tests.

use crate::collaborator::{Collaborator, Endpoint};
use crate::database::{CellValue, FieldDescriptor, KeyRole, QueryResult, SqlBackend};
use crate::error::{CollabResult, CollaboratorError};
use crate::greeting::GreetingLog;
use crate::kv::{KeyTtl, KvBackend};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Connection bookkeeping shared by the stubs.
#[derive(Default)]
struct Lifecycle {
    connected: bool,
    fail_connect: bool,
    connects: usize,
    closes: usize,
    calls: AtomicUsize,
}

impl Lifecycle {
    fn connect(&mut self, name: &str) -> CollabResult<()> {
        if self.fail_connect {
            self.connected = false;
            return Err(CollaboratorError::ConnectionFailed(format!("{} refused", name)));
        }
        self.connected = true;
        self.connects += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.connected = false;
        self.closes += 1;
    }

    /// Counts the call and fails when disconnected.
    fn call(&self, name: &'static str) -> CollabResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.connected {
            Ok(())
        } else {
            Err(CollaboratorError::NotConnected(name))
        }
    }
}

macro_rules! lifecycle_accessors {
    ($stub:ty) => {
        impl $stub {
            pub fn failing_connect(mut self) -> Self {
                self.lifecycle.fail_connect = true;
                self
            }

            pub fn drop_connection(&mut self) {
                self.lifecycle.connected = false;
            }

            pub fn connects(&self) -> usize {
                self.lifecycle.connects
            }

            pub fn closes(&self) -> usize {
                self.lifecycle.closes
            }

            /// Capability calls made, connected or not.
            pub fn calls(&self) -> usize {
                self.lifecycle.calls.load(Ordering::SeqCst)
            }
        }
    };
}

macro_rules! stub_collaborator {
    ($stub:ty, $name:expr) => {
        #[async_trait]
        impl Collaborator for $stub {
            fn name(&self) -> &'static str {
                $name
            }

            async fn connect(&mut self) -> CollabResult<()> {
                self.lifecycle.connect($name)
            }

            async fn is_connected(&self) -> bool {
                self.lifecycle.connected
            }

            async fn close(&mut self) -> CollabResult<()> {
                self.lifecycle.close();
                Ok(())
            }

            fn endpoint(&self) -> Endpoint {
                Endpoint::network($name, "localhost", 0)
            }
        }
    };
}

/// Key-value stub: values with an optional TTL in seconds.
#[derive(Default)]
pub struct StubKv {
    lifecycle: Lifecycle,
    store: Mutex<BTreeMap<String, (String, Option<i64>)>>,
}

impl StubKv {
    pub fn new() -> Self {
        Self::default()
    }
}

lifecycle_accessors!(StubKv);
stub_collaborator!(StubKv, "stub-kv");

#[async_trait]
impl KvBackend for StubKv {
    async fn get(&self, key: &str) -> CollabResult<Option<String>> {
        self.lifecycle.call("stub-kv")?;
        let store = self.store.lock().unwrap();
        Ok(store.get(key).map(|(v, _)| v.clone()))
    }

    async fn set(&self, key: &str, value: &str, expiry: Option<Duration>) -> CollabResult<()> {
        self.lifecycle.call("stub-kv")?;
        let ttl = expiry.map(|d| d.as_secs() as i64);
        self.store
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CollabResult<u64> {
        self.lifecycle.call("stub-kv")?;
        let mut store = self.store.lock().unwrap();
        Ok(keys.iter().filter(|k| store.remove(*k).is_some()).count() as u64)
    }

    async fn keys(&self, pattern: &str) -> CollabResult<Vec<String>> {
        self.lifecycle.call("stub-kv")?;
        let prefix = pattern.trim_end_matches('*');
        let store = self.store.lock().unwrap();
        Ok(store
            .keys()
            .filter(|k| {
                if pattern.ends_with('*') {
                    k.starts_with(prefix)
                } else {
                    k.as_str() == pattern
                }
            })
            .cloned()
            .collect())
    }

    async fn key_type(&self, key: &str) -> CollabResult<String> {
        self.lifecycle.call("stub-kv")?;
        let store = self.store.lock().unwrap();
        Ok(if store.contains_key(key) { "string" } else { "none" }.to_string())
    }

    async fn ttl(&self, key: &str) -> CollabResult<KeyTtl> {
        self.lifecycle.call("stub-kv")?;
        let store = self.store.lock().unwrap();
        Ok(match store.get(key) {
            None => KeyTtl::Absent,
            Some((_, None)) => KeyTtl::Persistent,
            Some((_, Some(seconds))) => KeyTtl::Expires(*seconds),
        })
    }

    async fn info(&self, section: Option<&str>) -> CollabResult<String> {
        self.lifecycle.call("stub-kv")?;
        Ok(format!("# {}\r\nredis_version:stub\r\n", section.unwrap_or("Server")))
    }

    async fn dbsize(&self) -> CollabResult<u64> {
        self.lifecycle.call("stub-kv")?;
        Ok(self.store.lock().unwrap().len() as u64)
    }

    async fn flush(&self) -> CollabResult<()> {
        self.lifecycle.call("stub-kv")?;
        self.store.lock().unwrap().clear();
        Ok(())
    }

    /// Echoes the command and its arguments back.
    async fn raw_command(&self, command: &str, args: &[String]) -> CollabResult<Value> {
        self.lifecycle.call("stub-kv")?;
        let mut reply = vec![Value::from(command)];
        reply.extend(args.iter().map(|a| Value::from(a.as_str())));
        Ok(Value::Array(reply))
    }
}

/// Relational stub with a single `products` table.
#[derive(Default)]
pub struct StubSql {
    lifecycle: Lifecycle,
}

impl StubSql {
    pub fn new() -> Self {
        Self::default()
    }
}

lifecycle_accessors!(StubSql);
stub_collaborator!(StubSql, "stub-sql");

#[async_trait]
impl SqlBackend for StubSql {
    async fn query(&self, _sql: &str) -> CollabResult<QueryResult> {
        self.lifecycle.call("stub-sql")?;
        Ok(QueryResult::new(
            vec!["id".into(), "name".into()],
            vec![vec![CellValue::Int(1), CellValue::from("widget")]],
        ))
    }

    async fn list_tables(&self) -> CollabResult<Vec<String>> {
        self.lifecycle.call("stub-sql")?;
        Ok(vec!["products".into()])
    }

    async fn table_schema(&self, table: &str) -> CollabResult<Vec<FieldDescriptor>> {
        self.lifecycle.call("stub-sql")?;
        if table != "products" {
            return Err(CollaboratorError::TableNotFound(table.to_string()));
        }
        Ok(vec![FieldDescriptor {
            name: "id".into(),
            data_type: "integer".into(),
            nullable: false,
            key: KeyRole::Primary,
            default: None,
            extra: "identity".into(),
        }])
    }
}

/// Greeting log stub that keeps lines in memory.
#[derive(Default)]
pub struct StubGreetingLog {
    lifecycle: Lifecycle,
    lines: Vec<String>,
}

impl StubGreetingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

lifecycle_accessors!(StubGreetingLog);
stub_collaborator!(StubGreetingLog, "stub-log");

#[async_trait]
impl GreetingLog for StubGreetingLog {
    async fn append(&mut self, line: &str) -> CollabResult<()> {
        self.lifecycle.call("stub-log")?;
        self.lines.push(line.to_string());
        Ok(())
    }
}
