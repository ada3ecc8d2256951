//! External collaborator lifecycle.
//!
//! A collaborator is anything a tool reaches outside the process: the
//! relational store, the key-value store, the greeting log file. The
//! [`Link`] owns one collaborator for the lifetime of the server and tracks
//! its connection state, reconnecting lazily before tools that need it.

use crate::error::{CollabResult, CollaboratorError};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Connection lifecycle shared by every collaborator.
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Short name used in logs and errors (e.g. "postgres", "redis").
    fn name(&self) -> &'static str;

    /// Opens the connection, replacing any previous one.
    async fn connect(&mut self) -> CollabResult<()>;

    /// Checks connectivity. May perform a round trip with a bounded wait.
    async fn is_connected(&self) -> bool;

    /// Releases the connection. Closing a closed collaborator is a no-op.
    async fn close(&mut self) -> CollabResult<()>;

    /// Where the collaborator points, without secrets.
    fn endpoint(&self) -> Endpoint;
}

/// Endpoint and credential summary; never carries a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Endpoint {
    pub fn network(kind: &'static str, host: impl Into<String>, port: u16) -> Self {
        Self {
            kind,
            host: Some(host.into()),
            port: Some(port),
            database: None,
            username: None,
            path: None,
        }
    }

    pub fn file(kind: &'static str, path: impl Into<String>) -> Self {
        Self {
            kind,
            host: None,
            port: None,
            database: None,
            username: None,
            path: Some(path.into()),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// Owned handle to the server's single collaborator.
pub struct Link<C> {
    backend: C,
    state: LinkState,
}

impl<C: Collaborator> Link<C> {
    pub fn new(backend: C) -> Self {
        Self {
            backend,
            state: LinkState::Disconnected,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut C {
        &mut self.backend
    }

    pub async fn connect(&mut self) -> CollabResult<()> {
        info!("Connecting to {}", self.backend.name());
        match self.backend.connect().await {
            Ok(()) => {
                self.state = LinkState::Connected;
                info!("Connected to {}", self.backend.name());
                Ok(())
            }
            Err(e) => {
                self.state = LinkState::Disconnected;
                warn!("Connection to {} failed: {}", self.backend.name(), e);
                Err(e)
            }
        }
    }

    /// Reconnects if the link is down or the backend stopped answering.
    pub async fn ensure_connected(&mut self) -> CollabResult<()> {
        if self.state == LinkState::Connected {
            if self.backend.is_connected().await {
                return Ok(());
            }
            debug!("{} stopped answering, reconnecting", self.backend.name());
            self.state = LinkState::Disconnected;
        }

        self.connect().await.map_err(|e| match e {
            CollaboratorError::ConnectionFailed(_) | CollaboratorError::Timeout(_) => e,
            other => CollaboratorError::ConnectionFailed(other.to_string()),
        })
    }

    pub async fn close(&mut self) -> CollabResult<()> {
        if self.state == LinkState::Disconnected {
            return Ok(());
        }
        self.state = LinkState::Disconnected;
        info!("Closing {}", self.backend.name());
        self.backend.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubKv;

    #[tokio::test]
    async fn test_lazy_connect() {
        let mut link = Link::new(StubKv::new());
        assert_eq!(link.state(), LinkState::Disconnected);

        link.ensure_connected().await.unwrap();
        assert_eq!(link.state(), LinkState::Connected);
        assert_eq!(link.backend().connects(), 1);

        link.ensure_connected().await.unwrap();
        assert_eq!(link.backend().connects(), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_stays_disconnected() {
        let mut link = Link::new(StubKv::new().failing_connect());
        let err = link.ensure_connected().await.unwrap_err();
        assert!(matches!(err, CollaboratorError::ConnectionFailed(_)));
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[tokio::test]
    async fn test_reconnects_after_drop() {
        let mut link = Link::new(StubKv::new());
        link.connect().await.unwrap();

        link.backend_mut().drop_connection();
        link.ensure_connected().await.unwrap();
        assert_eq!(link.backend().connects(), 2);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut link = Link::new(StubKv::new());
        link.close().await.unwrap();
        assert_eq!(link.backend().closes(), 0);

        link.connect().await.unwrap();
        link.close().await.unwrap();
        link.close().await.unwrap();
        assert_eq!(link.backend().closes(), 1);
        assert_eq!(link.state(), LinkState::Disconnected);
    }

    #[test]
    fn test_endpoint_serialization() {
        let endpoint = Endpoint::network("redis", "localhost", 6379);
        let value = serde_json::to_value(&endpoint).unwrap();
        assert_eq!(value["kind"], "redis");
        assert_eq!(value["port"], 6379);
        assert!(value.get("username").is_none());
    }
}
