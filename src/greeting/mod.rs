//! Greeting log collaborator: an append-only text file.

use crate::collaborator::{Collaborator, Endpoint};
use crate::config::GreetingConfig;
use crate::error::{CollabResult, CollaboratorError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Capability the greeting tool needs: append one line to the log.
#[async_trait]
pub trait GreetingLog: Collaborator {
    async fn append(&mut self, line: &str) -> CollabResult<()>;
}

/// Log file opened in append mode, created if missing.
pub struct FileGreetingLog {
    path: PathBuf,
    file: Option<File>,
}

impl FileGreetingLog {
    pub fn new(config: GreetingConfig) -> Self {
        Self {
            path: config.log_file,
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Collaborator for FileGreetingLog {
    fn name(&self) -> &'static str {
        "greeting-log"
    }

    async fn connect(&mut self) -> CollabResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        info!("Greeting log opened: {}", self.path.display());
        self.file = Some(file);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.file.is_some()
    }

    async fn close(&mut self) -> CollabResult<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            debug!("Greeting log closed");
        }
        Ok(())
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::file("file", self.path.display().to_string())
    }
}

#[async_trait]
impl GreetingLog for FileGreetingLog {
    async fn append(&mut self, line: &str) -> CollabResult<()> {
        let file = self
            .file
            .as_mut()
            .ok_or(CollaboratorError::NotConnected("greeting-log"))?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}
