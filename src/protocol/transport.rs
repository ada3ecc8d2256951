//! Line transport for JSON-RPC messages.

use crate::error::{McpError, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::{error, trace};

/// Transport trait for MCP communication.
#[async_trait]
pub trait Transport: Send {
    /// Next line as raw bytes, without its terminator; `None` at end-of-stream.
    ///
    /// Bytes are not checked for UTF-8 here: a bad line is a protocol error
    /// answered in-band, not a stream failure.
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>>;

    /// Writes `line` followed by a newline and flushes.
    async fn write_line(&mut self, line: &str) -> Result<()>;
}

/// Transport over any buffered reader and writer pair.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

/// Transport bound to the process's standard streams.
pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        let mut line = Vec::new();

        match self.reader.read_until(b'\n', &mut line).await {
            Ok(0) => Ok(None),
            Ok(_) => {
                while matches!(line.last(), Some(b'\n' | b'\r')) {
                    line.pop();
                }
                trace!("Received line: {}", String::from_utf8_lossy(&line));
                Ok(Some(line))
            }
            Err(e) => {
                error!("Error reading input stream: {}", e);
                Err(McpError::Io(e))
            }
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        trace!("Sending line: {}", line);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}
