//! Newline-delimited JSON transports.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::error::McpError;

/// Moves one JSON-RPC message per line.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Next non-blank message, or `None` once the peer has closed.
    async fn receive(&mut self) -> Result<Option<String>, McpError>;

    async fn send(&mut self, message: &str) -> Result<(), McpError>;
}

/// stdin in, stdout out. Logs must go to stderr while this is active.
pub struct StdioTransport {
    reader: BufReader<tokio::io::Stdin>,
    writer: tokio::io::Stdout,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            writer: tokio::io::stdout(),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn receive(&mut self) -> Result<Option<String>, McpError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    async fn send(&mut self, message: &str) -> Result<(), McpError> {
        self.writer.write_all(message.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// In-process transport pair over bounded channels.
pub struct ChannelTransport {
    rx: mpsc::Receiver<String>,
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Two connected ends; what one sends the other receives.
    pub fn pair() -> (Self, Self) {
        let (to_b, from_a) = mpsc::channel(32);
        let (to_a, from_b) = mpsc::channel(32);
        (
            Self { rx: from_b, tx: to_b },
            Self { rx: from_a, tx: to_a },
        )
    }
}

#[async_trait]
impl McpTransport for ChannelTransport {
    async fn receive(&mut self) -> Result<Option<String>, McpError> {
        while let Some(msg) = self.rx.recv().await {
            if !msg.trim().is_empty() {
                return Ok(Some(msg));
            }
        }
        Ok(None)
    }

    async fn send(&mut self, message: &str) -> Result<(), McpError> {
        self.tx.send(message.to_string()).await.map_err(|e| {
            McpError::Transport(std::io::Error::new(std::io::ErrorKind::BrokenPipe, e))
        })
    }
}
