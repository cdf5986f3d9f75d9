//! MCP front end for the disruption tools.
//!
//! Serves the tools of a [`disruptor_tool_runtime::ToolRegistry`] over
//! JSON-RPC 2.0, one message per line.
//!
//! ```no_run
//! use disruptor_core::DetectorConfig;
//! use disruptor_mcp::{McpServer, StdioTransport};
//! use disruptor_tool_runtime::disruption_registry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = disruption_registry(DetectorConfig::from_env())?;
//! let mut server = McpServer::new(registry);
//! server.run(&mut StdioTransport::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod server;
pub mod transport;
pub mod types;

pub use error::McpError;
pub use server::McpServer;
pub use transport::{ChannelTransport, McpTransport, StdioTransport};
pub use types::*;
