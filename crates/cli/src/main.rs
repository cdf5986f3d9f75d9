mod cli;
mod commands;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use disruptor_core::config::load_dotenv;
use disruptor_core::DetectorConfig;
use disruptor_mcp::{McpServer, StdioTransport};
use disruptor_tool_runtime::disruption_registry;

use crate::cli::{CliArgs, Command};
use crate::config::CliConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries results and the MCP wire protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let config = CliConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let detector = config.detector_config();
    detector.validate().context("invalid detector configuration")?;
    detector.log_summary();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    match args.command {
        Command::Serve => serve(detector, cwd).await,
        Command::Detect(detect) => {
            let loader = config.resolve_loader(detect.loader.as_deref())?;
            let out = commands::detect(detector, &loader, &cwd, &detect).await?;
            println!("{out}");
            Ok(())
        }
        Command::RootCause(root_cause) => {
            let loader = config.resolve_loader(root_cause.loader.as_deref())?;
            let out = commands::root_cause(detector, &loader, &cwd, &root_cause).await?;
            println!("{out}");
            Ok(())
        }
    }
}

async fn serve(detector: DetectorConfig, cwd: PathBuf) -> Result<()> {
    let registry = disruption_registry(detector).context("failed to register tools")?;
    info!(tools = registry.len(), "Serving disruption tools over stdio");

    let mut server = McpServer::new(registry).with_working_directory(cwd);
    server
        .run(&mut StdioTransport::new())
        .await
        .context("MCP server failed")
}
