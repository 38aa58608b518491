use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use jira_gateway::config::GatewayConfig;
use jira_gateway::logging;
use jira_gateway::mcp::{tools::ToolRegistry, Gateway, MCPServer, StdioTransport};

/// Jira operations as MCP tools over stdio
#[derive(Parser, Debug)]
#[command(name = "jira-gateway", version, about)]
struct Cli {
    /// Load settings from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Path to the jira command-line client
    #[arg(long, value_name = "PATH")]
    jira_cli: Option<PathBuf>,

    /// Working directory for spawned processes
    #[arg(long, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Per-call timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Write rolling log files into this directory as well as stderr
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Print the tool names and exit
    #[arg(long)]
    list_tools: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenv::from_path(path)
                .map_err(|e| format!("failed to load {}: {}", path.display(), e))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    let mut config = GatewayConfig::from_env()?;
    if let Some(path) = cli.jira_cli {
        config.jira_cli = path;
    }
    if let Some(dir) = cli.workdir {
        config.working_directory = dir;
    }
    if let Some(ms) = cli.timeout_ms {
        if ms == 0 {
            return Err("--timeout-ms must be positive".into());
        }
        config.call_timeout = Duration::from_millis(ms);
    }
    if cli.log_dir.is_some() {
        config.log_dir = cli.log_dir;
    }

    let _guard = logging::init(config.log_dir.as_deref())?;
    let registry = ToolRegistry::with_jira_tools()?;

    if cli.list_tools {
        for descriptor in registry.list() {
            println!("{}", descriptor.name);
        }
        return Ok(());
    }

    info!("jira gateway ready ({} tools)", registry.len());
    info!("Configuration: {:?}", config);

    let gateway = Gateway::with_default_backends(Arc::new(registry), Arc::new(config));
    MCPServer::new(Arc::new(gateway))
        .serve(StdioTransport::stdio())
        .await?;

    info!("jira gateway stopped");
    Ok(())
}
