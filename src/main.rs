//! agentd: remotely managed execution agent.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌────────────────────────────────────────────────┐
//!                         │                    AGENTD                      │
//!                         │                                                │
//!   Scheduler (RPC)       │  ┌──────────┐   ┌──────────┐   ┌───────────┐   │
//!   ──────────────────────┼─▶│   net    │──▶│   rpc    │──▶│ dispatch  │   │
//!                         │  │ listener │   │  server  │   │ (workers) │   │
//!                         │  └──────────┘   └────┬─────┘   └───────────┘   │
//!                         │                      │ hook: peer address      │
//!                         │                      ▼                         │
//!   agentd stop           │  ┌──────────┐   ┌──────────────────────────┐   │
//!   ──────────────────────┼─▶│ control  │──▶│        lifecycle         │   │
//!   (loopback, token)     │  │ listener │   │ init/start/await/stop    │   │
//!                         │  └──────────┘   └────┬─────────────┬───────┘   │
//!                         │                      ▼             ▼           │
//!                         │               ┌────────────┐ ┌───────────┐     │
//!                         │               │ credential │ │ registry  │     │
//!                         │               │   store    │ │ (HTTP)    │     │
//!                         │               └────────────┘ └───────────┘     │
//!                         └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::Parser;

use agentd::config::loader::load_for_home;
use agentd::control::client::{control_address, send_shutdown};
use agentd::lifecycle::signals::forward_signals;
use agentd::observability::logging::init_logging;
use agentd::rpc::PingDispatcher;
use agentd::{registry, AgentConfig, AgentError, LifecycleController};

const USAGE: &str = "usage: agentd [--home DIR] [--config FILE] start|stop";

#[derive(Parser)]
#[command(name = "agentd")]
#[command(about = "Remotely managed execution agent", long_about = None)]
struct Cli {
    /// Agent home directory (credential, pid marker, conf/agent.toml)
    #[arg(long, env = "AGENTD_HOME")]
    home: Option<PathBuf>,

    /// Config file, instead of <home>/conf/agent.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// `start` or `stop`
    command: Option<String>,

    /// Ignored
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    rest: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            init_logging("info");
            tracing::warn!(kind = ?e.kind(), "Unrecognized arguments, {}", USAGE);
            return ExitCode::SUCCESS;
        }
    };

    let command = match cli.command.as_deref() {
        Some(c @ ("start" | "stop")) => c.to_string(),
        Some(other) => {
            init_logging("info");
            tracing::warn!(command = other, "Unknown command, {}", USAGE);
            return ExitCode::SUCCESS;
        }
        None => {
            init_logging("info");
            tracing::warn!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
    };

    let home = cli
        .home
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = match load_for_home(&home, cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            tracing::error!(home = ?home, error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.observability.log_level);
    if !cli.rest.is_empty() {
        tracing::debug!(ignored = ?cli.rest, "Extra arguments after command");
    }

    let result = if command == "start" {
        run_start(config).await
    } else {
        run_stop(&config).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(command = %command, error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

/// Initialize, start, wait for the shutdown command, tear down.
async fn run_start(config: AgentConfig) -> Result<(), AgentError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), home = ?config.home, "agentd starting");

    let registrar = registry::from_config(&config.registry)?;
    let mut agent = LifecycleController::new(config, Arc::new(PingDispatcher), registrar);

    agent.init()?;
    agent.start().await?;
    tokio::spawn(forward_signals(agent.stop_handle()));

    agent.await_shutdown().await?;
    agent.stop();

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Send the shutdown token to a running agent.
async fn run_stop(config: &AgentConfig) -> Result<(), AgentError> {
    let address = control_address(config)?;
    send_shutdown(address, &config.control.token).await
}
