//! `flowforge`: run, validate, and serve workflow documents, and manage
//! the registered-workspaces list the history index and trigger
//! scheduler both key off of.
//!
//! Grounded on the clap `#[derive(Parser)]`/`#[derive(Subcommand)]` shape
//! from the pack's `fuschia` CLI, adapted to this engine's own
//! `Scheduler`/`HistoryStore`/`TriggerScheduler` types and to a
//! `thiserror`-based `Result` instead of `anyhow`.

mod commands;
mod trigger_handler;

use clap::{Parser, Subcommand};
use flowforge_core::error::{Result, WorkflowError};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flowforge")]
#[command(version, about = "AI-agent workflow orchestrator", long_about = None)]
struct Cli {
    /// Root directory for persisted runs, history, and registered
    /// workspaces (default: $FLOWFORGE_HOME or ~/.flowforge).
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow document to completion.
    Run {
        workflow: PathBuf,
        /// Working directory passed to shell/script/agent nodes.
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Workflow input, repeatable: `--input key=value`.
        #[arg(long = "input", value_name = "KEY=VALUE")]
        inputs: Vec<String>,
        /// Skip the pre-run structural validation pass.
        #[arg(long)]
        no_validation: bool,
        /// Skip the confirmation prompt before executing shell/agent nodes.
        #[arg(long)]
        yolo: bool,
    },
    /// Validate one or more workflow documents.
    Validate { workflows: Vec<PathBuf> },
    /// Start the REST/SSE server and trigger scheduler.
    Serve {
        #[arg(long)]
        port: Option<u16>,
        /// Skip the confirmation prompt before starting the trigger scheduler.
        #[arg(long)]
        yolo: bool,
    },
    /// Initialize the engine home directory.
    Init,
    /// Register a workspace directory.
    Add { path: PathBuf },
    /// Unregister a workspace directory.
    Remove { path: PathBuf },
    /// List registered workspace directories.
    List,
}

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = match flowforge_core::EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return std::process::ExitCode::from(2);
        }
    };
    if let Some(home) = cli.home {
        config.home = home;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return std::process::ExitCode::from(2);
        }
    };

    match rt.block_on(dispatch(config, cli.command)) {
        Ok(code) => std::process::ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::ExitCode::from(2)
        }
    }
}

async fn dispatch(config: flowforge_core::EngineConfig, command: Commands) -> Result<u8> {
    match command {
        Commands::Run { workflow, cwd, inputs, no_validation, yolo } => {
            commands::run::execute(config, workflow, cwd, inputs, no_validation, yolo).await
        }
        Commands::Validate { workflows } => commands::validate::execute(workflows).await,
        Commands::Serve { port, yolo } => commands::serve::execute(config, port, yolo).await.map(|()| 0),
        Commands::Init => commands::workspace::init(config).await.map(|()| 0),
        Commands::Add { path } => commands::workspace::add(config, path).await.map(|()| 0),
        Commands::Remove { path } => commands::workspace::remove(config, path).await.map(|()| 0),
        Commands::List => commands::workspace::list(config).await.map(|()| 0),
    }
}

/// Parse a single `key=value` CLI argument, treating the value as JSON
/// when it parses as such and as a plain string otherwise.
pub(crate) fn parse_input(raw: &str) -> Result<(String, serde_json::Value)> {
    let (key, value) = raw.split_once('=').ok_or_else(|| WorkflowError::SchemaInvalid {
        message: format!("invalid --input {raw:?}, expected key=value"),
    })?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
