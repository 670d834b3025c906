//! `flowforge serve` — start the REST/SSE server alongside the trigger
//! scheduler, sharing one `AppState`/`Scheduler`/`HistoryStore` between
//! both so a cron/idle fire and an API-triggered run land in the same
//! history index.

use crate::trigger_handler::CliTriggerHandler;
use flowforge_core::error::{Result, WorkflowError};
use flowforge_core::nodes::agent::ShellAgentRunner;
use flowforge_core::schema::{parse, Format};
use flowforge_core::{EngineConfig, HistoryStore, NodeRegistry};
use flowforge_triggers::{entries_from_schema, TriggerEntry, TriggerScheduler};
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

fn format_for(path: &Path) -> Format {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Format::Json,
        _ => Format::Yaml,
    }
}

/// Shallow scan of a workspace root for workflow documents, building one
/// trigger entry per `cron`/`idle` trigger node found.
async fn discover_entries(workspace: &str) -> Vec<TriggerEntry> {
    let root = Path::new(workspace);
    let mut entries = Vec::new();
    let mut dir = match tokio::fs::read_dir(root).await {
        Ok(dir) => dir,
        Err(e) => {
            warn!(workspace, error = %e, "skipping unreadable workspace while discovering triggers");
            return entries;
        }
    };
    while let Ok(Some(entry)) = dir.next_entry().await {
        let path = entry.path();
        let is_workflow = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml") | Some("json"));
        if !path.is_file() || !is_workflow {
            continue;
        }
        let workflow_path = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        let schema = match parse(&bytes, format_for(&path)) {
            Ok(schema) => schema,
            Err(_) => continue,
        };
        match entries_from_schema(workspace, &workflow_path, &schema) {
            Ok(found) => entries.extend(found),
            Err(e) => warn!(workspace, workflow_path, error = %e, "skipping workflow with invalid trigger nodes"),
        }
    }
    entries
}

fn confirm(tick_interval_secs: u64) -> bool {
    if !io::stdin().is_terminal() {
        return true;
    }
    eprint!("starting trigger scheduler (tick every {tick_interval_secs}s) and server — continue? [y/N] ");
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub async fn execute(mut config: EngineConfig, port: Option<u16>, yolo: bool) -> Result<()> {
    if let Some(port) = port {
        config.api_port = port;
    }
    config.validate()?;

    if !yolo && !confirm(config.tick_interval_secs) {
        eprintln!("aborted");
        return Ok(());
    }

    let history = HistoryStore::new(&config);
    let registry = NodeRegistry::with_builtins(Arc::new(ShellAgentRunner));
    let state = Arc::new(flowforge_api::AppState::new(config.clone(), registry, history.clone()));

    let workspaces = history.registered_workspaces().await?;
    let mut entries = Vec::new();
    for workspace in &workspaces {
        entries.extend(discover_entries(workspace).await);
    }
    info!(count = entries.len(), "discovered trigger entries across registered workspaces");

    let handler = CliTriggerHandler { state: state.clone() };
    let scheduler = Arc::new(TriggerScheduler::new(entries, handler, Duration::from_secs(config.tick_interval_secs)));
    scheduler.start();

    flowforge_api::serve(state).await.map_err(|e| WorkflowError::Io { message: e.to_string() })
}
