//! `flowforge run` — execute a single workflow document, streaming its
//! execution events to stdout as newline-delimited JSON framed by blank
//! lines, then persisting a history record.

use flowforge_core::error::Result;
use flowforge_core::history::{RunRecord, RunSource, RunStatus};
use flowforge_core::nodes::agent::ShellAgentRunner;
use flowforge_core::schema::{parse, validate, Format, IssueSeverity};
use flowforge_core::{EngineConfig, HistoryStore, NodeRegistry, RunOptions, Scheduler};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

fn format_for(path: &std::path::Path) -> Format {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Format::Json,
        _ => Format::Yaml,
    }
}

/// Node kinds that shell out, spawn an agent process, or recurse into a
/// sub-graph that might — the kinds `--yolo` lets a caller skip
/// confirming before running.
fn has_side_effecting_nodes(schema: &flowforge_core::schema::WorkflowSchema) -> bool {
    schema.nodes.iter().any(|n| matches!(n.node_kind.as_str(), "shell" | "script" | "agent" | "component" | "loop"))
}

fn confirm(schema: &flowforge_core::schema::WorkflowSchema) -> bool {
    if !io::stdin().is_terminal() {
        return true;
    }
    eprint!("about to run {:?} ({} nodes) — continue? [y/N] ", schema.metadata.name, schema.nodes.len());
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    config: EngineConfig,
    workflow: PathBuf,
    cwd: Option<PathBuf>,
    raw_inputs: Vec<String>,
    no_validation: bool,
    yolo: bool,
) -> Result<u8> {
    let bytes = tokio::fs::read(&workflow).await?;
    let schema = parse(&bytes, format_for(&workflow))?;

    if !no_validation {
        let issues = validate(&schema);
        let errors: Vec<_> = issues.iter().filter(|i| i.severity == IssueSeverity::Error).collect();
        if !errors.is_empty() {
            for issue in &errors {
                eprintln!("error: {}", issue.message);
            }
            return Ok(1);
        }
    }

    if !yolo && has_side_effecting_nodes(&schema) && !confirm(&schema) {
        eprintln!("aborted");
        return Ok(2);
    }

    let mut inputs = std::collections::HashMap::new();
    for raw in &raw_inputs {
        let (key, value) = crate::parse_input(raw)?;
        inputs.insert(key, value);
    }

    let run_cwd = cwd.unwrap_or_else(|| {
        workflow.parent().map(|p| p.to_path_buf()).unwrap_or_else(|| PathBuf::from("."))
    });
    let workspace = run_cwd.to_string_lossy().to_string();
    let workflow_path = workflow.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

    let registry = NodeRegistry::with_builtins(Arc::new(ShellAgentRunner));
    let scheduler = Scheduler::new(registry);
    let (sink, mut events) = flowforge_core::channel(256);

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}\n"),
                Err(e) => eprintln!("error: failed to serialize event: {e}"),
            }
        }
    });

    let run_id = uuid::Uuid::new_v4().to_string();
    let started_at = chrono::Utc::now();
    let node_count = schema.nodes.len();
    info!(run_id = %run_id, workflow = %schema.metadata.name, "run started");

    let options = RunOptions { start_node_ids: None, workflow_inputs: inputs, cwd: run_cwd };
    let outcome = scheduler.run(&schema, options, sink, CancellationToken::new()).await;
    let _ = printer.await;
    let completed_at = chrono::Utc::now();

    let (exit_code, record) = match outcome {
        Ok(outcome) => {
            let status = if outcome.success { RunStatus::Completed } else { RunStatus::Failed };
            let exit_code = if outcome.success { 0 } else { 1 };
            let record = RunRecord {
                id: run_id,
                workspace,
                workflow_path,
                started_at,
                completed_at,
                status,
                duration_ms: (completed_at - started_at).num_milliseconds(),
                node_count,
                results: outcome.results,
                error: outcome.error,
                source: Some(RunSource::Manual),
            };
            (exit_code, record)
        }
        Err(e) => {
            let record = RunRecord {
                id: run_id,
                workspace,
                workflow_path,
                started_at,
                completed_at,
                status: RunStatus::Failed,
                duration_ms: (completed_at - started_at).num_milliseconds(),
                node_count,
                results: Vec::new(),
                error: Some(e.to_string()),
                source: Some(RunSource::Manual),
            };
            (1, record)
        }
    };

    let history = HistoryStore::new(&config);
    history.record_run(&record).await?;

    Ok(exit_code)
}
