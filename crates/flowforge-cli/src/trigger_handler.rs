//! Bridges a fired cron/idle trigger to the engine's normal run path:
//! load the workflow, run it through the same `Scheduler` a manual or
//! API-triggered run uses, and persist a history record tagged with the
//! trigger that caused it.

use async_trait::async_trait;
use flowforge_api::AppState;
use flowforge_core::history::{RunRecord, RunSource, RunStatus};
use flowforge_core::schema::{parse, Format};
use flowforge_triggers::{TriggerFire, TriggerFireKind, TriggerHandler};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct CliTriggerHandler {
    pub state: Arc<AppState>,
}

fn format_for(path: &str) -> Format {
    match path.rsplit('.').next() {
        Some("json") => Format::Json,
        _ => Format::Yaml,
    }
}

#[async_trait]
impl TriggerHandler for CliTriggerHandler {
    async fn invoke(&self, fire: TriggerFire) {
        let root = self.state.resolve_workspace(&fire.workspace).await;
        let full_path = root.join(&fire.workflow_path);

        let bytes = match tokio::fs::read(&full_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(entry_id = %fire.entry_id, error = %e, "trigger fired but workflow file is unreadable");
                return;
            }
        };
        let schema = match parse(&bytes, format_for(&fire.workflow_path)) {
            Ok(schema) => schema,
            Err(e) => {
                error!(entry_id = %fire.entry_id, error = %e, "trigger fired but workflow failed to parse");
                return;
            }
        };

        let run_id = uuid::Uuid::new_v4().to_string();
        let node_count = schema.nodes.len();
        let (sink, mut events) = flowforge_core::channel(256);
        let broadcaster = self.state.register_run(run_id.clone(), 256);
        let forwarder = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let _ = broadcaster.send(event);
            }
        });

        info!(entry_id = %fire.entry_id, run_id = %run_id, "trigger fired, run starting");
        let started_at = chrono::Utc::now();
        let options = flowforge_core::RunOptions {
            start_node_ids: Some(vec![fire.node_id.clone()]),
            workflow_inputs: Default::default(),
            cwd: root,
        };
        let outcome = self.state.scheduler.run(&schema, options, sink, CancellationToken::new()).await;
        let _ = forwarder.await;
        let completed_at = chrono::Utc::now();

        let source = Some(match fire.kind {
            TriggerFireKind::Cron => RunSource::Cron { entry_id: fire.entry_id.clone() },
            TriggerFireKind::Idle => RunSource::Idle { entry_id: fire.entry_id.clone() },
        });

        let record = match outcome {
            Ok(outcome) => RunRecord {
                id: run_id,
                workspace: fire.workspace,
                workflow_path: fire.workflow_path,
                started_at,
                completed_at,
                status: if outcome.success { RunStatus::Completed } else { RunStatus::Failed },
                duration_ms: (completed_at - started_at).num_milliseconds(),
                node_count,
                results: outcome.results,
                error: outcome.error,
                source,
            },
            Err(e) => RunRecord {
                id: run_id,
                workspace: fire.workspace,
                workflow_path: fire.workflow_path,
                started_at,
                completed_at,
                status: RunStatus::Failed,
                duration_ms: (completed_at - started_at).num_milliseconds(),
                node_count,
                results: Vec::new(),
                error: Some(e.to_string()),
                source,
            },
        };
        if let Err(e) = self.state.history.record_run(&record).await {
            error!(error = %e, "failed to persist triggered run");
        }
    }
}
