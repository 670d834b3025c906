//! `run` / `validate` / `history` endpoints, built on this engine's
//! `Scheduler`/`RunOptions`/`HistoryStore` trigger/status
//! request-response convention.

use crate::AppState;
use actix_web::{web, HttpResponse};
use flowforge_core::history::{RunRecord, RunStatus};
use flowforge_core::schema::{Issue, IssueSeverity};
use flowforge_core::{parse, validate, Format, RunOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default, Deserialize)]
struct RunRequest {
    #[serde(default)]
    inputs: HashMap<String, Value>,
    cwd: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunAccepted {
    run_id: String,
}

fn format_for(path: &str) -> Format {
    match path.rsplit('.').next() {
        Some("json") => Format::Json,
        _ => Format::Yaml,
    }
}

async fn trigger_run(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
    body: web::Json<RunRequest>,
) -> HttpResponse {
    let (workspace, workflow_path) = path.into_inner();
    let root = state.resolve_workspace(&workspace).await;
    let full_path = root.join(&workflow_path);

    let bytes = match tokio::fs::read(&full_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": format!("failed to read {}: {e}", full_path.display()),
            }))
        }
    };
    let schema = match parse(&bytes, format_for(&workflow_path)) {
        Ok(schema) => schema,
        Err(e) => return HttpResponse::BadRequest().json(serde_json::json!({ "error": e.to_string() })),
    };

    let run_id = Uuid::new_v4().to_string();
    let broadcaster = state.register_run(run_id.clone(), EVENT_CHANNEL_CAPACITY);
    let (sink, mut raw_events) = flowforge_core::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        while let Some(event) = raw_events.recv().await {
            // No subscribers right now is not an error; the event is
            // simply not replayed to anyone.
            let _ = broadcaster.send(event);
        }
    });

    let request = body.into_inner();
    let options = RunOptions {
        start_node_ids: None,
        workflow_inputs: request.inputs,
        cwd: request.cwd.map(PathBuf::from).unwrap_or_else(|| root.clone()),
    };

    let scheduler = state.scheduler.clone();
    let history = state.history.clone();
    let run_id_for_task = run_id.clone();
    tokio::spawn(async move {
        let started_at = chrono::Utc::now();
        let node_count = schema.nodes.len();
        info!(run_id = %run_id_for_task, workflow = %schema.metadata.name, "run started");
        let outcome = scheduler.run(&schema, options, sink, CancellationToken::new()).await;
        let completed_at = chrono::Utc::now();

        let record = match outcome {
            Ok(outcome) => RunRecord {
                id: run_id_for_task.clone(),
                workspace: workspace.clone(),
                workflow_path: workflow_path.clone(),
                started_at,
                completed_at,
                status: if outcome.success { RunStatus::Completed } else { RunStatus::Failed },
                duration_ms: (completed_at - started_at).num_milliseconds(),
                node_count,
                results: outcome.results,
                error: outcome.error,
                source: None,
            },
            Err(e) => RunRecord {
                id: run_id_for_task.clone(),
                workspace: workspace.clone(),
                workflow_path: workflow_path.clone(),
                started_at,
                completed_at,
                status: RunStatus::Failed,
                duration_ms: (completed_at - started_at).num_milliseconds(),
                node_count,
                results: Vec::new(),
                error: Some(e.to_string()),
                source: None,
            },
        };
        if let Err(e) = history.record_run(&record).await {
            error!(run_id = %run_id_for_task, error = %e, "failed to persist run record");
        }
    });

    HttpResponse::Ok().json(RunAccepted { run_id })
}

#[derive(Debug, Serialize)]
struct ApiIssue {
    severity: &'static str,
    message: String,
    node_id: Option<String>,
    edge_id: Option<String>,
}

impl From<&Issue> for ApiIssue {
    fn from(issue: &Issue) -> Self {
        ApiIssue {
            severity: match issue.severity {
                IssueSeverity::Warning => "warning",
                IssueSeverity::Error => "error",
            },
            message: issue.message.clone(),
            node_id: issue.node_id.clone(),
            edge_id: issue.edge_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValidateQuery {
    format: Option<String>,
}

async fn validate_workflow(query: web::Query<ValidateQuery>, body: web::Bytes) -> HttpResponse {
    let format = match query.format.as_deref() {
        Some("json") => Format::Json,
        _ => Format::Yaml,
    };
    let schema = match parse(&body, format) {
        Ok(schema) => schema,
        Err(e) => {
            return HttpResponse::Ok().json(vec![ApiIssue {
                severity: "error",
                message: e.to_string(),
                node_id: None,
                edge_id: None,
            }])
        }
    };
    let issues: Vec<ApiIssue> = validate(&schema).iter().map(ApiIssue::from).collect();
    HttpResponse::Ok().json(issues)
}

async fn workflow_history(state: web::Data<Arc<AppState>>, path: web::Path<(String, String)>) -> HttpResponse {
    let (workspace, workflow_path) = path.into_inner();
    match state.history.history_for(&workspace, &workflow_path).await {
        Ok(summaries) => HttpResponse::Ok().json(summaries),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() })),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/workflows/validate", web::post().to(validate_workflow))
        .route("/workflows/{workspace}/{workflow_path:.*}/run", web::post().to(trigger_run))
        .route("/workflows/{workspace}/{workflow_path:.*}/history", web::get().to(workflow_history));
}
