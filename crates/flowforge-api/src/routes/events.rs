//! SSE execution-event stream for a run: `async_stream::stream!` framing
//! over a `.content_type("text/event-stream")` response, relaying
//! [`flowforge_core::ExecutionEvent`]s as they're produced.

use crate::AppState;
use actix_web::{web, HttpResponse};
use bytes::Bytes;
use flowforge_core::ExecutionEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

fn frame(event: &ExecutionEvent) -> Bytes {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Bytes::from(format!("data: {payload}\n\n"))
}

async fn stream_run_events(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String, String)>,
) -> HttpResponse {
    let (_workspace, _workflow_path, run_id) = path.into_inner();
    let Some(sender) = state.run_sender(&run_id) else {
        return HttpResponse::NotFound().json(serde_json::json!({ "error": format!("unknown run {run_id}") }));
    };

    let mut receiver = sender.subscribe();
    let stream = async_stream::stream! {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let done = matches!(event, ExecutionEvent::WorkflowComplete { .. });
                    yield Ok::<Bytes, actix_web::Error>(frame(&event));
                    if done {
                        break;
                    }
                }
                // A subscriber that falls too far behind the broadcast
                // buffer just misses the skipped events.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("Connection", "keep-alive"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(stream)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/workflows/{workspace}/{workflow_path:.*}/runs/{run_id}/events", web::get().to(stream_run_events));
}
