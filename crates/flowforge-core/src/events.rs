//! The typed execution event stream. The Scheduler is the sole producer;
//! the HTTP/SSE surface and the history recorder are thin consumers. See
//! the event ordering rules in the concurrency model.

use crate::context::NodeResult;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExecutionEvent {
    NodeStart { node_id: String, timestamp: chrono::DateTime<chrono::Utc> },
    NodeOutput { node_id: String, chunk: String, timestamp: chrono::DateTime<chrono::Utc> },
    NodeComplete { node_id: String, result: NodeResult, timestamp: chrono::DateTime<chrono::Utc> },
    EdgeExecuted { edge_id: String, source_node_id: String, timestamp: chrono::DateTime<chrono::Utc> },
    IterationStart { loop_id: String, iteration: u32, timestamp: chrono::DateTime<chrono::Utc> },
    IterationComplete { loop_id: String, iteration: u32, success: bool, timestamp: chrono::DateTime<chrono::Utc> },
    WorkflowComplete { success: bool, error: Option<String>, timestamp: chrono::DateTime<chrono::Utc> },
}

impl ExecutionEvent {
    pub fn node_start(node_id: impl Into<String>) -> Self {
        ExecutionEvent::NodeStart { node_id: node_id.into(), timestamp: chrono::Utc::now() }
    }

    pub fn node_output(node_id: impl Into<String>, chunk: impl Into<String>) -> Self {
        ExecutionEvent::NodeOutput { node_id: node_id.into(), chunk: chunk.into(), timestamp: chrono::Utc::now() }
    }

    pub fn node_complete(node_id: impl Into<String>, result: NodeResult) -> Self {
        ExecutionEvent::NodeComplete { node_id: node_id.into(), result, timestamp: chrono::Utc::now() }
    }

    pub fn edge_executed(edge_id: impl Into<String>, source_node_id: impl Into<String>) -> Self {
        ExecutionEvent::EdgeExecuted {
            edge_id: edge_id.into(),
            source_node_id: source_node_id.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn iteration_start(loop_id: impl Into<String>, iteration: u32) -> Self {
        ExecutionEvent::IterationStart { loop_id: loop_id.into(), iteration, timestamp: chrono::Utc::now() }
    }

    pub fn iteration_complete(loop_id: impl Into<String>, iteration: u32, success: bool) -> Self {
        ExecutionEvent::IterationComplete {
            loop_id: loop_id.into(),
            iteration,
            success,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn workflow_complete(success: bool, error: Option<String>) -> Self {
        ExecutionEvent::WorkflowComplete { success, error, timestamp: chrono::Utc::now() }
    }
}

/// Handle to the single producer side of a run's event channel. Sending
/// blocks when the channel is full, trading backpressure for completeness
/// of the history record — see the streaming design note.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<ExecutionEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<ExecutionEvent>) -> Self {
        Self { tx }
    }

    pub async fn emit(&self, event: ExecutionEvent) {
        // A receiver dropping mid-run (e.g. an SSE client disconnecting)
        // must not abort the run itself, so a closed channel is ignored.
        let _ = self.tx.send(event).await;
    }
}

/// Create a bounded event channel. `capacity` should be generous enough
/// that ordinary bursts (a batch of parallel node-start events) don't
/// stall node tasks on backpressure.
pub fn channel(capacity: usize) -> (EventSink, mpsc::Receiver<ExecutionEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSink::new(tx), rx)
}
