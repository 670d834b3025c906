//! Shared application state: the pieces every route handler needs.
//! Constructed once by `flowforge-cli`'s `serve` command and mounted as
//! `web::Data<Arc<AppState>>`.

use flowforge_core::{EngineConfig, ExecutionEvent, HistoryStore, NodeRegistry, Scheduler};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// One run's live event fan-out. Kept around after the run completes so
/// a late SSE subscriber still gets the terminal `workflow-complete`
/// event if it connects within the channel's buffer window; dropped on
/// the next run of the same workflow.
pub struct RunChannel {
    pub sender: broadcast::Sender<ExecutionEvent>,
}

pub struct AppState {
    pub config: EngineConfig,
    pub scheduler: Scheduler,
    pub history: HistoryStore,
    pub runs: Mutex<HashMap<String, RunChannel>>,
}

impl AppState {
    pub fn new(config: EngineConfig, registry: NodeRegistry, history: HistoryStore) -> Self {
        Self { config, scheduler: Scheduler::new(registry), history, runs: Mutex::new(HashMap::new()) }
    }

    /// Register a new run's event channel, replacing a same-id collision
    /// (run ids are UUIDs, so this is defensive rather than expected).
    pub fn register_run(&self, run_id: String, capacity: usize) -> broadcast::Sender<ExecutionEvent> {
        let (tx, _rx) = broadcast::channel(capacity);
        self.runs.lock().unwrap().insert(run_id, RunChannel { sender: tx.clone() });
        tx
    }

    pub fn run_sender(&self, run_id: &str) -> Option<broadcast::Sender<ExecutionEvent>> {
        self.runs.lock().unwrap().get(run_id).map(|c| c.sender.clone())
    }

    /// Resolve a `{workspace}` URL segment to a filesystem root. Matches
    /// it against the registered-workspaces list by exact path or by
    /// final path component; an unregistered segment is treated as a
    /// path relative to the server's working directory, so ad hoc runs
    /// against an unregistered directory still work.
    pub async fn resolve_workspace(&self, workspace: &str) -> PathBuf {
        let registered = self.history.registered_workspaces().await.unwrap_or_default();
        for candidate in &registered {
            let path = Path::new(candidate);
            if candidate == workspace || path.file_name().and_then(|n| n.to_str()) == Some(workspace) {
                return path.to_path_buf();
            }
        }
        PathBuf::from(workspace)
    }
}
