//! Persisted run state: per-run JSON records under `<home>/runs/`, an
//! index file capped at a fixed number of entries per workflow, and a
//! flat list of registered workspaces.
//!
//! All writes are whole-file atomic replace — write to a sibling temp
//! file, then `rename` over the target — matching the single-writer
//! invariant the rest of the engine keeps for `ExecutionContext.outputs`.

use crate::config::EngineConfig;
use crate::context::NodeResult;
use crate::error::{Result, WorkflowError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Terminal status of a persisted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
}

/// What started this run, kept for the history view's "how did this get
/// triggered" column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunSource {
    Manual,
    Cron { entry_id: String },
    Idle { entry_id: String },
}

/// The full per-run record, persisted at `<home>/runs/<id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: String,
    pub workspace: String,
    pub workflow_path: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub status: RunStatus,
    pub duration_ms: i64,
    pub node_count: usize,
    pub results: Vec<NodeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<RunSource>,
}

/// The compact record kept in the index — everything about a run except
/// its node-by-node results, which stay in the per-run file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub status: RunStatus,
    pub duration_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&RunRecord> for RunSummary {
    fn from(record: &RunRecord) -> Self {
        Self {
            id: record.id.clone(),
            started_at: record.started_at,
            completed_at: record.completed_at,
            status: record.status,
            duration_ms: record.duration_ms,
            error: record.error.clone(),
        }
    }
}

fn history_key(workspace: &str, workflow_path: &str) -> String {
    format!("{workspace}:{workflow_path}")
}

/// Read-write access to a workspace's run history, rooted at
/// `EngineConfig::home`.
#[derive(Clone)]
pub struct HistoryStore {
    home: PathBuf,
    history_cap: usize,
}

impl HistoryStore {
    pub fn new(config: &EngineConfig) -> Self {
        Self { home: config.home.clone(), history_cap: config.history_cap }
    }

    fn runs_dir(&self) -> PathBuf {
        self.home.join("runs")
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.runs_dir().join(format!("{run_id}.json"))
    }

    fn index_path(&self) -> PathBuf {
        self.home.join("history.json")
    }

    fn workspaces_path(&self) -> PathBuf {
        self.home.join("workspaces.json")
    }

    /// Write the per-run record and append its summary to the index,
    /// truncating that key's entries to the configured cap.
    pub async fn record_run(&self, record: &RunRecord) -> Result<()> {
        tokio::fs::create_dir_all(self.runs_dir()).await?;
        let bytes = serde_json::to_vec_pretty(record)?;
        atomic_write(&self.run_path(&record.id), &bytes).await?;

        let key = history_key(&record.workspace, &record.workflow_path);
        let mut index = self.load_index().await?;
        let entries = index.entry(key).or_default();
        entries.insert(0, RunSummary::from(record));
        entries.truncate(self.history_cap);
        self.write_index(&index).await
    }

    pub async fn load_run(&self, run_id: &str) -> Result<RunRecord> {
        let bytes = tokio::fs::read(self.run_path(run_id)).await.map_err(|e| WorkflowError::Io {
            message: format!("run {run_id} not found: {e}"),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn load_index(&self) -> Result<HashMap<String, Vec<RunSummary>>> {
        match tokio::fs::read(self.index_path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_index(&self, index: &HashMap<String, Vec<RunSummary>>) -> Result<()> {
        tokio::fs::create_dir_all(&self.home).await?;
        let bytes = serde_json::to_vec_pretty(index)?;
        atomic_write(&self.index_path(), &bytes).await
    }

    /// Runs recorded for `workspace`/`workflow_path`, most recent first.
    pub async fn history_for(&self, workspace: &str, workflow_path: &str) -> Result<Vec<RunSummary>> {
        let index = self.load_index().await?;
        Ok(index.get(&history_key(workspace, workflow_path)).cloned().unwrap_or_default())
    }

    pub async fn registered_workspaces(&self) -> Result<Vec<String>> {
        match tokio::fs::read(self.workspaces_path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn register_workspace(&self, path: &str) -> Result<()> {
        let mut workspaces = self.registered_workspaces().await?;
        if !workspaces.iter().any(|w| w == path) {
            workspaces.push(path.to_string());
        }
        tokio::fs::create_dir_all(&self.home).await?;
        let bytes = serde_json::to_vec_pretty(&workspaces)?;
        atomic_write(&self.workspaces_path(), &bytes).await
    }

    pub async fn remove_workspace(&self, path: &str) -> Result<()> {
        let mut workspaces = self.registered_workspaces().await?;
        workspaces.retain(|w| w != path);
        let bytes = serde_json::to_vec_pretty(&workspaces)?;
        atomic_write(&self.workspaces_path(), &bytes).await
    }
}

/// Write `bytes` to `path` by first writing a sibling temp file and
/// renaming it over the target, so a reader never observes a partial
/// write.
async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("json")
    ));
    tokio::fs::write(&tmp_path, bytes).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NodeStatus;

    fn config_at(dir: &Path) -> EngineConfig {
        EngineConfig { home: dir.to_path_buf(), ..EngineConfig::default() }
    }

    fn record(id: &str, workflow_path: &str) -> RunRecord {
        let now = chrono::Utc::now();
        RunRecord {
            id: id.to_string(),
            workspace: "ws".to_string(),
            workflow_path: workflow_path.to_string(),
            started_at: now,
            completed_at: now,
            status: RunStatus::Completed,
            duration_ms: 12,
            node_count: 1,
            results: vec![NodeResult {
                node_id: "n1".into(),
                status: NodeStatus::Completed,
                output: HashMap::new(),
                raw_output: None,
                stdout: None,
                stderr: None,
                exit_code: None,
                structured_output: None,
                error: None,
                start_time: now,
                end_time: now,
            }],
            error: None,
            source: Some(RunSource::Manual),
        }
    }

    #[tokio::test]
    async fn records_and_reloads_a_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(&config_at(dir.path()));
        store.record_run(&record("run-1", "wf.yaml")).await.unwrap();

        let loaded = store.load_run("run-1").await.unwrap();
        assert_eq!(loaded.workflow_path, "wf.yaml");

        let history = store.history_for("ws", "wf.yaml").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, "run-1");
    }

    #[tokio::test]
    async fn index_is_capped_per_key_and_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(&EngineConfig { history_cap: 3, ..config_at(dir.path()) });
        for i in 0..5 {
            store.record_run(&record(&format!("run-{i}"), "wf.yaml")).await.unwrap();
        }
        let history = store.history_for("ws", "wf.yaml").await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].id, "run-4");
    }

    #[tokio::test]
    async fn workspace_registration_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(&config_at(dir.path()));
        store.register_workspace("/ws/a").await.unwrap();
        store.register_workspace("/ws/a").await.unwrap();
        let workspaces = store.registered_workspaces().await.unwrap();
        assert_eq!(workspaces, vec!["/ws/a".to_string()]);

        store.remove_workspace("/ws/a").await.unwrap();
        assert!(store.registered_workspaces().await.unwrap().is_empty());
    }
}
