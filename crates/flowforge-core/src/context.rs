//! The execution context threaded through a run: node outputs, labels,
//! trigger/workflow inputs, and the optional dock context a loop's inner
//! sub-graph is run with.
//!
//! The Scheduler exclusively owns an [`ExecutionContext`] for the
//! duration of a run; node executors only ever see an immutable
//! snapshot via [`ExecutionContext::outputs_snapshot`].

use crate::schema::Handle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Status a node (or a whole run) terminates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Completed,
    Failed,
}

impl Default for NodeStatus {
    fn default() -> Self {
        NodeStatus::Completed
    }
}

/// The result of executing a single node, appended to the run's results
/// list and stored in history when the run completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    pub node_id: String,
    pub status: NodeStatus,
    /// Canonical output map built by `buildOutputValues`.
    pub output: HashMap<String, serde_json::Value>,
    /// The executor's raw, pre-shaping payload (e.g. full stdout text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl NodeResult {
    pub fn is_failed(&self) -> bool {
        self.status == NodeStatus::Failed
    }
}

/// Per-iteration values visible only to a loop's inner sub-graph: the
/// current iteration inputs keyed by dock handle id.
#[derive(Debug, Clone, Default)]
pub struct DockContext {
    pub values: HashMap<String, serde_json::Value>,
}

impl DockContext {
    pub fn get(&self, handle: &str) -> Option<&serde_json::Value> {
        self.values.get(handle)
    }

    pub fn insert(&mut self, handle: impl Into<String>, value: serde_json::Value) {
        self.values.insert(handle.into(), value);
    }
}

/// The per-run mutable state owned exclusively by the Scheduler.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// `nodeId -> outputName -> value`. Written only between batches.
    outputs: HashMap<String, HashMap<String, serde_json::Value>>,
    /// Node id or normalized label -> node id, for template `nodeRef` lookups.
    labels: HashMap<String, String>,
    /// Inputs supplied by the trigger that started this run, or by a
    /// manual caller, consumed by `interface-input` / `trigger` nodes.
    pub workflow_inputs: HashMap<String, serde_json::Value>,
    /// Present only while executing a loop's inner sub-graph.
    pub dock: Option<DockContext>,
    pub visited: std::collections::HashSet<String>,
    /// Working directory node executors run in. Carried on the context
    /// (rather than threaded as a separate parameter) so `run_subgraph`
    /// callers — the Loop and Component executors — can hand it down
    /// without widening the `WorkflowRunner` trait.
    pub cwd: PathBuf,
}

impl ExecutionContext {
    pub fn new(workflow_inputs: HashMap<String, serde_json::Value>) -> Self {
        Self { workflow_inputs, cwd: PathBuf::from("."), ..Default::default() }
    }

    pub fn with_dock(mut self, dock: DockContext) -> Self {
        self.dock = Some(dock);
        self
    }

    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn register_label(&mut self, label: String, node_id: String) {
        self.labels.insert(label, node_id);
    }

    pub fn resolve_ref<'a>(&'a self, node_ref: &'a str) -> Option<&'a str> {
        if self.outputs.contains_key(node_ref) {
            return Some(node_ref);
        }
        self.labels.get(node_ref).map(|s| s.as_str())
    }

    /// Record a completed node's outputs. Only the Scheduler calls this,
    /// and only between batches — this is the single-writer invariant.
    pub fn record_output(&mut self, node_id: impl Into<String>, output: HashMap<String, serde_json::Value>) {
        self.outputs.insert(node_id.into(), output);
    }

    pub fn has_output(&self, node_id: &str) -> bool {
        self.outputs.contains_key(node_id)
    }

    pub fn get_output(&self, node_id: &str, port: &str) -> Option<&serde_json::Value> {
        self.outputs.get(node_id)?.get(port)
    }

    /// Read-only snapshot handed to node executors and the Input Resolver.
    pub fn outputs_snapshot(&self) -> &HashMap<String, HashMap<String, serde_json::Value>> {
        &self.outputs
    }

    pub fn mark_visited(&mut self, node_id: &str) -> bool {
        self.visited.insert(node_id.to_string())
    }

    pub fn is_visited(&self, node_id: &str) -> bool {
        self.visited.contains(node_id)
    }

    /// Look up a dock value by handle, e.g. `dock:acc:prev`.
    pub fn dock_value(&self, handle: &Handle) -> Option<&serde_json::Value> {
        let dock = self.dock.as_ref()?;
        match handle {
            Handle::Dock { slot, role } => {
                let key = format!("dock:{slot}:{role:?}").to_lowercase();
                dock.get(&key)
            }
            Handle::Input { name, .. } => dock.get(&format!("input:{name}")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_reads_outputs_between_batches() {
        let mut ctx = ExecutionContext::new(HashMap::new());
        assert!(!ctx.has_output("n1"));
        ctx.record_output("n1", HashMap::from([("stdout".to_string(), serde_json::json!("hi"))]));
        assert_eq!(ctx.get_output("n1", "stdout").unwrap(), &serde_json::json!("hi"));
    }

    #[test]
    fn visited_guard_runs_each_node_once() {
        let mut ctx = ExecutionContext::new(HashMap::new());
        assert!(ctx.mark_visited("n1"));
        assert!(!ctx.mark_visited("n1"));
        assert!(ctx.is_visited("n1"));
    }

    #[test]
    fn label_resolution_falls_back_to_registered_labels() {
        let mut ctx = ExecutionContext::new(HashMap::new());
        ctx.register_label("my_node".to_string(), "n1".to_string());
        assert_eq!(ctx.resolve_ref("my_node"), Some("n1"));
        assert_eq!(ctx.resolve_ref("missing"), None);
    }
}
