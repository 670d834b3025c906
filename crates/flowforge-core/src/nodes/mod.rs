//! Node executors: one strategy per node kind. A [`NodeRegistry`] maps
//! `nodeType` to an executor so the Scheduler stays decoupled from the
//! kind set, per the polymorphic-node-kinds design note.

pub mod agent;
pub mod component;
pub mod constant;
pub mod function;
pub mod interface;
pub mod loop_node;
pub mod script;
pub mod shell;
pub mod trigger;
pub mod workdir;

use crate::context::{ExecutionContext, NodeResult, NodeStatus};
use crate::error::{Result, WorkflowError};
use crate::events::EventSink;
use crate::runner::WorkflowRunner;
use crate::schema::{ExtractSpec, PortDefinition, WorkflowNode, WorkflowSchema};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a node executor needs to run once: the node itself, its
/// resolved (and template-substituted) input bindings, the working
/// directory, a read-only view of the run's context, a handle back into
/// the scheduler for nodes that recurse (`loop`, `component`), the event
/// sink for streaming `node-output` chunks, and the run's cancellation
/// token.
pub struct NodeExecCtx<'a> {
    pub node: &'a WorkflowNode,
    /// The enclosing workflow document, needed only by `loop` (to find its
    /// inner nodes) and `component` (to resolve a sub-workflow's own
    /// start set once loaded).
    pub schema: &'a WorkflowSchema,
    pub cwd: &'a Path,
    pub bindings: HashMap<String, Value>,
    pub context: &'a ExecutionContext,
    pub runner: Arc<dyn WorkflowRunner>,
    pub events: EventSink,
    pub cancellation: CancellationToken,
}

/// The raw, pre-shaping result of running a node. `raw` holds the
/// kind-specific canonical fields (`stdout`, `response`, `value`, ...)
/// that [`build_output_values`] reads from when a port has no `extract`
/// override.
#[derive(Debug, Default, Clone)]
pub struct ExecutionOutcome {
    pub status: NodeStatus,
    pub raw: HashMap<String, Value>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: Option<i32>,
    pub structured_output: Option<Value>,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn completed(raw: HashMap<String, Value>) -> Self {
        Self { status: NodeStatus::Completed, raw, ..Default::default() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { status: NodeStatus::Failed, error: Some(error.into()), ..Default::default() }
    }

    pub fn with_stdio(mut self, stdout: Option<String>, stderr: Option<String>, exit_code: Option<i32>) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self.exit_code = exit_code;
        self
    }

    pub fn with_structured(mut self, value: Option<Value>) -> Self {
        self.structured_output = value;
        self
    }
}

#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(&self, exec: NodeExecCtx<'_>) -> Result<ExecutionOutcome>;
}

/// Maps `nodeType` to the executor that handles it.
#[derive(Clone)]
pub struct NodeRegistry {
    executors: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self { executors: HashMap::new() }
    }

    pub fn register(&mut self, kind: impl Into<String>, executor: Arc<dyn NodeExecutor>) -> &mut Self {
        self.executors.insert(kind.into(), executor);
        self
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<dyn NodeExecutor>> {
        self.executors.get(kind)
    }

    /// The registry pre-populated with every built-in node kind.
    pub fn with_builtins(agent_runner: Arc<dyn agent::AgentRunner>) -> Self {
        let mut registry = Self::new();
        registry
            .register("shell", Arc::new(shell::ShellExecutor))
            .register("script", Arc::new(script::ScriptExecutor))
            .register("trigger", Arc::new(trigger::TriggerExecutor))
            .register("constant", Arc::new(constant::ConstantExecutor))
            .register("workdir", Arc::new(workdir::WorkdirExecutor))
            .register("agent", Arc::new(agent::AgentExecutor::new(agent_runner)))
            .register("function", Arc::new(function::FunctionExecutor))
            .register("component", Arc::new(component::ComponentExecutor))
            .register("loop", Arc::new(loop_node::LoopExecutor))
            .register("interface-input", Arc::new(interface::InterfaceInputExecutor))
            .register("interface-output", Arc::new(interface::InterfaceOutputExecutor))
            .register("interface-continue", Arc::new(interface::InterfaceContinueExecutor));
        registry
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// For each declared output port, select a canonical source from the raw
/// result or apply the port's `extract` spec.
pub fn build_output_values(ports: &[PortDefinition], outcome: &ExecutionOutcome) -> HashMap<String, Value> {
    let mut out = HashMap::new();
    for port in ports {
        let value = match &port.extract {
            Some(spec) => extract_value(spec, outcome),
            None => outcome.raw.get(&port.name).cloned(),
        };
        if let Some(value) = value {
            out.insert(port.name.clone(), value);
        }
    }
    out
}

fn extract_value(spec: &ExtractSpec, outcome: &ExecutionOutcome) -> Option<Value> {
    let payload = outcome
        .stdout
        .clone()
        .or_else(|| outcome.raw.get("text").and_then(|v| v.as_str()).map(String::from))
        .unwrap_or_default();
    match spec {
        ExtractSpec::Full => Some(Value::String(payload)),
        ExtractSpec::Regex(pattern) => {
            let re = Regex::new(pattern).ok()?;
            re.captures(&payload)
                .and_then(|caps| caps.get(1))
                .map(|m| Value::String(m.as_str().to_string()))
        }
        ExtractSpec::JsonPath(path) => {
            let root = outcome
                .structured_output
                .clone()
                .or_else(|| serde_json::from_str(&payload).ok())?;
            json_path(&root, path)
        }
    }
}

fn json_path(root: &Value, dotted: &str) -> Option<Value> {
    let mut current = root;
    for segment in dotted.split('.').filter(|s| !s.is_empty()) {
        current = current.get(segment)?;
    }
    Some(current.clone())
}

/// Shared timestamp bookkeeping for executors that want start/end times
/// for their `NodeResult` without recomputing `Utc::now()` at every call
/// site.
pub struct Timing {
    pub start: DateTime<Utc>,
}

impl Timing {
    pub fn start() -> Self {
        Self { start: Utc::now() }
    }

    pub fn finish(
        self,
        node_id: impl Into<String>,
        ports: &[PortDefinition],
        outcome: ExecutionOutcome,
    ) -> NodeResult {
        let output = build_output_values(ports, &outcome);
        NodeResult {
            node_id: node_id.into(),
            status: outcome.status,
            output,
            raw_output: if outcome.raw.is_empty() { None } else { Some(Value::Object(outcome.raw.into_iter().collect())) },
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            exit_code: outcome.exit_code,
            structured_output: outcome.structured_output,
            error: outcome.error,
            start_time: self.start,
            end_time: Utc::now(),
        }
    }
}

pub(crate) fn unknown_kind(kind: &str) -> WorkflowError {
    WorkflowError::UnknownNodeKind { kind: kind.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValueType;

    #[test]
    fn build_output_values_reads_canonical_field_by_name() {
        let ports = vec![PortDefinition::new("stdout", ValueType::String)];
        let mut raw = HashMap::new();
        raw.insert("stdout".to_string(), Value::String("hi".into()));
        let outcome = ExecutionOutcome::completed(raw);
        let out = build_output_values(&ports, &outcome);
        assert_eq!(out.get("stdout"), Some(&Value::String("hi".into())));
    }

    #[test]
    fn build_output_values_applies_regex_extract() {
        let mut port = PortDefinition::new("id", ValueType::String);
        port.extract = Some(ExtractSpec::Regex("id=(\\d+)".into()));
        let outcome = ExecutionOutcome::completed(HashMap::new()).with_stdio(Some("id=42".into()), None, Some(0));
        let out = build_output_values(&[port], &outcome);
        assert_eq!(out.get("id"), Some(&Value::String("42".into())));
    }

    #[test]
    fn build_output_values_applies_json_path_extract() {
        let mut port = PortDefinition::new("name", ValueType::String);
        port.extract = Some(ExtractSpec::JsonPath("user.name".into()));
        let outcome = ExecutionOutcome::completed(HashMap::new())
            .with_structured(Some(serde_json::json!({"user": {"name": "ada"}})));
        let out = build_output_values(&[port], &outcome);
        assert_eq!(out.get("name"), Some(&Value::String("ada".into())));
    }
}
