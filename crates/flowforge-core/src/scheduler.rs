//! The Scheduler: a level-set dispatcher that runs a workflow's nodes to
//! completion, batch by batch, emitting the execution event stream and
//! enforcing the single-writer invariant on `ExecutionContext.outputs`.
//!
//! Implements [`WorkflowRunner`] so `loop` and `component` node executors
//! can recurse into it for their inner sub-graphs without this module
//! depending back on `nodes`.

use crate::context::{ExecutionContext, NodeResult};
use crate::error::{Result, WorkflowError};
use crate::events::{ExecutionEvent, EventSink};
use crate::nodes::{unknown_kind, ExecutionOutcome, NodeExecCtx, NodeRegistry, Timing};
use crate::resolve;
use crate::runner::{SubRunOutcome, WorkflowRunner};
use crate::schema::{default_start_nodes, WorkflowEdge, WorkflowNode, WorkflowSchema};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

/// Inputs to a top-level run. `start_node_ids` overrides the default
/// start-set computation; `cwd` is the working directory node executors
/// run in.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub start_node_ids: Option<Vec<String>>,
    pub workflow_inputs: HashMap<String, serde_json::Value>,
    pub cwd: PathBuf,
}

/// Result of a completed (or failed/cancelled) top-level run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub results: Vec<NodeResult>,
    pub context: ExecutionContext,
}

#[derive(Clone)]
pub struct Scheduler {
    registry: Arc<NodeRegistry>,
}

impl Scheduler {
    pub fn new(registry: NodeRegistry) -> Self {
        Self { registry: Arc::new(registry) }
    }

    #[instrument(skip(self, schema, events, cancellation), fields(workflow = %schema.metadata.name))]
    pub async fn run(
        &self,
        schema: &WorkflowSchema,
        options: RunOptions,
        events: EventSink,
        cancellation: CancellationToken,
    ) -> Result<RunOutcome> {
        let start = match options.start_node_ids {
            Some(ids) => {
                for id in &ids {
                    if schema.node(id).is_none() {
                        return Err(WorkflowError::StartNodeNotFound { node_id: id.clone() });
                    }
                }
                ids
            }
            None => default_start_nodes(schema),
        };
        if start.is_empty() {
            return Err(WorkflowError::NoStartNode);
        }
        if let Some(node_id) = detect_cycle(schema, &start) {
            return Err(WorkflowError::CycleDetected { node_id });
        }

        let context = ExecutionContext::new(options.workflow_inputs).with_cwd(options.cwd);
        let runner: Arc<dyn WorkflowRunner> = Arc::new(self.clone());
        let (context, success, results, cancelled) =
            self.execute(schema, start, context, runner, events.clone(), cancellation).await;

        let error = if cancelled { Some("cancelled".to_string()) } else { None };
        events.emit(ExecutionEvent::workflow_complete(success && !cancelled, error.clone())).await;

        Ok(RunOutcome { success: success && !cancelled, error, results, context })
    }

    async fn execute(
        &self,
        schema: &WorkflowSchema,
        start: Vec<String>,
        mut context: ExecutionContext,
        runner: Arc<dyn WorkflowRunner>,
        events: EventSink,
        cancellation: CancellationToken,
    ) -> (ExecutionContext, bool, Vec<NodeResult>, bool) {
        register_labels(schema, &mut context);

        let candidates: HashMap<&str, &WorkflowNode> =
            schema.nodes.iter().filter(|n| !n.is_container_child()).map(|n| (n.id.as_str(), n)).collect();

        let mut frontier: HashSet<String> = start.into_iter().collect();
        let mut success = true;
        let mut results = Vec::new();
        let mut cancelled = false;

        loop {
            if cancellation.is_cancelled() {
                cancelled = true;
                break;
            }

            let batch: Vec<&WorkflowNode> = candidates
                .values()
                .filter(|n| frontier.contains(n.id.as_str()) && !context.is_visited(&n.id))
                .copied()
                .collect();
            if batch.is_empty() {
                break;
            }
            for node in &batch {
                context.mark_visited(&node.id);
            }

            let tasks: Vec<_> = batch
                .iter()
                .map(|node| {
                    let node = (*node).clone();
                    let schema = schema.clone();
                    let context_snapshot = context.clone();
                    let registry = self.registry.clone();
                    let runner = runner.clone();
                    let events = events.clone();
                    let cancellation = cancellation.clone();
                    tokio::spawn(async move {
                        run_node(&node, &schema, &context_snapshot, &registry, runner, events, cancellation).await
                    })
                })
                .collect();

            let mut batch_results = Vec::with_capacity(tasks.len());
            for (node, task) in batch.iter().zip(tasks) {
                match task.await {
                    Ok(result) => batch_results.push(((*node).clone(), result)),
                    Err(join_err) => {
                        warn!(node_id = %node.id, error = %join_err, "node task panicked");
                        let failed = NodeResult {
                            node_id: node.id.clone(),
                            status: crate::context::NodeStatus::Failed,
                            output: HashMap::new(),
                            raw_output: None,
                            stdout: None,
                            stderr: None,
                            exit_code: None,
                            structured_output: None,
                            error: Some(join_err.to_string()),
                            start_time: chrono::Utc::now(),
                            end_time: chrono::Utc::now(),
                        };
                        batch_results.push(((*node).clone(), failed));
                    }
                }
            }

            let mut halt = false;
            for (node, result) in &batch_results {
                if result.is_failed() {
                    success = false;
                    if !node.data.continue_on_failure {
                        halt = true;
                    }
                } else {
                    context.record_output(node.id.clone(), result.output.clone());
                }
            }
            results.extend(batch_results.iter().map(|(_, r)| r.clone()));

            if halt {
                break;
            }

            for (node, _) in &batch_results {
                for edge in schema.edges_from(&node.id) {
                    if edge.is_feedback() || context.is_visited(&edge.target) {
                        continue;
                    }
                    if is_ready(&edge.target, &candidates, schema, &context) {
                        frontier.insert(edge.target.clone());
                        events.emit(ExecutionEvent::edge_executed(edge.id.clone(), node.id.clone())).await;
                    }
                }
            }
        }

        (context, success, results, cancelled)
    }
}

#[async_trait]
impl WorkflowRunner for Scheduler {
    async fn run_subgraph(
        &self,
        schema: &WorkflowSchema,
        start_node_ids: Vec<String>,
        context: ExecutionContext,
        events: EventSink,
        cancellation: CancellationToken,
    ) -> Result<SubRunOutcome> {
        if start_node_ids.is_empty() {
            return Err(WorkflowError::NoStartNode);
        }
        if let Some(node_id) = detect_cycle(schema, &start_node_ids) {
            return Err(WorkflowError::CycleDetected { node_id });
        }
        let runner: Arc<dyn WorkflowRunner> = Arc::new(self.clone());
        let (context, success, _results, cancelled) =
            self.execute(schema, start_node_ids, context, runner, events, cancellation).await;
        Ok(SubRunOutcome { context, success: success && !cancelled })
    }
}

async fn run_node(
    node: &WorkflowNode,
    schema: &WorkflowSchema,
    context: &ExecutionContext,
    registry: &NodeRegistry,
    runner: Arc<dyn WorkflowRunner>,
    events: EventSink,
    cancellation: CancellationToken,
) -> NodeResult {
    events.emit(ExecutionEvent::node_start(&node.id)).await;
    let timing = Timing::start();

    let edges: Vec<&WorkflowEdge> = schema.edges_targeting(&node.id).collect();
    let outcome = match resolve::resolve(node, &edges, context) {
        Ok(bindings) => match registry.get(&node.node_kind) {
            Some(executor) => {
                let exec_ctx = NodeExecCtx {
                    node,
                    schema,
                    cwd: &context.cwd,
                    bindings,
                    context,
                    runner,
                    events: events.clone(),
                    cancellation,
                };
                executor.execute(exec_ctx).await.unwrap_or_else(|e| ExecutionOutcome::failed(e.to_string()))
            }
            None => ExecutionOutcome::failed(unknown_kind(&node.node_kind).to_string()),
        },
        Err(e) => ExecutionOutcome::failed(e.to_string()),
    };

    let result = timing.finish(node.id.clone(), &node.data.outputs, outcome);
    events.emit(ExecutionEvent::node_complete(node.id.clone(), result.clone())).await;
    result
}

fn is_ready(
    node_id: &str,
    candidates: &HashMap<&str, &WorkflowNode>,
    schema: &WorkflowSchema,
    context: &ExecutionContext,
) -> bool {
    if !candidates.contains_key(node_id) {
        return false;
    }
    schema
        .edges_targeting(node_id)
        .filter(|e| !e.is_feedback())
        .all(|e| context.has_output(&e.source))
}

fn register_labels(schema: &WorkflowSchema, context: &mut ExecutionContext) {
    for node in &schema.nodes {
        if let Some(label) = node.normalized_label() {
            context.register_label(label, node.id.clone());
        }
    }
}

/// DFS cycle check over the non-feedback edge subgraph reachable from
/// `start`. Only `candidates` (non-container-child) nodes participate.
fn detect_cycle(schema: &WorkflowSchema, start: &[String]) -> Option<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color: HashMap<&str, Color> =
        schema.nodes.iter().filter(|n| !n.is_container_child()).map(|n| (n.id.as_str(), Color::White)).collect();

    fn visit<'a>(schema: &'a WorkflowSchema, node_id: &'a str, color: &mut HashMap<&'a str, Color>) -> Option<String> {
        match color.get(node_id) {
            Some(Color::Black) | None => return None,
            Some(Color::Gray) => return Some(node_id.to_string()),
            Some(Color::White) => {}
        }
        color.insert(node_id, Color::Gray);
        for edge in schema.edges_from(node_id).filter(|e| !e.is_feedback()) {
            if let Some(cycle_node) = visit(schema, &edge.target, color) {
                return Some(cycle_node);
            }
        }
        color.insert(node_id, Color::Black);
        None
    }

    for id in start {
        if let Some(cycle_node) = visit(schema, id, &mut color) {
            return Some(cycle_node);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::channel;
    use crate::nodes::agent::ShellAgentRunner;
    use crate::schema::{Format, Metadata, NodeData, PortDefinition, ValueType, WorkflowEdge};

    fn node(id: &str, kind: &str, data: NodeData) -> WorkflowNode {
        WorkflowNode { id: id.into(), node_kind: kind.into(), position: None, data, parent_id: None, extent: None, style: None }
    }

    fn shell_data(script: &str, outputs: Vec<PortDefinition>) -> NodeData {
        NodeData {
            node_type: "shell".into(),
            label: None,
            inputs: vec![],
            outputs,
            continue_on_failure: false,
            script: Some(script.into()),
            commands: None,
            script_file: None,
            script_args: None,
            path: None,
            prompt: None,
            runner: None,
            model: None,
            prompt_files: None,
            output_schema: None,
            trigger_kind: None,
            cron_expression: None,
            idle_minutes: None,
            workflow_path: None,
            max_iterations: None,
            dock_slots: None,
            value_type: None,
            value: None,
            code: None,
            file: None,
        }
    }

    fn registry() -> NodeRegistry {
        NodeRegistry::with_builtins(Arc::new(ShellAgentRunner))
    }

    #[tokio::test]
    async fn runs_a_two_node_chain_in_dependency_order() {
        let a = node("a", "shell", shell_data("echo hi", vec![PortDefinition::new("stdout", ValueType::String)]));
        let b = node("b", "shell", shell_data("cat", vec![PortDefinition::new("stdout", ValueType::String)]));
        let mut b = b;
        b.data.inputs = vec![PortDefinition::new("stdin_unused", ValueType::String)];
        let schema = WorkflowSchema {
            version: 1,
            metadata: Metadata { name: "t".into(), description: None, root_directory: None },
            nodes: vec![a, b],
            edges: vec![],
        };
        let scheduler = Scheduler::new(registry());
        let (sink, mut rx) = channel(64);
        let outcome = scheduler.run(&schema, RunOptions::default(), sink, CancellationToken::new()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.results.len(), 2);
        rx.close();
    }

    #[tokio::test]
    async fn missing_start_nodes_is_an_error() {
        let schema = WorkflowSchema { version: 1, metadata: Metadata { name: "t".into(), description: None, root_directory: None }, nodes: vec![], edges: vec![] };
        let scheduler = Scheduler::new(registry());
        let (sink, _rx) = channel(16);
        let err = scheduler.run(&schema, RunOptions::default(), sink, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NoStartNode));
    }

    #[tokio::test]
    async fn a_failing_node_stops_downstream_scheduling() {
        let a = node("a", "shell", shell_data("exit 1", vec![]));
        let mut b_data = shell_data("echo never", vec![]);
        b_data.inputs = vec![PortDefinition::new("needed", ValueType::String).required()];
        let b = node("b", "shell", b_data);
        let schema = WorkflowSchema {
            version: 1,
            metadata: Metadata { name: "t".into(), description: None, root_directory: None },
            nodes: vec![a, b],
            edges: vec![WorkflowEdge {
                id: "e1".into(),
                source: "a".into(),
                target: "b".into(),
                source_handle: Some("output:stdout".into()),
                target_handle: Some("input:needed".into()),
            }],
        };
        let scheduler = Scheduler::new(registry());
        let (sink, _rx) = channel(64);
        let outcome = scheduler.run(&schema, RunOptions::default(), sink, CancellationToken::new()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].node_id, "a");
    }

    #[tokio::test]
    async fn detects_cycles_outside_feedback_edges() {
        let a = node("a", "shell", shell_data("echo a", vec![PortDefinition::new("stdout", ValueType::String)]));
        let mut b_data = shell_data("echo b", vec![PortDefinition::new("stdout", ValueType::String)]);
        b_data.inputs = vec![PortDefinition::new("x", ValueType::String)];
        let b = node("b", "shell", b_data);
        let schema = WorkflowSchema {
            version: 1,
            metadata: Metadata { name: "t".into(), description: None, root_directory: None },
            nodes: vec![a, b],
            edges: vec![
                WorkflowEdge {
                    id: "e1".into(),
                    source: "a".into(),
                    target: "b".into(),
                    source_handle: Some("output:stdout".into()),
                    target_handle: Some("input:x".into()),
                },
                WorkflowEdge {
                    id: "e2".into(),
                    source: "b".into(),
                    target: "a".into(),
                    source_handle: Some("output:stdout".into()),
                    target_handle: Some("input:x".into()),
                },
            ],
        };
        let scheduler = Scheduler::new(registry());
        let (sink, _rx) = channel(16);
        let err = scheduler
            .run(&schema, RunOptions { start_node_ids: Some(vec!["a".into()]), ..Default::default() }, sink, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::CycleDetected { .. }));
    }

    #[test]
    fn format_is_reexported_for_callers_that_load_workflows() {
        let _ = Format::Yaml;
    }
}
