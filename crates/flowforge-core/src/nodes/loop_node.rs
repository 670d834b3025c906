//! `loop` node: runs its inner sub-graph (nodes with `parentId` equal to
//! this node's id) once per iteration, feeding `prev`/`current` values
//! through declared feedback dock slots until `interface-continue`
//! reports false, `maxIterations` is reached, or the sub-run fails.

use super::{ExecutionOutcome, NodeExecCtx, NodeExecutor};
use crate::context::{DockContext, ExecutionContext};
use crate::error::{Result, WorkflowError};
use crate::events::ExecutionEvent;
use crate::schema::{default_start_nodes, DockSlotKind, WorkflowSchema};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

const DEFAULT_MAX_ITERATIONS: u32 = 10;

pub struct LoopExecutor;

#[async_trait]
impl NodeExecutor for LoopExecutor {
    async fn execute(&self, exec: NodeExecCtx<'_>) -> Result<ExecutionOutcome> {
        let loop_id = exec.node.id.clone();
        let max_iterations = exec.node.data.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        let feedback_slots: Vec<String> = exec
            .node
            .data
            .dock_slots
            .iter()
            .flatten()
            .filter(|s| s.kind == DockSlotKind::Feedback)
            .map(|s| s.name.clone())
            .collect();

        let inner_schema = inner_subgraph(exec.schema, &loop_id);
        let inner_start = default_start_nodes(&inner_schema);

        let mut prev_outputs: HashMap<String, Value> = HashMap::new();
        let mut final_outputs: Option<HashMap<String, Value>> = None;
        let mut iteration = 0u32;

        loop {
            if exec.cancellation.is_cancelled() {
                return Err(WorkflowError::Cancelled);
            }
            iteration += 1;
            exec.events.emit(ExecutionEvent::iteration_start(&loop_id, iteration)).await;

            let mut dock = DockContext::default();
            for slot in &feedback_slots {
                let prev = prev_outputs.get(slot).cloned().unwrap_or(Value::Null);
                dock.insert(format!("dock:{slot}:prev"), prev.clone());
                dock.insert(format!("dock:{slot}:current"), prev);
            }
            dock.insert("dock:iteration:output", Value::from(iteration));
            for (name, value) in &exec.bindings {
                dock.insert(format!("input:{name}"), value.clone());
            }

            let mut iteration_inputs = exec.bindings.clone();
            iteration_inputs.insert("iteration".to_string(), Value::from(iteration));
            for slot in &feedback_slots {
                iteration_inputs.insert(
                    format!("prev.{slot}"),
                    prev_outputs.get(slot).cloned().unwrap_or(Value::Null),
                );
            }

            let sub_context = ExecutionContext::new(iteration_inputs).with_dock(dock).with_cwd(exec.cwd.to_path_buf());
            let outcome = exec
                .runner
                .run_subgraph(
                    &inner_schema,
                    inner_start.clone(),
                    sub_context,
                    exec.events.clone(),
                    exec.cancellation.clone(),
                )
                .await?;

            exec.events.emit(ExecutionEvent::iteration_complete(&loop_id, iteration, outcome.success)).await;

            if !outcome.success {
                return Ok(ExecutionOutcome::failed(format!(
                    "loop {loop_id} iteration {iteration} failed"
                )));
            }

            let output_node = inner_schema.nodes.iter().find(|n| n.node_kind == "interface-output");
            let continue_node = inner_schema.nodes.iter().find(|n| n.node_kind == "interface-continue");

            let current_outputs = output_node
                .and_then(|n| outcome.context.outputs_snapshot().get(&n.id))
                .cloned()
                .unwrap_or_default();
            let keep_going = continue_node
                .and_then(|n| outcome.context.get_output(&n.id, "continue"))
                .map(is_truthy)
                .unwrap_or(false);

            prev_outputs = current_outputs.clone();
            final_outputs = Some(current_outputs);

            if !keep_going || iteration >= max_iterations {
                break;
            }
        }

        let final_outputs = final_outputs.unwrap_or_default();
        let structured = Value::Object(final_outputs.clone().into_iter().collect());
        Ok(ExecutionOutcome::completed(final_outputs).with_structured(Some(structured)))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        _ => true,
    }
}

/// Build a schema view over just `loopId`'s inner nodes, keeping the
/// parent's edges among them (needed for the inner graph's own dependency
/// analysis).
fn inner_subgraph(schema: &WorkflowSchema, loop_id: &str) -> WorkflowSchema {
    let child_ids: std::collections::HashSet<&str> =
        schema.children_of(loop_id).into_iter().map(|n| n.id.as_str()).collect();
    // `default_start_nodes` treats a `parentId`-carrying node as a
    // container child to exclude it from the outer run; once lifted into
    // its own sub-schema it's a top-level node again.
    let nodes = schema
        .children_of(loop_id)
        .into_iter()
        .cloned()
        .map(|mut n| {
            n.parent_id = None;
            n.extent = None;
            n
        })
        .collect();
    let edges = schema
        .edges
        .iter()
        .filter(|e| child_ids.contains(e.source.as_str()) && child_ids.contains(e.target.as_str()))
        .cloned()
        .collect();
    WorkflowSchema { version: schema.version, metadata: schema.metadata.clone(), nodes, edges }
}
