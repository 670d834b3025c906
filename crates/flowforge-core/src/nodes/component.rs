//! `component` node: loads the workflow document at `workflowPath`
//! (resolved relative to the running node's `cwd`) and runs it as a
//! sub-run, passing the node's resolved bindings as that sub-run's
//! `workflowInputs`. The sub-run's `interface-output` bindings become
//! this node's structured output.

use super::{ExecutionOutcome, NodeExecCtx, NodeExecutor};
use crate::context::ExecutionContext;
use crate::error::{Result, WorkflowError};
use crate::schema::{self, default_start_nodes, Format};
use async_trait::async_trait;
use serde_json::Value;

pub struct ComponentExecutor;

#[async_trait]
impl NodeExecutor for ComponentExecutor {
    async fn execute(&self, exec: NodeExecCtx<'_>) -> Result<ExecutionOutcome> {
        let node_id = exec.node.id.clone();
        let workflow_path = exec.node.data.workflow_path.clone().ok_or_else(|| WorkflowError::ComponentFailed {
            node_id: node_id.clone(),
            message: "component node missing workflowPath".to_string(),
        })?;

        let resolved = exec.cwd.join(&workflow_path);
        let bytes = tokio::fs::read(&resolved).await.map_err(|e| WorkflowError::ComponentFailed {
            node_id: node_id.clone(),
            message: format!("reading {workflow_path}: {e}"),
        })?;
        let format = if workflow_path.ends_with(".json") { Format::Json } else { Format::Yaml };
        let sub_schema = schema::parse(&bytes, format).map_err(|e| WorkflowError::ComponentFailed {
            node_id: node_id.clone(),
            message: e.to_string(),
        })?;

        let start = default_start_nodes(&sub_schema);
        let sub_context = ExecutionContext::new(exec.bindings.clone()).with_cwd(exec.cwd.to_path_buf());
        let outcome = exec
            .runner
            .run_subgraph(&sub_schema, start, sub_context, exec.events.clone(), exec.cancellation.clone())
            .await?;

        if !outcome.success {
            return Ok(ExecutionOutcome::failed(format!("component {node_id} sub-run failed")));
        }

        let output_node = sub_schema.nodes.iter().find(|n| n.node_kind == "interface-output");
        let raw = output_node
            .and_then(|n| outcome.context.outputs_snapshot().get(&n.id))
            .cloned()
            .unwrap_or_default();
        let structured = Value::Object(raw.clone().into_iter().collect());
        Ok(ExecutionOutcome::completed(raw).with_structured(Some(structured)))
    }
}
