//! The three dock-facing interface nodes every loop (and component)
//! inner graph carries: `interface-input` surfaces the enclosing run's
//! inputs, `interface-output` surfaces the inner graph's result back
//! out, and `interface-continue` surfaces the loop's termination signal.
//! All three are pure pass-throughs; `buildOutputValues` does the work
//! of mapping their raw bindings onto declared output ports by name.

use super::{ExecutionOutcome, NodeExecCtx, NodeExecutor};
use crate::error::Result;
use async_trait::async_trait;

pub struct InterfaceInputExecutor;

#[async_trait]
impl NodeExecutor for InterfaceInputExecutor {
    async fn execute(&self, exec: NodeExecCtx<'_>) -> Result<ExecutionOutcome> {
        Ok(ExecutionOutcome::completed(exec.context.workflow_inputs.clone()))
    }
}

pub struct InterfaceOutputExecutor;

#[async_trait]
impl NodeExecutor for InterfaceOutputExecutor {
    async fn execute(&self, exec: NodeExecCtx<'_>) -> Result<ExecutionOutcome> {
        Ok(ExecutionOutcome::completed(exec.bindings))
    }
}

pub struct InterfaceContinueExecutor;

#[async_trait]
impl NodeExecutor for InterfaceContinueExecutor {
    async fn execute(&self, exec: NodeExecCtx<'_>) -> Result<ExecutionOutcome> {
        Ok(ExecutionOutcome::completed(exec.bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::events::channel;
    use crate::runner::{SubRunOutcome, WorkflowRunner};
    use crate::schema::{NodeData, WorkflowNode};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct NoopWorkflowRunner;
    #[async_trait]
    impl WorkflowRunner for NoopWorkflowRunner {
        async fn run_subgraph(
            &self,
            _schema: &crate::schema::WorkflowSchema,
            _start: Vec<String>,
            context: ExecutionContext,
            _events: crate::events::EventSink,
            _cancellation: CancellationToken,
        ) -> Result<SubRunOutcome> {
            Ok(SubRunOutcome { context, success: true })
        }
    }

    fn node(kind: &str) -> WorkflowNode {
        WorkflowNode {
            id: "i1".into(),
            node_kind: kind.into(),
            position: None,
            data: NodeData {
                node_type: kind.into(),
                label: None,
                inputs: vec![],
                outputs: vec![],
                continue_on_failure: false,
                script: None,
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
            },
            parent_id: None,
            extent: None,
            style: None,
        }
    }

    #[tokio::test]
    async fn interface_input_surfaces_workflow_inputs() {
        let n = node("interface-input");
        let ctx = ExecutionContext::new(HashMap::from([("greeting".to_string(), serde_json::json!("hi"))]));
        let (sink, _rx) = channel(16);
        let schema = crate::schema::WorkflowSchema::minimal("t");
        let exec = NodeExecCtx {
            node: &n,
            schema: &schema,
            cwd: std::path::Path::new("."),
            bindings: HashMap::new(),
            context: &ctx,
            runner: Arc::new(NoopWorkflowRunner),
            events: sink,
            cancellation: CancellationToken::new(),
        };
        let outcome = InterfaceInputExecutor.execute(exec).await.unwrap();
        assert_eq!(outcome.raw.get("greeting"), Some(&serde_json::json!("hi")));
    }

    #[tokio::test]
    async fn interface_continue_echoes_its_bindings() {
        let n = node("interface-continue");
        let ctx = ExecutionContext::new(HashMap::new());
        let (sink, _rx) = channel(16);
        let bindings = HashMap::from([("continue".to_string(), serde_json::json!(true))]);
        let schema = crate::schema::WorkflowSchema::minimal("t");
        let exec = NodeExecCtx {
            node: &n,
            schema: &schema,
            cwd: std::path::Path::new("."),
            bindings: bindings.clone(),
            context: &ctx,
            runner: Arc::new(NoopWorkflowRunner),
            events: sink,
            cancellation: CancellationToken::new(),
        };
        let outcome = InterfaceContinueExecutor.execute(exec).await.unwrap();
        assert_eq!(outcome.raw, bindings);
    }
}
