//! `trigger` node: no execution, just shapes whatever invocation metadata
//! the caller (manual run or the trigger scheduler) seeded into
//! `context.workflow_inputs` into this node's outputs.

use super::{ExecutionOutcome, NodeExecCtx, NodeExecutor};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

pub struct TriggerExecutor;

#[async_trait]
impl NodeExecutor for TriggerExecutor {
    async fn execute(&self, exec: NodeExecCtx<'_>) -> Result<ExecutionOutcome> {
        let inputs = &exec.context.workflow_inputs;
        let mut raw: HashMap<String, Value> = HashMap::new();
        raw.insert("timestamp".to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
        raw.insert(
            "type".to_string(),
            inputs.get("type").cloned().unwrap_or_else(|| Value::String("manual".into())),
        );
        raw.insert("text".to_string(), inputs.get("text").cloned().unwrap_or(Value::Null));
        raw.insert(
            "params".to_string(),
            inputs.get("params").cloned().unwrap_or_else(|| Value::Object(Default::default())),
        );
        Ok(ExecutionOutcome::completed(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::events::channel;
    use crate::schema::{NodeData, WorkflowNode};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct NoopRunner;
    #[async_trait]
    impl crate::runner::WorkflowRunner for NoopRunner {
        async fn run_subgraph(
            &self,
            _schema: &crate::schema::WorkflowSchema,
            _start: Vec<String>,
            context: ExecutionContext,
            _events: crate::events::EventSink,
            _cancellation: CancellationToken,
        ) -> Result<crate::runner::SubRunOutcome> {
            Ok(crate::runner::SubRunOutcome { context, success: true })
        }
    }

    #[tokio::test]
    async fn produces_timestamp_and_passthrough_fields() {
        let node = WorkflowNode {
            id: "t1".into(),
            node_kind: "trigger".into(),
            position: None,
            data: NodeData {
                node_type: "trigger".into(),
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
        };
        let mut inputs = HashMap::new();
        inputs.insert("text".to_string(), Value::String("go".into()));
        let ctx = ExecutionContext::new(inputs);
        let (sink, _rx) = channel(16);
        let schema = crate::schema::WorkflowSchema::minimal("t");
        let exec = NodeExecCtx {
            node: &node,
            schema: &schema,
            cwd: std::path::Path::new("."),
            bindings: HashMap::new(),
            context: &ctx,
            runner: Arc::new(NoopRunner),
            events: sink,
            cancellation: CancellationToken::new(),
        };
        let outcome = TriggerExecutor.execute(exec).await.unwrap();
        assert_eq!(outcome.raw.get("text"), Some(&Value::String("go".into())));
        assert!(outcome.raw.contains_key("timestamp"));
    }
}
