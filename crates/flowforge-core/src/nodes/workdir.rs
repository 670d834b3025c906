//! `workdir` node: pure, emits its configured path.

use super::{ExecutionOutcome, NodeExecCtx, NodeExecutor};
use crate::error::Result;
use crate::template::resolve_node_fields;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

pub struct WorkdirExecutor;

#[async_trait]
impl NodeExecutor for WorkdirExecutor {
    async fn execute(&self, exec: NodeExecCtx<'_>) -> Result<ExecutionOutcome> {
        let fields = resolve_node_fields(&exec.node.data, exec.context, &exec.bindings);
        let path = fields.path.unwrap_or_default();
        let mut raw = HashMap::new();
        raw.insert("path".to_string(), Value::String(path));
        Ok(ExecutionOutcome::completed(raw))
    }
}
