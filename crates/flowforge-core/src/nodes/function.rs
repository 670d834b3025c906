//! `function` node: runs `code` inline, or the contents of `file`, as a
//! short JavaScript body with `inputs.*` in scope, returning an object
//! mapped to the node's declared outputs.
//!
//! Uses `boa_engine`, a pure-Rust JS interpreter, rather than shelling
//! out to `node` — the function body is meant to be a pure, short
//! transform, not a place to reach for `script` node's process
//! semantics.

use super::{ExecutionOutcome, NodeExecCtx, NodeExecutor};
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use boa_engine::{Context, Source};
use serde_json::Value;
use std::collections::HashMap;

pub struct FunctionExecutor;

#[async_trait]
impl NodeExecutor for FunctionExecutor {
    async fn execute(&self, exec: NodeExecCtx<'_>) -> Result<ExecutionOutcome> {
        let node_id = exec.node.id.clone();
        let code = if let Some(code) = exec.node.data.code.clone() {
            code
        } else if let Some(file) = exec.node.data.file.clone() {
            let path = exec.cwd.join(&file);
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| WorkflowError::FunctionFailed { node_id: node_id.clone(), message: format!("reading {file}: {e}") })?
        } else {
            return Err(WorkflowError::FunctionFailed {
                node_id,
                message: "function node has neither `code` nor `file`".to_string(),
            });
        };

        let inputs = serde_json::to_value(&exec.bindings)?;
        let result = tokio::task::spawn_blocking(move || run_js(&code, &inputs))
            .await
            .map_err(|e| WorkflowError::FunctionFailed { node_id: node_id.clone(), message: e.to_string() })?
            .map_err(|message| WorkflowError::FunctionFailed { node_id, message })?;

        let raw: HashMap<String, Value> = match result {
            Value::Object(map) => map.into_iter().collect(),
            other => HashMap::from([("result".to_string(), other)]),
        };
        Ok(ExecutionOutcome::completed(raw))
    }
}

fn run_js(code: &str, inputs: &Value) -> std::result::Result<Value, String> {
    let mut context = Context::default();
    // A short body is expected to `return` explicitly; a bare expression
    // (no `return` anywhere in it) is implicitly returned.
    let body = if code.contains("return") {
        code.to_string()
    } else {
        format!("return ({code});")
    };
    let wrapped = format!("(function() {{ const inputs = {inputs}; {body} }})()");
    let value = context
        .eval(Source::from_bytes(&wrapped))
        .map_err(|e| format!("script error: {e}"))?;
    value.to_json(&mut context).map_err(|e| format!("result is not JSON-representable: {e}"))
}
