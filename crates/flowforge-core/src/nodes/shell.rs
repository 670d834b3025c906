//! `shell` node: runs the `script` field (falling back to `commands[]`
//! joined with `&&`) under `sh -c` in the node's working directory,
//! inheriting the process environment.

use super::{ExecutionOutcome, NodeExecCtx, NodeExecutor};
use crate::error::{Result, WorkflowError};
use crate::template::resolve_node_fields;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

pub struct ShellExecutor;

#[async_trait]
impl NodeExecutor for ShellExecutor {
    async fn execute(&self, exec: NodeExecCtx<'_>) -> Result<ExecutionOutcome> {
        let fields = resolve_node_fields(&exec.node.data, exec.context, &exec.bindings);
        let script = fields
            .script
            .or_else(|| fields.commands.map(|cs| cs.join(" && ")))
            .ok_or_else(|| WorkflowError::ProcessFailed { node_id: exec.node.id.clone(), exit_code: -1 })?;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&script)
            .current_dir(exec.cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| WorkflowError::Io { message: format!("failed to spawn shell: {e}") })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let status = tokio::select! {
            status = child.wait() => status.map_err(WorkflowError::from)?,
            _ = exec.cancellation.cancelled() => {
                let _ = child.kill().await;
                return Err(WorkflowError::Cancelled);
            }
        };

        let mut stdout = String::new();
        if let Some(pipe) = stdout_pipe.as_mut() {
            let _ = pipe.read_to_string(&mut stdout).await;
        }
        let mut stderr = String::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_string(&mut stderr).await;
        }
        let stdout = stdout.trim_end().to_string();
        let stderr = stderr.trim_end().to_string();

        if !stdout.is_empty() {
            exec.events.emit(crate::events::ExecutionEvent::node_output(&exec.node.id, stdout.clone())).await;
        }

        let exit_code = status.code().unwrap_or(-1);
        let mut raw: HashMap<String, Value> = HashMap::new();
        raw.insert("stdout".to_string(), Value::String(stdout.clone()));
        raw.insert("stderr".to_string(), Value::String(stderr.clone()));
        raw.insert("exitCode".to_string(), Value::from(exit_code));

        let outcome = ExecutionOutcome::completed(raw).with_stdio(Some(stdout), Some(stderr), Some(exit_code));
        if exit_code != 0 {
            return Ok(ExecutionOutcome {
                error: Some(format!("process exited with status {exit_code}")),
                ..ExecutionOutcome { status: crate::context::NodeStatus::Failed, ..outcome }
            });
        }
        Ok(outcome)
    }
}
