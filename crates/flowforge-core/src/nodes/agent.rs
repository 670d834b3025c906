//! `agent` node and the `AgentRunner` boundary. The core makes no
//! assumption about the backend beyond the contract in
//! `AgentRunner(cfg) -> {success, output, structuredOutput?, error?}`; an
//! agent's implementation internals are explicitly out of scope.

use super::{ExecutionOutcome, NodeExecCtx, NodeExecutor};
use crate::error::{Result, WorkflowError};
use crate::template::resolve_node_fields;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Configuration passed to an [`AgentRunner`] for a single invocation.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub runner: String,
    pub model: Option<String>,
    pub prompt: String,
    pub prompt_files: Vec<String>,
    pub output_schema: Option<Value>,
    pub cwd: PathBuf,
    pub inputs: HashMap<String, Value>,
}

/// What an [`AgentRunner`] reports back for one invocation.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub success: bool,
    pub output: String,
    pub structured_output: Option<Value>,
    pub error: Option<String>,
}

/// The consumed interface this engine depends on for agent invocations.
/// Everything about how a backend actually talks to a model is outside
/// this crate's scope.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, cfg: AgentConfig) -> Result<AgentOutcome>;
}

/// A local, process-based `AgentRunner`: shells out to the executable
/// named in `runner` (e.g. `claude`, `codex`), writes the prompt to its
/// stdin, and reads its stdout as the response. Useful for local testing
/// and as a reference implementation of the boundary; production
/// deployments are expected to supply their own `AgentRunner`.
pub struct ShellAgentRunner;

#[async_trait]
impl AgentRunner for ShellAgentRunner {
    async fn run(&self, cfg: AgentConfig) -> Result<AgentOutcome> {
        let mut command = Command::new(&cfg.runner);
        if let Some(model) = &cfg.model {
            command.arg("--model").arg(model);
        }
        command
            .current_dir(&cfg.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| WorkflowError::AgentFailed { node_id: String::new(), message: e.to_string() })?;

        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(cfg.prompt.as_bytes()).await;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| WorkflowError::AgentFailed { node_id: String::new(), message: e.to_string() })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        if !output.status.success() {
            return Ok(AgentOutcome { success: false, output: stdout, structured_output: None, error: Some(stderr) });
        }

        let structured = cfg
            .output_schema
            .as_ref()
            .and_then(|_| serde_json::from_str::<Value>(&stdout).ok());

        Ok(AgentOutcome { success: true, output: stdout, structured_output: structured, error: None })
    }
}

pub struct AgentExecutor {
    runner: Arc<dyn AgentRunner>,
}

impl AgentExecutor {
    pub fn new(runner: Arc<dyn AgentRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl NodeExecutor for AgentExecutor {
    async fn execute(&self, exec: NodeExecCtx<'_>) -> Result<ExecutionOutcome> {
        let fields = resolve_node_fields(&exec.node.data, exec.context, &exec.bindings);
        let runner_name = exec.node.data.runner.clone().ok_or_else(|| WorkflowError::AgentFailed {
            node_id: exec.node.id.clone(),
            message: "agent node missing `runner` field".to_string(),
        })?;
        let prompt = fields.prompt.unwrap_or_default();

        let cfg = AgentConfig {
            runner: runner_name,
            model: exec.node.data.model.clone(),
            prompt,
            prompt_files: exec.node.data.prompt_files.clone().unwrap_or_default(),
            output_schema: exec.node.data.output_schema.clone(),
            cwd: exec.cwd.to_path_buf(),
            inputs: exec.bindings.clone(),
        };

        let outcome = self.runner.run(cfg).await.map_err(|e| match e {
            WorkflowError::AgentFailed { message, .. } => {
                WorkflowError::AgentFailed { node_id: exec.node.id.clone(), message }
            }
            other => other,
        })?;

        if !outcome.success {
            return Ok(ExecutionOutcome::failed(
                outcome.error.unwrap_or_else(|| "agent runner reported failure".to_string()),
            ));
        }

        let mut raw: HashMap<String, Value> = HashMap::new();
        raw.insert("response".to_string(), Value::String(outcome.output.clone()));
        if let Some(structured) = &outcome.structured_output {
            raw.insert("structured".to_string(), structured.clone());
        }
        Ok(ExecutionOutcome::completed(raw)
            .with_stdio(Some(outcome.output), None, None)
            .with_structured(outcome.structured_output))
    }
}
