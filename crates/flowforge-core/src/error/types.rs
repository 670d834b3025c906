//! Error types for the workflow engine.
//!
//! All fallible operations in `flowforge-core` return a [`WorkflowError`].
//! Variants are grouped by the taxonomy the engine distinguishes at
//! runtime: structural (schema-level), topological (graph shape),
//! input resolution, execution, and cancellation.

use crate::schema::ValueType;

/// The error type shared across the workflow engine.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    // --- Structural ---------------------------------------------------
    /// Schema failed to parse, or parsed to an unsupported version.
    #[error("invalid workflow schema: {message}")]
    SchemaInvalid { message: String },

    /// Schema version is newer than this engine understands.
    #[error("unsupported schema version {version}, max supported is {max_supported}")]
    UnsupportedVersion { version: u64, max_supported: u64 },

    /// A node or edge reference in the schema does not resolve.
    #[error("dangling reference: {kind} {id:?} not found")]
    DanglingReference { kind: &'static str, id: String },

    // --- Topological ----------------------------------------------------
    /// No runnable start node could be determined for the workflow.
    #[error("workflow has no start nodes")]
    NoStartNode,

    /// `startNodeIds` named a node id that does not exist in the graph.
    #[error("start node not found: {node_id}")]
    StartNodeNotFound { node_id: String },

    /// The graph contains a cycle reachable from the start set.
    #[error("workflow contains a cycle involving node {node_id}")]
    CycleDetected { node_id: String },

    // --- Input resolution -----------------------------------------------
    /// A required input has neither an incoming edge nor a default value.
    #[error("node {node_id} is missing required input {input_name}")]
    MissingRequired { node_id: String, input_name: String },

    /// Two edges target the same input handle on a node.
    #[error("node {node_id} has duplicate edges targeting input {input_name}")]
    DuplicateInput { node_id: String, input_name: String },

    /// An edge names a source node/output that has not produced a value.
    #[error("node {node_id} input {input_name} references missing output {source_node}.{source_output}")]
    MissingOutput {
        node_id: String,
        input_name: String,
        source_node: String,
        source_output: String,
    },

    /// An edge connects ports whose declared types are incompatible.
    #[error("type mismatch on node {node_id} input {input_name}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        node_id: String,
        input_name: String,
        expected: ValueType,
        actual: ValueType,
    },

    // --- Execution --------------------------------------------------------
    /// No executor is registered for the node's declared kind.
    #[error("unknown node kind: {kind}")]
    UnknownNodeKind { kind: String },

    /// A shell or script node exited with a non-zero status.
    #[error("node {node_id} exited with status {exit_code}")]
    ProcessFailed { node_id: String, exit_code: i32 },

    /// The configured `AgentRunner` reported a failure.
    #[error("agent node {node_id} failed: {message}")]
    AgentFailed { node_id: String, message: String },

    /// A `constant` node's `value` does not match its declared `valueType`.
    #[error("constant node {node_id} value does not match declared type {declared:?}")]
    InvalidConstantType { node_id: String, declared: ValueType },

    /// A loop node's inner graph is missing a required interface node, or
    /// `interface-continue.continue` has no incoming edge.
    #[error("loop {node_id} is invalid: {reason}")]
    InvalidLoop { node_id: String, reason: String },

    /// A `function` node's inline code or file export failed.
    #[error("function node {node_id} failed: {message}")]
    FunctionFailed { node_id: String, message: String },

    /// A `component` node's referenced sub-workflow could not be loaded or run.
    #[error("component node {node_id} failed: {message}")]
    ComponentFailed { node_id: String, message: String },

    /// Underlying I/O failure (spawning a process, reading a workflow file, etc).
    #[error("I/O error: {message}")]
    Io { message: String },

    // --- Cancellation -----------------------------------------------------
    /// The run was cancelled by the caller before it completed.
    #[error("run cancelled")]
    Cancelled,
}

impl From<std::io::Error> for WorkflowError {
    fn from(err: std::io::Error) -> Self {
        WorkflowError::Io { message: err.to_string() }
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::SchemaInvalid { message: err.to_string() }
    }
}

impl From<serde_yaml::Error> for WorkflowError {
    fn from(err: serde_yaml::Error) -> Self {
        WorkflowError::SchemaInvalid { message: err.to_string() }
    }
}

impl WorkflowError {
    /// Which part of the taxonomy in the error handling design this falls under.
    pub fn category(&self) -> ErrorCategory {
        use WorkflowError::*;
        match self {
            SchemaInvalid { .. } | UnsupportedVersion { .. } | DanglingReference { .. } => {
                ErrorCategory::Structural
            }
            NoStartNode | StartNodeNotFound { .. } | CycleDetected { .. } => {
                ErrorCategory::Topological
            }
            MissingRequired { .. }
            | DuplicateInput { .. }
            | MissingOutput { .. }
            | TypeMismatch { .. } => ErrorCategory::InputResolution,
            Cancelled => ErrorCategory::Cancellation,
            _ => ErrorCategory::Execution,
        }
    }
}

/// Coarse classification of a [`WorkflowError`], used for logging and for
/// deciding whether an error may abort the run before any node executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Structural,
    Topological,
    InputResolution,
    Execution,
    Cancellation,
}

impl ErrorCategory {
    /// Structural and topological errors abort the run before `node-start`
    /// is emitted for any node; the others are captured per-node.
    pub fn aborts_before_execution(self) -> bool {
        matches!(self, ErrorCategory::Structural | ErrorCategory::Topological)
    }
}
