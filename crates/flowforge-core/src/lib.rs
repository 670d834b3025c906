//! # flowforge-core
//!
//! Schema, resolvers, node executors, and the level-set scheduler that
//! together run a dataflow workflow document end to end.
//!
//! ## Core concepts
//!
//! - [`schema::WorkflowSchema`]: the parsed workflow document — typed
//!   nodes and edges, validated against the handle-id grammar.
//! - [`context::ExecutionContext`]: the mutable state a run carries
//!   between batches — recorded outputs, labels, and (inside a loop's
//!   inner sub-graph) dock values.
//! - [`nodes::NodeExecutor`]: one implementation per node kind, wired up
//!   via [`nodes::NodeRegistry::with_builtins`].
//! - [`scheduler::Scheduler`]: dispatches ready nodes level by level and
//!   implements [`runner::WorkflowRunner`] for loop/component recursion.
//! - [`events::ExecutionEvent`]: the ordered event stream a run emits,
//!   consumed by the API's SSE endpoint and the history recorder.
//!
//! ## Example
//!
//! ```no_run
//! use flowforge_core::nodes::NodeRegistry;
//! use flowforge_core::nodes::agent::ShellAgentRunner;
//! use flowforge_core::scheduler::{RunOptions, Scheduler};
//! use flowforge_core::{events, schema};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> flowforge_core::error::Result<()> {
//! let bytes = std::fs::read("workflow.yaml").unwrap();
//! let doc = schema::parse(&bytes, schema::Format::Yaml)?;
//!
//! let registry = NodeRegistry::with_builtins(Arc::new(ShellAgentRunner));
//! let scheduler = Scheduler::new(registry);
//! let (sink, _events) = events::channel(64);
//!
//! let outcome = scheduler
//!     .run(&doc, RunOptions::default(), sink, CancellationToken::new())
//!     .await?;
//! assert!(outcome.success);
//! # Ok(())
//! # }
//! ```

pub mod array_slots;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod history;
pub mod nodes;
pub mod resolve;
pub mod runner;
pub mod scheduler;
pub mod schema;
pub mod template;

pub mod testing;

pub use config::EngineConfig;
pub use context::{DockContext, ExecutionContext, NodeResult, NodeStatus};
pub use error::{ErrorCategory, Result, WorkflowError};
pub use events::{channel, EventSink, ExecutionEvent};
pub use history::{HistoryStore, RunRecord, RunSource, RunStatus, RunSummary};
pub use nodes::{NodeExecutor, NodeRegistry};
pub use runner::{SubRunOutcome, WorkflowRunner};
pub use scheduler::{RunOptions, RunOutcome, Scheduler};
pub use schema::{parse, serialize, validate, Format, WorkflowSchema};

/// Current version of flowforge-core, re-exported for `--version` output
/// in the CLI and API binaries.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports for crates building on top of the engine.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::context::ExecutionContext;
    pub use crate::error::{Result, WorkflowError};
    pub use crate::events::{EventSink, ExecutionEvent};
    pub use crate::nodes::{NodeExecutor, NodeRegistry};
    pub use crate::runner::WorkflowRunner;
    pub use crate::scheduler::{RunOptions, RunOutcome, Scheduler};
    pub use crate::schema::{Format, WorkflowSchema};
    pub use async_trait::async_trait;
    pub use serde_json::{json, Value};
}
