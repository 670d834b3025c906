//! The recursive entry point a `loop` or `component` node uses to run an
//! inner sub-graph. Implemented by [`crate::scheduler::Scheduler`]; kept
//! as a trait here so the `nodes` module (which implements loop/component
//! executors) never needs to depend on the scheduler module, only the
//! reverse.

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::events::EventSink;
use crate::schema::WorkflowSchema;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Outcome of running a sub-graph: the execution context it produced
/// (carrying recorded outputs) and whether the sub-run succeeded.
pub struct SubRunOutcome {
    pub context: ExecutionContext,
    pub success: bool,
}

#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    /// Run `schema`'s nodes reachable from `start_node_ids`, reusing
    /// `context` as the initial state (its `dock`, `workflow_inputs`, and
    /// any pre-seeded outputs are honored). Used by the Loop Executor for
    /// each iteration and by the `component` node for sub-workflow runs.
    async fn run_subgraph(
        &self,
        schema: &WorkflowSchema,
        start_node_ids: Vec<String>,
        context: ExecutionContext,
        events: EventSink,
        cancellation: CancellationToken,
    ) -> Result<SubRunOutcome>;
}
