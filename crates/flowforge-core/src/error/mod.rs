//! Error handling for the workflow engine.
//!
//! Every node kind, resolver, and scheduler stage returns a
//! [`WorkflowError`] on failure; [`Result`] is the crate-wide alias.
//! There is no automatic retry layer here: agent invocation is not
//! exactly-once, and a retrying wrapper would imply otherwise.

pub mod types;

pub use types::{ErrorCategory, WorkflowError};

/// Result type used throughout the workflow engine.
pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_and_topological_errors_abort_before_execution() {
        let err = WorkflowError::NoStartNode;
        assert!(err.category().aborts_before_execution());

        let err = WorkflowError::MissingRequired {
            node_id: "n1".into(),
            input_name: "needed".into(),
        };
        assert!(!err.category().aborts_before_execution());
    }

    #[test]
    fn cancellation_is_its_own_category() {
        assert_eq!(WorkflowError::Cancelled.category(), ErrorCategory::Cancellation);
    }
}
