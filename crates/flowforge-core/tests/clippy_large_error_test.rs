//! Guards against `WorkflowError` growing a variant large enough to bloat
//! every `Result<T, WorkflowError>` in the engine (clippy's
//! `large_enum_variant` lint).

use flowforge_core::error::WorkflowError;

#[test]
fn test_workflow_error_size() {
    let error_size = std::mem::size_of::<WorkflowError>();
    assert!(error_size <= 128, "WorkflowError size is {error_size} bytes, which is too large");
}

#[test]
fn test_result_size() {
    let result_unit_size = std::mem::size_of::<Result<(), WorkflowError>>();
    let result_string_size = std::mem::size_of::<Result<String, WorkflowError>>();
    let result_value_size = std::mem::size_of::<Result<serde_json::Value, WorkflowError>>();

    assert!(result_unit_size <= 136, "Result<(), WorkflowError> is too large");
    assert!(result_string_size <= 160, "Result<String, WorkflowError> is too large");
    assert!(result_value_size <= 160, "Result<Value, WorkflowError> is too large");
}
