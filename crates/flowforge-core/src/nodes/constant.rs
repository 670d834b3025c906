//! `constant` node: validates that the runtime type of `value` matches
//! the declared `valueType` (one of `boolean`, `number`, `string`) and
//! outputs `{ value }`.

use super::{ExecutionOutcome, NodeExecCtx, NodeExecutor};
use crate::error::{Result, WorkflowError};
use crate::schema::ValueType;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

pub struct ConstantExecutor;

fn matches_declared_type(value: &Value, declared: ValueType) -> bool {
    match declared {
        ValueType::Boolean => value.is_boolean(),
        ValueType::Number => value.is_number(),
        ValueType::String => value.is_string(),
        _ => false,
    }
}

#[async_trait]
impl NodeExecutor for ConstantExecutor {
    async fn execute(&self, exec: NodeExecCtx<'_>) -> Result<ExecutionOutcome> {
        let declared = exec.node.data.value_type.unwrap_or(ValueType::Any);
        let value = exec.node.data.value.clone().unwrap_or(Value::Null);

        if !matches!(declared, ValueType::Any) && !matches_declared_type(&value, declared) {
            return Err(WorkflowError::InvalidConstantType { node_id: exec.node.id.clone(), declared });
        }

        let mut raw = HashMap::new();
        raw.insert("value".to_string(), value);
        Ok(ExecutionOutcome::completed(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_matches_only_boolean_values() {
        assert!(matches_declared_type(&Value::Bool(true), ValueType::Boolean));
        assert!(!matches_declared_type(&Value::String("true".into()), ValueType::Boolean));
    }

    #[test]
    fn number_and_string_checks() {
        assert!(matches_declared_type(&Value::from(3), ValueType::Number));
        assert!(matches_declared_type(&Value::String("x".into()), ValueType::String));
        assert!(!matches_declared_type(&Value::from(3), ValueType::String));
    }
}
