//! Input Resolver: given a node and the set of incoming edges, produces
//! either a complete `inputBindings` map or a typed error.

use crate::context::ExecutionContext;
use crate::error::{Result, WorkflowError};
use crate::schema::{Handle, PortDefinition, WorkflowEdge, WorkflowNode};
use serde_json::Value;
use std::collections::HashMap;

/// Resolve the input bindings for `node` given its incoming `edges`.
///
/// Mirrors the algorithm in the component design: group incoming edges by
/// target input name, fold in dock-output edges when a dock context is
/// present, reject duplicates, then satisfy each declared input port from
/// an edge, a dock value, or a default.
pub fn resolve(
    node: &WorkflowNode,
    edges: &[&WorkflowEdge],
    context: &ExecutionContext,
) -> Result<HashMap<String, Value>> {
    let mut by_input: HashMap<String, Vec<&WorkflowEdge>> = HashMap::new();
    for edge in edges {
        if edge.target != node.id {
            continue;
        }
        if let Some(name) = edge.target_input_name() {
            by_input.entry(name).or_default().push(edge);
        }
    }

    for (input_name, group) in &by_input {
        if group.len() > 1 {
            return Err(WorkflowError::DuplicateInput {
                node_id: node.id.clone(),
                input_name: input_name.clone(),
            });
        }
    }

    let mut bindings = HashMap::new();
    for port in &node.data.inputs {
        let value = resolve_port(node, port, &by_input, context)?;
        if let Some(value) = value {
            bindings.insert(port.name.clone(), value);
        }
    }
    Ok(bindings)
}

fn resolve_port(
    node: &WorkflowNode,
    port: &PortDefinition,
    by_input: &HashMap<String, Vec<&WorkflowEdge>>,
    context: &ExecutionContext,
) -> Result<Option<Value>> {
    let edge = by_input.get(&port.name).and_then(|v| v.first()).copied();

    let Some(edge) = edge else {
        if port.required && port.default.is_none() {
            return Err(WorkflowError::MissingRequired {
                node_id: node.id.clone(),
                input_name: port.name.clone(),
            });
        }
        return Ok(port.default.clone());
    };

    let source_handle = edge.source_handle_parsed();
    let from_dock = source_handle
        .as_ref()
        .map(|h| matches!(h, Handle::Dock { .. } | Handle::Input { .. }))
        .unwrap_or(false);

    if from_dock && context.dock.is_some() {
        let handle = source_handle.unwrap();
        return match context.dock_value(&handle) {
            Some(value) => Ok(Some(value.clone())),
            None => Err(WorkflowError::MissingOutput {
                node_id: node.id.clone(),
                input_name: port.name.clone(),
                source_node: edge.source.clone(),
                source_output: handle.port_name(),
            }),
        };
    }

    let output_name = source_handle
        .as_ref()
        .map(|h| h.port_name())
        .unwrap_or_else(|| port.name.clone());

    match context.get_output(&edge.source, &output_name) {
        Some(value) => Ok(Some(value.clone())),
        None => Err(WorkflowError::MissingOutput {
            node_id: node.id.clone(),
            input_name: port.name.clone(),
            source_node: edge.source.clone(),
            source_output: output_name,
        }),
    }
}
