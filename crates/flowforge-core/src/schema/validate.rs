//! Structural validation. Typing errors (missing inputs, type mismatches)
//! are deferred to the Input Resolver at run time; this pass only checks
//! that the schema is well-formed enough to attempt execution.

use super::{Handle, WorkflowSchema, MAX_SUPPORTED_VERSION};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub message: String,
    pub node_id: Option<String>,
    pub edge_id: Option<String>,
}

impl Issue {
    fn error(message: impl Into<String>) -> Self {
        Issue { severity: IssueSeverity::Error, message: message.into(), node_id: None, edge_id: None }
    }

    fn warning(message: impl Into<String>) -> Self {
        Issue { severity: IssueSeverity::Warning, message: message.into(), node_id: None, edge_id: None }
    }

    fn with_node(mut self, id: impl Into<String>) -> Self {
        self.node_id = Some(id.into());
        self
    }

    fn with_edge(mut self, id: impl Into<String>) -> Self {
        self.edge_id = Some(id.into());
        self
    }
}

/// Structural validation: schema shape, node/edge reference resolution,
/// loop interface-node cardinality. Does not check port typing.
pub fn validate(schema: &WorkflowSchema) -> Vec<Issue> {
    let mut issues = Vec::new();

    if schema.version == 0 || schema.version > MAX_SUPPORTED_VERSION {
        issues.push(Issue::error(format!(
            "unsupported schema version {}; supported range is 1..={}",
            schema.version, MAX_SUPPORTED_VERSION
        )));
    }

    if schema.metadata.name.trim().is_empty() {
        issues.push(Issue::error("workflow metadata.name must not be empty"));
    }

    if schema.nodes.is_empty() {
        issues.push(Issue::warning("workflow has no nodes"));
    }

    let node_ids: HashSet<&str> = schema.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut seen_ids = HashSet::new();
    for node in &schema.nodes {
        if !seen_ids.insert(node.id.as_str()) {
            issues.push(Issue::error(format!("duplicate node id: {}", node.id)).with_node(&node.id));
        }
        if let Some(parent) = &node.parent_id {
            if !node_ids.contains(parent.as_str()) {
                issues.push(
                    Issue::error(format!("node {} has parentId {} which does not exist", node.id, parent))
                        .with_node(&node.id),
                );
            }
        }
    }

    for edge in &schema.edges {
        if !node_ids.contains(edge.source.as_str()) {
            issues.push(
                Issue::error(format!("edge {} source {} does not exist", edge.id, edge.source)).with_edge(&edge.id),
            );
        }
        if !node_ids.contains(edge.target.as_str()) {
            issues.push(
                Issue::error(format!("edge {} target {} does not exist", edge.id, edge.target)).with_edge(&edge.id),
            );
        }
    }

    // at most one edge per target handle
    let mut by_target: HashMap<(&str, String), Vec<&str>> = HashMap::new();
    for edge in &schema.edges {
        if let Some(handle) = &edge.target_handle {
            let parsed = Handle::parse(handle);
            if parsed.is_dock() {
                continue; // dock fan-in is legitimate; only non-dock inputs are single-edge
            }
            by_target
                .entry((edge.target.as_str(), parsed.port_name()))
                .or_default()
                .push(edge.id.as_str());
        }
    }
    for ((node_id, port), edge_ids) in &by_target {
        if edge_ids.len() > 1 {
            issues.push(
                Issue::error(format!(
                    "node {node_id} input {port} has {} incoming edges: {:?}",
                    edge_ids.len(),
                    edge_ids
                ))
                .with_node(*node_id),
            );
        }
    }

    for node in schema.nodes.iter().filter(|n| n.node_kind == "loop") {
        validate_loop(schema, &node.id, &mut issues);
    }

    issues
}

fn validate_loop(schema: &WorkflowSchema, loop_id: &str, issues: &mut Vec<Issue>) {
    let children = schema.children_of(loop_id);
    let inputs: Vec<_> = children.iter().filter(|n| n.node_kind == "interface-input").collect();
    let outputs: Vec<_> = children.iter().filter(|n| n.node_kind == "interface-output").collect();
    let continues: Vec<_> = children.iter().filter(|n| n.node_kind == "interface-continue").collect();

    if inputs.len() != 1 {
        issues.push(
            Issue::error(format!("loop {loop_id} must have exactly one interface-input, found {}", inputs.len()))
                .with_node(loop_id),
        );
    }
    if outputs.len() != 1 {
        issues.push(
            Issue::error(format!("loop {loop_id} must have exactly one interface-output, found {}", outputs.len()))
                .with_node(loop_id),
        );
    }
    match continues.as_slice() {
        [only] => {
            let wired = schema.edges_targeting(&only.id).any(|e| {
                e.target_handle_parsed()
                    .map(|h| h.port_name() == "continue")
                    .unwrap_or(false)
            });
            if !wired {
                issues.push(
                    Issue::error(format!("loop {loop_id} interface-continue.continue has no incoming edge"))
                        .with_node(loop_id),
                );
            }
        }
        _ => {
            issues.push(
                Issue::error(format!(
                    "loop {loop_id} must have exactly one interface-continue, found {}",
                    continues.len()
                ))
                .with_node(loop_id),
            );
        }
    }
}
