//! Small schema builders for tests that need a runnable workflow without
//! hand-writing a full `WorkflowNode`/`WorkflowEdge` literal every time.

use crate::schema::{Metadata, NodeData, WorkflowEdge, WorkflowNode, WorkflowSchema};

/// A node with every optional `NodeData` field left empty, for tests that
/// only care about id/kind/wiring.
pub fn bare_node(id: &str, kind: &str) -> WorkflowNode {
    WorkflowNode {
        id: id.to_string(),
        node_kind: kind.to_string(),
        position: None,
        data: NodeData {
            node_type: kind.to_string(),
            label: None,
            inputs: vec![],
            outputs: vec![],
            continue_on_failure: false,
            script: None,
            commands: None,
            script_file: None,
            script_args: None,
            path: None,
            prompt: None,
            runner: None,
            model: None,
            prompt_files: None,
            output_schema: None,
            trigger_kind: None,
            cron_expression: None,
            idle_minutes: None,
            workflow_path: None,
            max_iterations: None,
            dock_slots: None,
            value_type: None,
            value: None,
            code: None,
            file: None,
        },
        parent_id: None,
        extent: None,
        style: None,
    }
}

pub fn edge(id: &str, source: &str, source_output: &str, target: &str, target_input: &str) -> WorkflowEdge {
    WorkflowEdge {
        id: id.to_string(),
        source: source.to_string(),
        target: target.to_string(),
        source_handle: Some(format!("output:{source_output}")),
        target_handle: Some(format!("input:{target_input}")),
    }
}

/// Two `shell` nodes wired source -> target by a single edge, the
/// smallest schema the Scheduler can run end to end.
pub fn two_node_chain() -> WorkflowSchema {
    WorkflowSchema {
        version: 1,
        metadata: Metadata { name: "fixture".into(), description: None, root_directory: None },
        nodes: vec![bare_node("n1", "shell"), bare_node("n2", "shell")],
        edges: vec![edge("e1", "n1", "stdout", "n2", "text")],
    }
}
