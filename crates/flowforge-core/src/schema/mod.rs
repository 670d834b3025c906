//! Workflow schema: the data model authored by the graph editor and
//! consumed by the scheduler. See [`WorkflowSchema`] for the top-level
//! document and [`parse`]/[`serialize`]/[`validate`] for the public
//! operations.

mod handle;
mod validate;

pub use handle::Handle;
pub use validate::{validate, Issue, IssueSeverity};

use crate::error::{Result, WorkflowError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Highest schema version this engine understands.
pub const MAX_SUPPORTED_VERSION: u64 = 1;

/// Wire format a workflow document is read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

/// The closed set of port value types. Compatibility is strict equality
/// except that `Any` is bidirectionally compatible with every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Json,
    File,
    Files,
    Any,
}

impl ValueType {
    /// Whether a value produced by a `source` port may flow into a `self`
    /// (target) port.
    pub fn compatible(&self, source: &ValueType) -> bool {
        *self == ValueType::Any || *source == ValueType::Any || self == source
    }
}

/// How a port's value is computed from a raw string payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractSpec {
    Full,
    Regex(String),
    JsonPath(String),
}

impl ExtractSpec {
    fn as_wire_string(&self) -> String {
        match self {
            ExtractSpec::Full => "full".to_string(),
            ExtractSpec::Regex(pattern) => format!("regex({pattern})"),
            ExtractSpec::JsonPath(path) => format!("json_path({path})"),
        }
    }

    fn parse_wire_string(s: &str) -> Result<ExtractSpec> {
        if s == "full" {
            return Ok(ExtractSpec::Full);
        }
        if let Some(inner) = s.strip_prefix("regex(").and_then(|s| s.strip_suffix(')')) {
            return Ok(ExtractSpec::Regex(inner.to_string()));
        }
        if let Some(inner) = s.strip_prefix("json_path(").and_then(|s| s.strip_suffix(')')) {
            return Ok(ExtractSpec::JsonPath(inner.to_string()));
        }
        Err(WorkflowError::SchemaInvalid {
            message: format!("unrecognized extract spec: {s:?}"),
        })
    }
}

impl Serialize for ExtractSpec {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.as_wire_string())
    }
}

impl<'de> Deserialize<'de> for ExtractSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ExtractSpec::parse_wire_string(&s).map_err(serde::de::Error::custom)
    }
}

/// A named, typed connection point on a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub array: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractSpec>,
}

impl PortDefinition {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            required: false,
            default: None,
            description: None,
            array: false,
            array_parent: None,
            array_index: None,
            extract: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Role a dock slot plays on a loop node. See the Loop Executor design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DockSlotKind {
    Iteration,
    Continue,
    Feedback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockSlot {
    pub name: String,
    pub kind: DockSlotKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
}

/// Node-kind-specific data plus the fields common to every node
/// (`nodeType`, `label`, typed `inputs`/`outputs`, `continueOnFailure`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub inputs: Vec<PortDefinition>,
    #[serde(default)]
    pub outputs: Vec<PortDefinition>,
    #[serde(default)]
    pub continue_on_failure: bool,

    // shell / script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_args: Option<Vec<String>>,

    // workdir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    // agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,

    // trigger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_minutes: Option<i64>,

    // component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_path: Option<String>,

    // loop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dock_slots: Option<Vec<DockSlot>>,

    // constant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    // function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// 2D canvas position, carried through for the (external) editor's benefit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<serde_json::Value>,
}

impl WorkflowNode {
    /// A label normalized the way the Template Resolver normalizes `nodeRef`s:
    /// lowercased, whitespace replaced with `_`.
    pub fn normalized_label(&self) -> Option<String> {
        self.data
            .label
            .as_ref()
            .map(|l| l.to_lowercase().split_whitespace().collect::<Vec<_>>().join("_"))
    }

    pub fn is_container_child(&self) -> bool {
        self.parent_id.is_some() && self.extent.as_deref() == Some("parent")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl WorkflowEdge {
    /// Target input name with any `:internal` suffix and `input:`/`dock:`
    /// prefix stripped, suitable for grouping by `targetHandle`.
    pub fn target_input_name(&self) -> Option<String> {
        self.target_handle.as_deref().map(Handle::parse).map(|h| h.port_name())
    }

    pub fn source_handle_parsed(&self) -> Option<Handle> {
        self.source_handle.as_deref().map(Handle::parse)
    }

    pub fn target_handle_parsed(&self) -> Option<Handle> {
        self.target_handle.as_deref().map(Handle::parse)
    }

    /// A feedback edge carries the previous iteration's value into a loop
    /// dock and is excluded from forward dependency analysis.
    pub fn is_feedback(&self) -> bool {
        matches!(
            self.target_handle_parsed(),
            Some(Handle::Dock { role, .. }) if role == handle::DockRole::Input || role == handle::DockRole::Current
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_directory: Option<String>,
}

/// The top-level, immutable workflow document passed to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSchema {
    pub version: u64,
    pub metadata: Metadata,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
}

impl WorkflowSchema {
    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_targeting<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a WorkflowEdge> {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    pub fn edges_from<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a WorkflowEdge> {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Nodes belonging to a loop's inner sub-graph (`parentId == loop_id`).
    pub fn children_of(&self, loop_id: &str) -> Vec<&WorkflowNode> {
        self.nodes
            .iter()
            .filter(|n| n.parent_id.as_deref() == Some(loop_id))
            .collect()
    }

    /// Resolve a template `nodeRef` (node id or normalized label) to a node.
    pub fn resolve_node_ref(&self, node_ref: &str) -> Option<&WorkflowNode> {
        self.node(node_ref)
            .or_else(|| self.nodes.iter().find(|n| n.normalized_label().as_deref() == Some(node_ref)))
    }

    /// An empty, otherwise-valid document. Mainly useful for executor unit
    /// tests that exercise a single node outside a full graph.
    pub fn minimal(name: impl Into<String>) -> Self {
        WorkflowSchema {
            version: 1,
            metadata: Metadata { name: name.into(), description: None, root_directory: None },
            nodes: vec![],
            edges: vec![],
        }
    }
}

/// Parse a workflow document from bytes in the given [`Format`].
pub fn parse(bytes: &[u8], format: Format) -> Result<WorkflowSchema> {
    let schema: WorkflowSchema = match format {
        Format::Yaml => serde_yaml::from_slice(bytes)?,
        Format::Json => serde_json::from_slice(bytes)?,
    };
    if schema.version > MAX_SUPPORTED_VERSION {
        return Err(WorkflowError::UnsupportedVersion {
            version: schema.version,
            max_supported: MAX_SUPPORTED_VERSION,
        });
    }
    Ok(schema)
}

/// Serialize a workflow document to bytes in the given [`Format`]. YAML is
/// the canonical on-disk format; JSON is accepted on read but this function
/// can produce either.
pub fn serialize(schema: &WorkflowSchema, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Yaml => Ok(serde_yaml::to_string(schema)?.into_bytes()),
        Format::Json => Ok(serde_json::to_vec_pretty(schema)?),
    }
}

/// A map from old handle id to new handle id, produced by [`crate::array_slots::cleanup`].
pub type HandleRemap = BTreeMap<String, String>;

/// The default start set for a run with no explicit `startNodeIds`: every
/// trigger node, unioned with every source node (no incoming non-feedback
/// edges), excluding nodes that belong to a container (loop body).
pub fn default_start_nodes(schema: &WorkflowSchema) -> Vec<String> {
    schema
        .nodes
        .iter()
        .filter(|n| !n.is_container_child())
        .filter(|n| n.node_kind == "trigger" || !schema.edges_targeting(&n.id).any(|e| !e.is_feedback()))
        .map(|n| n.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorkflowSchema {
        WorkflowSchema {
            version: 1,
            metadata: Metadata { name: "demo".into(), description: None, root_directory: None },
            nodes: vec![WorkflowNode {
                id: "n1".into(),
                node_kind: "shell".into(),
                position: None,
                data: NodeData {
                    node_type: "shell".into(),
                    label: Some("Hello".into()),
                    inputs: vec![],
                    outputs: vec![PortDefinition::new("stdout", ValueType::String)],
                    continue_on_failure: false,
                    script: Some("echo hi".into()),
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
            }],
            edges: vec![],
        }
    }

    #[test]
    fn round_trips_through_yaml() {
        let schema = sample();
        let bytes = serialize(&schema, Format::Yaml).unwrap();
        let parsed = parse(&bytes, Format::Yaml).unwrap();
        assert_eq!(parsed.version, schema.version);
        assert_eq!(parsed.nodes.len(), schema.nodes.len());
        assert_eq!(parsed.nodes[0].data.script, schema.nodes[0].data.script);
    }

    #[test]
    fn round_trips_through_json() {
        let schema = sample();
        let bytes = serialize(&schema, Format::Json).unwrap();
        let parsed = parse(&bytes, Format::Json).unwrap();
        assert_eq!(parsed.nodes[0].id, "n1");
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut schema = sample();
        schema.version = MAX_SUPPORTED_VERSION + 1;
        let bytes = serialize(&schema, Format::Json).unwrap();
        assert!(matches!(
            parse(&bytes, Format::Json),
            Err(WorkflowError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn value_type_compatibility() {
        assert!(ValueType::String.compatible(&ValueType::String));
        assert!(!ValueType::String.compatible(&ValueType::Number));
        assert!(ValueType::Any.compatible(&ValueType::Number));
        assert!(ValueType::Number.compatible(&ValueType::Any));
    }

    #[test]
    fn extract_spec_round_trips() {
        let spec = ExtractSpec::Regex("foo(\\d+)".into());
        let s = spec.as_wire_string();
        assert_eq!(s, "regex(foo(\\d+))");
        assert_eq!(ExtractSpec::parse_wire_string(&s).unwrap(), spec);
    }
}
