//! Template Resolver: pure string substitution for `{{ input }}`,
//! `{{ inputs.name }}`, and `{{ nodeRef.output }}` references.
//!
//! Applied to the `script`, `commands[]`, `prompt`, `path`, `scriptFile`,
//! and `scriptArgs` fields before a node executor runs. Unknown
//! references are left literally unchanged; this function never fails.

use crate::context::ExecutionContext;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

static TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\s*([^}]+?)\s*\}\}").unwrap());

/// Substitute every `{{ ... }}` reference in `text`.
///
/// - `{{ input }}` resolves against the single entry named `input` in
///   `inputs`.
/// - `{{ inputs.<name> }}` resolves the named entry in `inputs`.
/// - `{{ <nodeRef>.<port> }}` resolves against `context`'s recorded
///   outputs, where `nodeRef` is a node id or normalized label.
///
/// Non-string values are JSON-encoded when substituted. A reference that
/// cannot be resolved is left exactly as written.
pub fn resolve(text: &str, context: &ExecutionContext, inputs: &HashMap<String, Value>) -> String {
    TEMPLATE_RE
        .replace_all(text, |caps: &regex::Captures| {
            let reference = caps[1].trim();
            match resolve_reference(reference, context, inputs) {
                Some(value) => value_to_string(&value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn resolve_reference(reference: &str, context: &ExecutionContext, inputs: &HashMap<String, Value>) -> Option<Value> {
    if reference == "input" {
        return inputs.get("input").cloned();
    }
    if let Some(name) = reference.strip_prefix("inputs.") {
        return inputs.get(name).cloned();
    }
    let (node_ref, port) = reference.split_once('.')?;
    let node_id = context.resolve_ref(node_ref)?;
    context.get_output(node_id, port).cloned()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Apply [`resolve`] to every template-bearing field of a node, returning
/// the resolved values without mutating the schema (the schema is
/// immutable once loaded).
pub struct ResolvedFields {
    pub script: Option<String>,
    pub commands: Option<Vec<String>>,
    pub prompt: Option<String>,
    pub path: Option<String>,
    pub script_file: Option<String>,
    pub script_args: Option<Vec<String>>,
}

pub fn resolve_node_fields(
    data: &crate::schema::NodeData,
    context: &ExecutionContext,
    inputs: &HashMap<String, Value>,
) -> ResolvedFields {
    ResolvedFields {
        script: data.script.as_deref().map(|s| resolve(s, context, inputs)),
        commands: data
            .commands
            .as_ref()
            .map(|cs| cs.iter().map(|c| resolve(c, context, inputs)).collect()),
        prompt: data.prompt.as_deref().map(|s| resolve(s, context, inputs)),
        path: data.path.as_deref().map(|s| resolve(s, context, inputs)),
        script_file: data.script_file.as_deref().map(|s| resolve(s, context, inputs)),
        script_args: data
            .script_args
            .as_ref()
            .map(|args| args.iter().map(|a| resolve(a, context, inputs)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_on_strings_without_templates() {
        let ctx = ExecutionContext::new(HashMap::new());
        assert_eq!(resolve("echo hi", &ctx, &HashMap::new()), "echo hi");
    }

    #[test]
    fn resolves_bare_input() {
        let ctx = ExecutionContext::new(HashMap::new());
        let inputs = HashMap::from([("input".to_string(), Value::String("abc".into()))]);
        assert_eq!(resolve("{{ input }}", &ctx, &inputs), "abc");
    }

    #[test]
    fn resolves_named_input() {
        let ctx = ExecutionContext::new(HashMap::new());
        let inputs = HashMap::from([("name".to_string(), Value::String("world".into()))]);
        assert_eq!(resolve("hello {{ inputs.name }}", &ctx, &inputs), "hello world");
    }

    #[test]
    fn resolves_node_ref_by_id_and_label() {
        let mut ctx = ExecutionContext::new(HashMap::new());
        ctx.record_output("n1", HashMap::from([("stdout".to_string(), Value::String("abc".into()))]));
        ctx.register_label("a".to_string(), "n1".to_string());
        assert_eq!(resolve("got {{ n1.stdout }}", &ctx, &HashMap::new()), "got abc");
        assert_eq!(resolve("got {{ a.stdout }}", &ctx, &HashMap::new()), "got abc");
    }

    #[test]
    fn leaves_unknown_references_literal() {
        let ctx = ExecutionContext::new(HashMap::new());
        assert_eq!(resolve("{{ ghost.stdout }}", &ctx, &HashMap::new()), "{{ ghost.stdout }}");
    }

    #[test]
    fn json_encodes_non_string_values() {
        let mut ctx = ExecutionContext::new(HashMap::new());
        ctx.record_output("n1", HashMap::from([("count".to_string(), serde_json::json!(3))]));
        assert_eq!(resolve("{{ n1.count }}", &ctx, &HashMap::new()), "3");
    }
}
