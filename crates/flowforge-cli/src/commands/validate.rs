//! `flowforge validate` — parse and structurally validate one or more
//! workflow documents, printing each file's issues.

use flowforge_core::error::Result;
use flowforge_core::schema::{parse, validate, Format, Issue, IssueSeverity};
use std::path::{Path, PathBuf};

fn format_for(path: &Path) -> Format {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Format::Json,
        _ => Format::Yaml,
    }
}

fn print_issue(path: &Path, issue: &Issue) {
    let severity = match issue.severity {
        IssueSeverity::Warning => "warning",
        IssueSeverity::Error => "error",
    };
    let location = match (&issue.node_id, &issue.edge_id) {
        (Some(node_id), _) => format!(" (node {node_id})"),
        (None, Some(edge_id)) => format!(" (edge {edge_id})"),
        (None, None) => String::new(),
    };
    println!("{}: {severity}: {}{location}", path.display(), issue.message);
}

pub async fn execute(workflows: Vec<PathBuf>) -> Result<u8> {
    if workflows.is_empty() {
        eprintln!("error: validate requires at least one workflow path");
        return Ok(2);
    }

    let mut has_error = false;
    for path in &workflows {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                println!("{}: error: failed to read file: {e}", path.display());
                has_error = true;
                continue;
            }
        };
        let schema = match parse(&bytes, format_for(path)) {
            Ok(schema) => schema,
            Err(e) => {
                println!("{}: error: {e}", path.display());
                has_error = true;
                continue;
            }
        };
        let issues = validate(&schema);
        for issue in &issues {
            if issue.severity == IssueSeverity::Error {
                has_error = true;
            }
            print_issue(path, issue);
        }
    }

    Ok(if has_error { 1 } else { 0 })
}
