//! Black-box tests that drive the `flowforge` binary as a subprocess,
//! the way the pack's CLI test suites exercise their own binaries.

use assert_cmd::Command;
use predicates::str::contains;
use std::fs;

const VALID_WORKFLOW: &str = r#"
version: 1
metadata:
  name: hello
nodes:
  - id: hello
    type: shell
    data:
      nodeType: shell
      script: echo hello
      outputs:
        - name: stdout
          type: string
edges: []
"#;

const INVALID_WORKFLOW: &str = r#"
version: 1
metadata:
  name: broken
nodes:
  - id: a
    type: shell
    data:
      nodeType: shell
      script: echo a
edges:
  - id: e1
    source: a
    target: ghost
    sourceHandle: "output:stdout"
    targetHandle: "input:needed"
"#;

fn cli() -> Command {
    Command::cargo_bin("flowforge").unwrap()
}

#[test]
fn validate_accepts_a_well_formed_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.yaml");
    fs::write(&path, VALID_WORKFLOW).unwrap();

    cli().arg("validate").arg(&path).assert().success();
}

#[test]
fn validate_rejects_a_dangling_edge_reference() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, INVALID_WORKFLOW).unwrap();

    cli()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stdout(contains("does not exist"));
}

#[test]
fn validate_with_no_paths_exits_with_usage_error() {
    cli().arg("validate").assert().failure().code(2);
}

#[test]
fn run_executes_a_workflow_and_streams_ndjson_events() {
    let home = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    let path = workdir.path().join("hello.yaml");
    fs::write(&path, VALID_WORKFLOW).unwrap();

    cli()
        .arg("--home")
        .arg(home.path())
        .arg("run")
        .arg(&path)
        .arg("--yolo")
        .assert()
        .success()
        .stdout(contains("\"type\":\"workflow-complete\""));
}

#[test]
fn workspace_init_add_list_round_trip() {
    let home = tempfile::tempdir().unwrap();
    let workspace = tempfile::tempdir().unwrap();

    cli().arg("--home").arg(home.path()).arg("init").assert().success();

    cli()
        .arg("--home")
        .arg(home.path())
        .arg("add")
        .arg(workspace.path())
        .assert()
        .success();

    let canonical = fs::canonicalize(workspace.path()).unwrap();
    cli()
        .arg("--home")
        .arg(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(contains(canonical.to_string_lossy().to_string()));
}
