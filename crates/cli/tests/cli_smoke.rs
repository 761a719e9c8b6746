//! CLI smoke tests for bplan.
//!
//! These run the built binary against spec files in a temp directory and
//! check stdout, stderr and exit codes.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the bplan binary.
fn bplan_cmd() -> Command {
  cargo_bin_cmd!("bplan")
}

/// Write a spec file into a fresh temp directory.
fn temp_specs(content: &str) -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("specs.yml"), content).unwrap();
  temp
}

const TOOLCHAIN: &str = r#"
name: app
version: ${VERSION}
args:
  VERSION: 2.1.0
dependencies:
  build:
    libfoo: []
    gcc: []
  runtime:
    libbar: []
---
name: libfoo
version: 1.4.0
dependencies:
  build:
    libbar: []
---
name: libbar
version: 0.9.0
---
name: docs
"#;

const CYCLE: &str = r#"
name: A
dependencies:
  build:
    B: []
---
name: B
dependencies:
  runtime:
    A: []
"#;

// ============================================================================
// Global
// ============================================================================

#[test]
fn help_flag_works() {
  bplan_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("order"))
    .stdout(predicate::str::contains("validate"))
    .stdout(predicate::str::contains("graph"));
}

#[test]
fn version_flag_works() {
  bplan_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("bplan"));
}

#[test]
fn missing_subcommand_fails() {
  bplan_cmd().assert().failure();
}

// ============================================================================
// order
// ============================================================================

#[test]
fn order_prints_dependencies_first() {
  let temp = temp_specs(TOOLCHAIN);

  bplan_cmd()
    .arg("order")
    .arg(temp.path().join("specs.yml"))
    .arg("app")
    .assert()
    .success()
    .stdout("libbar\nlibfoo\napp\n");
}

#[test]
fn order_slices_to_target() {
  let temp = temp_specs(TOOLCHAIN);

  bplan_cmd()
    .arg("order")
    .arg(temp.path().join("specs.yml"))
    .arg("libfoo")
    .assert()
    .success()
    .stdout("libbar\nlibfoo\n");
}

#[test]
fn order_json_output() {
  let temp = temp_specs(TOOLCHAIN);

  let output = bplan_cmd()
    .arg("order")
    .arg(temp.path().join("specs.yml"))
    .arg("docs")
    .args(["--format", "json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let names: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(names, ["libbar", "libfoo", "app", "docs"]);
}

#[test]
fn order_accepts_declared_args() {
  let temp = temp_specs(TOOLCHAIN);

  bplan_cmd()
    .arg("order")
    .arg(temp.path().join("specs.yml"))
    .arg("app")
    .args(["--arg", "VERSION=3.0.0", "--arg", "TARGETARCH=arm64"])
    .assert()
    .success()
    .stdout(predicate::str::ends_with("app\n"));
}

#[test]
fn order_arg_declared_by_later_spec() {
  let temp = temp_specs(
    r#"
name: base
---
name: tool
version: ${TOOL_VERSION}
args:
  TOOL_VERSION: "1"
dependencies:
  build:
    base: []
"#,
  );

  bplan_cmd()
    .arg("order")
    .arg(temp.path().join("specs.yml"))
    .arg("tool")
    .args(["--arg", "TOOL_VERSION=2"])
    .assert()
    .success()
    .stdout("base\ntool\n");
}

#[test]
fn order_names_spec_that_fails_expansion() {
  let temp = temp_specs(
    r#"
name: base
version: ${BROKEN
---
name: tool
args:
  TOOL_VERSION: "1"
"#,
  );

  bplan_cmd()
    .arg("order")
    .arg(temp.path().join("specs.yml"))
    .arg("tool")
    .args(["--arg", "TOOL_VERSION=2"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("spec \"base\""));
}

#[test]
fn order_rejects_undeclared_arg() {
  let temp = temp_specs(TOOLCHAIN);

  bplan_cmd()
    .arg("order")
    .arg(temp.path().join("specs.yml"))
    .arg("app")
    .args(["--arg", "NOPE=1"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown arg \"NOPE\""));
}

#[test]
fn order_rejects_malformed_arg() {
  let temp = temp_specs(TOOLCHAIN);

  bplan_cmd()
    .arg("order")
    .arg(temp.path().join("specs.yml"))
    .arg("app")
    .args(["--arg", "VERSION"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("KEY=VALUE"));
}

#[test]
fn order_unknown_target_fails() {
  let temp = temp_specs(TOOLCHAIN);

  bplan_cmd()
    .arg("order")
    .arg(temp.path().join("specs.yml"))
    .arg("missing")
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("target not found"));
}

#[test]
fn order_reports_cycle() {
  let temp = temp_specs(CYCLE);

  bplan_cmd()
    .arg("order")
    .arg(temp.path().join("specs.yml"))
    .arg("A")
    .assert()
    .failure()
    .code(1)
    .stdout(predicate::str::is_empty())
    .stderr(predicate::str::contains("dependency cycle"));
}

#[test]
fn order_missing_file_fails() {
  let temp = TempDir::new().unwrap();

  bplan_cmd()
    .arg("order")
    .arg(temp.path().join("nope.yml"))
    .arg("app")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to read"));
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn validate_lists_specs() {
  let temp = temp_specs(TOOLCHAIN);

  bplan_cmd()
    .arg("validate")
    .arg(temp.path().join("specs.yml"))
    .assert()
    .success()
    .stdout(predicate::str::contains("libfoo 1.4.0"))
    .stdout(predicate::str::contains("docs"));
}

#[test]
fn validate_rejects_bad_source() {
  let temp = temp_specs(
    r#"
name: broken
sources:
  src:
    http:
      url: https://example.com/a.tar.gz
    git:
      url: https://example.com/a.git
      commit: main
"#,
  );

  bplan_cmd()
    .arg("validate")
    .arg(temp.path().join("specs.yml"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid source \"src\""));
}

#[test]
fn validate_rejects_unknown_field() {
  let temp = temp_specs("name: x\nbogus: 1\n");

  bplan_cmd()
    .arg("validate")
    .arg(temp.path().join("specs.yml"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("bogus"));
}

#[test]
fn validate_empty_file_fails() {
  let temp = temp_specs("");

  bplan_cmd()
    .arg("validate")
    .arg(temp.path().join("specs.yml"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("no specs provided"));
}

// ============================================================================
// graph
// ============================================================================

#[test]
fn graph_text_shows_edges() {
  let temp = temp_specs(TOOLCHAIN);

  bplan_cmd()
    .arg("graph")
    .arg(temp.path().join("specs.yml"))
    .assert()
    .success()
    .stdout(predicate::str::contains("libbar (runtime)"))
    .stdout(predicate::str::contains("libfoo (build)"))
    .stdout(predicate::str::contains("gcc").not());
}

#[test]
fn graph_json_output() {
  let temp = temp_specs(TOOLCHAIN);

  let output = bplan_cmd()
    .arg("graph")
    .arg(temp.path().join("specs.yml"))
    .args(["--format", "json"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let entries = entries.as_array().unwrap();
  assert_eq!(entries.len(), 4);
  assert_eq!(entries[0]["name"], "libbar");
  assert_eq!(entries[2]["name"], "app");
  assert_eq!(
    entries[2]["dependencies"],
    serde_json::json!([
      { "name": "libbar", "kind": "runtime" },
      { "name": "libfoo", "kind": "build" },
    ])
  );
}
