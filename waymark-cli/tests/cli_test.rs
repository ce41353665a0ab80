//! CLI integration tests for validate and inspect

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn diagram_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".mermaid")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_validate_valid_diagram() {
    let file = diagram_file("[*] --> A\nA --> B\nB --> [*]\n");

    Command::cargo_bin("waymark")
        .unwrap()
        .arg("validate")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("OK:"))
        .stdout(predicate::str::contains("2 nodes"));
}

#[test]
fn test_validate_invalid_diagram_exits_nonzero() {
    let file = diagram_file("A --> B\nnot a diagram line\n");

    Command::cargo_bin("waymark")
        .unwrap()
        .arg("validate")
        .arg(file.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid:"));
}

#[test]
fn test_validate_missing_file_fails() {
    Command::cargo_bin("waymark")
        .unwrap()
        .arg("validate")
        .arg("/no/such/file.mermaid")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_inspect_lists_structure() {
    let file = diagram_file(
        "state route <<choice>>\n[*] --> route\nroute --> tour: yes\nroute --> exit: no\n",
    );

    Command::cargo_bin("waymark")
        .unwrap()
        .arg("inspect")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("<<choice>>"))
        .stdout(predicate::str::contains("route --> tour: yes"))
        .stdout(predicate::str::contains("start points:"));
}
