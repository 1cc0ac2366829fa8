//! End-to-end tests driving the `jlc` binary exactly the way a user would:
//! through the command line, reading whatever `.vm` files land in the
//! working directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn jlc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_jlc"))
}

#[test]
fn help_lists_usage() {
    jlc().arg("--help").assert().success().stdout(predicate::str::contains("Usage"));
}

#[test]
fn compiles_a_single_class_to_matching_vm_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("Main.jl");
    std::fs::write(&input, "class Main { function int seven() { return 7; } }").unwrap();

    jlc().arg("Main.jl").current_dir(dir.path()).assert().success();

    let output = std::fs::read_to_string(dir.path().join("Main.vm")).unwrap();
    assert_eq!(output, "function Main.seven 0\npush constant 7\nreturn\n");
}

#[test]
fn missing_input_file_exits_with_file_error_code() {
    jlc().arg("DoesNotExist.jl").assert().failure().code(1);
}

#[test]
fn syntax_error_exits_with_parse_error_code_and_reports_expected_token() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("Main.jl");
    std::fs::write(&input, "class Main { int x; }").unwrap();

    jlc()
        .arg("Main.jl")
        .current_dir(dir.path())
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::starts_with("Syntax error:"));
}

#[test]
fn semantic_error_exits_with_semantic_error_code() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("Main.jl");
    std::fs::write(&input, "class Main { field Widget w; }").unwrap();

    jlc()
        .arg("Main.jl")
        .current_dir(dir.path())
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::starts_with("Semantic error in class \"Main\":"));
}

#[test]
fn missing_return_warning_does_not_fail_the_build() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("Main.jl");
    std::fs::write(&input, "class Main { function int run() { var int x; let x = 1; } }").unwrap();

    jlc()
        .arg("Main.jl")
        .current_dir(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("not guaranteed to return"));
}
