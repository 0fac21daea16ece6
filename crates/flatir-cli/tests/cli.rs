//! Tests that drive the `flatir` binary

use std::path::Path;
use std::process::{Command, Output};

fn flatir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flatir"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_run_inline() {
    let dir = tempfile::tempdir().unwrap();
    let output = flatir(dir.path(), &["run", "-e", "a = \"hel\"\na + \"lo\""]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout(&output), "\"hello\"\n");
}

#[test]
fn test_compile_exec_dump() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("greet.rb"),
        "# frozen_string_literal: true\ngreeting = \"hi\"\ngreeting == \"hi\"\n",
    )
    .unwrap();

    let output = flatir(dir.path(), &["compile", "greet.rb", "-o", "greet.fir"]);
    assert!(output.status.success(), "{output:?}");
    assert!(dir.path().join("greet.fir").exists());

    let output = flatir(dir.path(), &["exec", "greet.fir"]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout(&output), "true\n");

    let output = flatir(dir.path(), &["dump", "greet.fir"]);
    let listing = stdout(&output);
    assert!(listing.starts_with("scope \"main\" (greet.rb:1)"), "{listing}");
    assert!(listing.contains("%t0 = copy frozen(\"hi\")"), "{listing}");

    let output = flatir(dir.path(), &["dump", "--json", "greet.fir"]);
    let json = stdout(&output);
    assert!(json.contains("\"name\": \"main\""), "{json}");
    assert!(json.contains("\"Call1Obj\""), "{json}");
}

#[test]
fn test_config_controls_self() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("flatir.toml"), "[run]\nself_name = \"top\"\n").unwrap();
    let output = flatir(dir.path(), &["run", "-e", "self"]);
    assert_eq!(stdout(&output), "top\n");
}

#[test]
fn test_failures_exit_nonzero() {
    let dir = tempfile::tempdir().unwrap();

    // nil has no wire encoding
    let output = flatir(dir.path(), &["run", "-e", "nil"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unsupported operand"));

    let output = flatir(dir.path(), &["exec", "missing.fir"]);
    assert!(!output.status.success());
}
