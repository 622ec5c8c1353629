//! End-to-end tests for the `cq` binary
#![cfg(feature = "cli")]

use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const DOC: &str = "[V:1.0;D:[d0=x]]|||d0=1N";

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("codequilt-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_doc(dir: &Path, file: &str, content: &str) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, content).unwrap();
    path
}

fn cq(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cq"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================================================
// Output destinations
// ============================================================================

#[test]
fn test_stdout_output() {
    let dir = scratch_dir("stdout");
    let input = write_doc(&dir, "simple.cq", DOC);

    let output = cq(&[input.to_str().unwrap(), "--no-format", "--stdout"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "x = 1\n");
    assert!(!dir.join("simple.py").exists());
}

#[test]
fn test_default_output_path() {
    let dir = scratch_dir("default-path");
    let input = write_doc(&dir, "module.cq", DOC);

    let output = cq(&[input.to_str().unwrap(), "--no-format"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(fs::read_to_string(dir.join("module.py")).unwrap(), "x = 1\n");
}

#[test]
fn test_explicit_output_path() {
    let dir = scratch_dir("explicit-path");
    let input = write_doc(&dir, "in.cq", DOC);
    let target = dir.join("renamed.py");

    let output = cq(&[
        input.to_str().unwrap(),
        "--no-format",
        "-o",
        target.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(fs::read_to_string(&target).unwrap(), "x = 1\n");
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_python_input_is_rejected() {
    let dir = scratch_dir("py-input");
    let input = write_doc(&dir, "script.py", "x = 1\n");

    let output = cq(&[input.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not supported"));
}

#[test]
fn test_missing_input_file() {
    let dir = scratch_dir("missing");
    let input = dir.join("absent.cq");

    let output = cq(&[input.to_str().unwrap(), "--no-format"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("input file not found"));
}

#[test]
fn test_decode_error_exits_nonzero() {
    let dir = scratch_dir("bad-header");
    let input = write_doc(&dir, "broken.cq", "[V:1.0;D:[d0=x]|||d0N");

    let output = cq(&[input.to_str().unwrap(), "--no-format"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Header format error"));
    assert!(!dir.join("broken.py").exists());
}

#[test]
fn test_strict_flag() {
    let dir = scratch_dir("strict");
    let input = write_doc(&dir, "strict.cq", "[V:1.0]|||d5N");

    let lenient = cq(&[input.to_str().unwrap(), "--no-format", "--stdout", "--no-color"]);
    assert!(lenient.status.success());
    assert_eq!(
        String::from_utf8_lossy(&lenient.stdout),
        "__UNKNOWN_DYNAMIC_d5__\n"
    );
    assert!(stderr(&lenient).contains("unresolved reference"));

    let strict = cq(&[input.to_str().unwrap(), "--no-format", "--stdout", "--strict"]);
    assert_eq!(strict.status.code(), Some(1));
    assert!(stderr(&strict).contains("Unresolved reference 'd5'"));
}

// ============================================================================
// Diagnostics and formatting
// ============================================================================

#[test]
fn test_diagnostics_json() {
    let dir = scratch_dir("diagnostics");
    let input = write_doc(&dir, "warn.cq", "[V:1.0]|||d0N");
    let report = dir.join("diagnostics.json");

    let output = cq(&[
        input.to_str().unwrap(),
        "--no-format",
        "--stdout",
        "--diagnostics-json",
        report.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stderr(&output));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["severity"], "error");
}

#[cfg(unix)]
#[test]
fn test_custom_formatter() {
    let dir = scratch_dir("formatter");
    let input = write_doc(&dir, "fmt.cq", DOC);

    let output = cq(&[
        input.to_str().unwrap(),
        "--stdout",
        "--formatter",
        "tr a-z A-Z",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "X = 1\n");
}

#[cfg(unix)]
#[test]
fn test_failing_formatter_keeps_output() {
    let dir = scratch_dir("formatter-fail");
    let input = write_doc(&dir, "fmt.cq", DOC);

    let output = cq(&[
        input.to_str().unwrap(),
        "--stdout",
        "--no-color",
        "--formatter",
        "false",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "x = 1\n");
    assert!(stderr(&output).contains("formatter unavailable"));
}
