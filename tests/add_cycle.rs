//! Integration tests driving the compiled binary against a temporary store.

use std::fs;
use std::path::Path;
use std::process::Command;

use pocman::metadata::PocDocument;

fn pocman_in(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_pocman"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run pocman")
}

#[test]
fn sequential_adds_allocate_distinct_ids() {
    let dir = tempfile::tempdir().expect("temp dir");

    let output = pocman_in(dir.path(), &["add", "smallvec", "0.6.9"]);
    assert!(output.status.success(), "first add failed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("with version 0.6.9"), "stdout: {stdout}");

    let output = pocman_in(dir.path(), &["add", "stackvector", "1.0.6"]);
    assert!(output.status.success(), "second add failed: {output:?}");

    let first = dir.path().join("poc/0000-smallvec.rs");
    let second = dir.path().join("poc/0001-stackvector.rs");
    assert!(first.is_file());
    assert!(second.is_file());
}

#[test]
fn scaffolded_record_parses_back() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = pocman_in(dir.path(), &["add", "bra", "0.1.0"]);
    assert!(output.status.success(), "add failed: {output:?}");

    let source = fs::read_to_string(dir.path().join("poc/0000-bra.rs")).expect("read record");
    let document = PocDocument::parse(&source).expect("parse scaffolded record");
    assert_eq!(document.metadata.target_crate().expect("crate"), "bra");
    assert_eq!(document.metadata.target_version().expect("version"), "0.1.0");
    assert!(!document.metadata.is_reported());
    assert!(document.code.contains("fn main()"));
}

#[test]
fn bare_invocation_prints_usage_and_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = pocman_in(dir.path(), &[]);
    assert!(!output.status.success());
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(combined.contains("Usage"), "expected usage text: {combined}");
}

#[test]
fn run_with_unknown_id_fails() {
    // The run path checks for cargo before resolving the id.
    if which::which("cargo").is_err() {
        return;
    }
    let dir = tempfile::tempdir().expect("temp dir");
    fs::create_dir(dir.path().join("poc")).expect("create store dir");
    fs::write(
        dir.path().join("config.toml"),
        "name = \"Test\"\nemail = \"t@example.com\"\ntoken = \"x\"\nrustsec_fork_url = \"https://example.com/fork\"\n",
    )
    .expect("write config");

    let output = pocman_in(dir.path(), &["run", "0042"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("0042"), "stderr: {stderr}");
}
