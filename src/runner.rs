//! Cargo invocation for materialized PoC projects.
//!
//! The environment overrides (build cache, native-library search path,
//! warning suppression) live in an explicit [`RunnerEnv`] applied per
//! command, so invocations in-process (tests included) do not interfere
//! through ambient process state.

use anyhow::{Context, Result};
use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::metadata::PocMetadata;

/// Environment for every external-tool invocation against a build dir.
#[derive(Debug, Clone)]
pub struct RunnerEnv {
    /// Directory added to the dynamic-linker search path and emitted by the
    /// materialized build hook as a `rustc-link-search` directive.
    pub link_path: PathBuf,
    /// Compiler wrapper enabling the shared build cache, if available.
    pub rustc_wrapper: Option<String>,
    /// Flags appended to any preexisting `RUSTFLAGS`.
    pub extra_rustflags: String,
}

impl RunnerEnv {
    fn apply(&self, command: &mut Command) {
        if let Some(wrapper) = &self.rustc_wrapper {
            command.env("RUSTC_WRAPPER", wrapper);
        }
        command.env(
            "LD_LIBRARY_PATH",
            append_env_var("LD_LIBRARY_PATH", ":", &self.link_path.display().to_string()),
        );
        command.env(
            "RUSTFLAGS",
            append_env_var("RUSTFLAGS", " ", &self.extra_rustflags),
        );
    }
}

fn append_env_var(name: &str, separator: &str, addition: &str) -> String {
    match env::var(name) {
        Ok(existing) if !existing.is_empty() => format!("{existing}{separator}{addition}"),
        _ => addition.to_string(),
    }
}

/// Combined output of a captured invocation.
#[derive(Debug, Clone)]
pub struct RunCapture {
    /// Stdout with stderr merged in, trimmed.
    pub output: String,
    /// Exit status of the tool; -1 when the process died without one.
    pub exit_code: i32,
}

/// Assemble the cargo argument vector for one invocation: the tool name, an
/// optional toolchain selector, the subcommand, then the record's flags in
/// declared order.
pub fn build_command(metadata: &PocMetadata, subcommand: &str) -> Vec<String> {
    let mut argv = vec!["cargo".to_string()];
    if let Some(toolchain) = &metadata.test.cargo_toolchain {
        argv.push(format!("+{toolchain}"));
    }
    argv.push(subcommand.to_string());
    if let Some(flags) = &metadata.test.cargo_flags {
        argv.extend(flags.iter().cloned());
    }
    argv
}

/// Run `argv` in `cwd`, merging stderr into stdout, and capture the result.
///
/// No timeout and no retry: a hung tool must be killed by the operator, and
/// a non-zero exit is meaningful output rather than an error.
pub fn invoke_captured(argv: &[String], cwd: &Path, env: &RunnerEnv) -> Result<RunCapture> {
    let mut command = command_for(argv, cwd, env)?;
    tracing::debug!(argv = ?argv, cwd = %cwd.display(), "invoking build tool (captured)");

    // Both streams share one pipe so diagnostics interleave with program
    // output in write order, the same stream an operator would see.
    let (mut reader, writer) = std::io::pipe().context("create capture pipe")?;
    let writer_clone = writer.try_clone().context("clone capture pipe")?;
    command.stdout(Stdio::from(writer)).stderr(Stdio::from(writer_clone));

    let mut child = command
        .spawn()
        .with_context(|| format!("spawn `{}`", argv.join(" ")))?;
    // The command still holds the parent's write ends; drop them or the
    // read below never sees EOF.
    drop(command);

    let mut merged = Vec::new();
    reader
        .read_to_end(&mut merged)
        .context("read build tool output")?;
    let status = child.wait().context("wait for build tool")?;

    Ok(RunCapture {
        output: String::from_utf8_lossy(&merged).trim().to_string(),
        exit_code: status.code().unwrap_or(-1),
    })
}

/// Run `argv` in `cwd` with inherited stdio, for interactive `run`.
pub fn invoke_streamed(argv: &[String], cwd: &Path, env: &RunnerEnv) -> Result<i32> {
    let mut command = command_for(argv, cwd, env)?;
    tracing::debug!(argv = ?argv, cwd = %cwd.display(), "invoking build tool (streamed)");
    let status = command
        .status()
        .with_context(|| format!("run `{}`", argv.join(" ")))?;
    Ok(status.code().unwrap_or(-1))
}

/// Query the compiler version the record would build with, via
/// `cargo rustc ... -- --version`. Only stdout is captured so build
/// diagnostics on stderr do not pollute the version line.
pub fn rustc_version(metadata: &PocMetadata, cwd: &Path, env: &RunnerEnv) -> Result<String> {
    let mut argv = build_command(metadata, "rustc");
    argv.push("--".to_string());
    argv.push("--version".to_string());

    let mut command = command_for(&argv, cwd, env)?;
    let output = command
        .output()
        .with_context(|| format!("run `{}`", argv.join(" ")))?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn command_for(argv: &[String], cwd: &Path, env: &RunnerEnv) -> Result<Command> {
    let program = argv.first().context("empty argument vector")?;
    let mut command = Command::new(program);
    command.args(&argv[1..]).current_dir(cwd);
    env.apply(&mut command);
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Test;

    fn env_for_tests() -> RunnerEnv {
        RunnerEnv {
            link_path: PathBuf::from("/tmp/deps"),
            rustc_wrapper: None,
            extra_rustflags: "-A warnings".to_string(),
        }
    }

    #[test]
    fn build_command_includes_toolchain_and_flags_in_order() {
        let metadata = PocMetadata {
            test: Test {
                cargo_toolchain: Some("nightly".to_string()),
                cargo_flags: Some(vec!["--quiet".to_string()]),
                analyzers: None,
            },
            ..PocMetadata::default()
        };
        assert_eq!(
            build_command(&metadata, "run"),
            vec!["cargo", "+nightly", "run", "--quiet"]
        );
    }

    #[test]
    fn build_command_without_extras_is_just_tool_and_subcommand() {
        let metadata = PocMetadata::default();
        assert_eq!(build_command(&metadata, "run"), vec!["cargo", "run"]);
    }

    #[test]
    fn captured_invocation_merges_stderr_and_reports_exit_code() {
        let dir = tempfile::tempdir().expect("temp dir");
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo out; echo err >&2; exit 3".to_string(),
        ];
        let capture = invoke_captured(&argv, dir.path(), &env_for_tests()).expect("invoke");
        assert_eq!(capture.exit_code, 3);
        assert!(capture.output.contains("out"));
        assert!(capture.output.contains("err"));
    }

    #[test]
    fn captured_streams_interleave_in_write_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo one; echo two >&2; echo three".to_string(),
        ];
        let capture = invoke_captured(&argv, dir.path(), &env_for_tests()).expect("invoke");
        assert_eq!(capture.exit_code, 0);
        assert_eq!(capture.output, "one\ntwo\nthree");
    }

    #[test]
    fn append_uses_addition_alone_when_var_is_unset() {
        assert_eq!(
            append_env_var("POCMAN_TEST_UNSET_VAR", ":", "/extra"),
            "/extra"
        );
    }
}
