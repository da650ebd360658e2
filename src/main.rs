use anyhow::{ensure, Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::Command as ProcessCommand;
use tempfile::TempDir;

use pocman::cli::{AddArgs, Command, ReportArgs, RootArgs, RunArgs};
use pocman::config::{self, Config, ADVISORY_DB_DIR};
use pocman::metadata::PocMetadata;
use pocman::registry;
use pocman::report::{self, Demonstration};
use pocman::runner;
use pocman::scaffold;
use pocman::store::PocStore;

/// Flat directory holding one source file per PoC record.
const POC_DIR: &str = "poc";
/// Where `run --copy` preserves the materialized build directory.
const DEBUG_DIR: &str = "poc-debug";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = RootArgs::parse();
    match args.command {
        Command::Add(args) => cmd_add(args),
        Command::Run(args) => cmd_run(args),
        Command::Report(args) => cmd_report(args),
    }
}

fn cmd_add(args: AddArgs) -> Result<()> {
    let store = PocStore::open(POC_DIR);
    let path = store.add(&args.krate, &args.version)?;
    println!("Created `{}` with version {}", path.display(), args.version);
    Ok(())
}

fn cmd_run(args: RunArgs) -> Result<()> {
    which::which("cargo").context("`cargo` not found in PATH")?;
    let root = Path::new(".");
    let config = config::load_config(root)?;
    let env = config::runner_env(root)?;

    let store = PocStore::open(POC_DIR);
    let (_path, document) = store.load(&args.id)?;

    let build_dir = TempDir::new().context("create build directory")?;
    scaffold::materialize(&args.id, &document, build_dir.path(), &config, &env)?;

    let argv = runner::build_command(&document.metadata, "run");
    let exit_code = runner::invoke_streamed(&argv, build_dir.path(), &env)?;
    if exit_code != 0 {
        tracing::info!(exit_code, "PoC exited non-zero");
    }

    if args.copy {
        scaffold::copy_tree(build_dir.path(), Path::new(DEBUG_DIR))?;
        println!("Saved build directory to `{DEBUG_DIR}`");
    }
    Ok(())
}

fn cmd_report(mut args: ReportArgs) -> Result<()> {
    // With no explicit target, report everywhere.
    if !args.crate_repo && !args.rustsec {
        args.crate_repo = true;
        args.rustsec = true;
    }

    which::which("cargo").context("`cargo` not found in PATH")?;
    let root = Path::new(".");
    let config = config::load_config(root)?;
    let env = config::runner_env(root)?;

    let store = PocStore::open(POC_DIR);
    let (_path, document) = store.load(&args.id)?;

    let build_dir = TempDir::new().context("create build directory")?;
    scaffold::materialize(&args.id, &document, build_dir.path(), &config, &env)?;

    let quiet_metadata = with_quiet_flag(&document.metadata);
    let rustc_version = runner::rustc_version(&quiet_metadata, build_dir.path(), &env)?;
    let argv = runner::build_command(&quiet_metadata, "run");
    let capture = runner::invoke_captured(&argv, build_dir.path(), &env)?;

    let demo = Demonstration {
        os_version: os_descriptor(),
        rustc_version,
    };
    let composed = report::compose(&document, &demo, &capture)?;

    if args.preview {
        println!("Title:\n{}\n\nDescription:\n{}", composed.title, composed.body);
    }

    if args.crate_repo {
        report_to_crate_repo(&args.id, &document.metadata, &config)?;
    }
    if args.rustsec {
        report_to_rustsec(&args.id, &config)?;
    }
    Ok(())
}

/// The build tool is invoked quiet during report capture so cargo's own
/// progress output stays out of the report body.
fn with_quiet_flag(metadata: &PocMetadata) -> PocMetadata {
    let mut metadata = metadata.clone();
    metadata
        .test
        .cargo_flags
        .get_or_insert_with(Vec::new)
        .push("--quiet".to_string());
    metadata
}

fn report_to_crate_repo(id: &str, metadata: &PocMetadata, config: &Config) -> Result<()> {
    println!("Reporting {id} to the crate repository");

    if metadata.is_reported() {
        let date = metadata.report.issue_date.as_deref().unwrap_or_default();
        let url = metadata.report.issue_url.as_deref().unwrap_or_default();
        println!("Already reported on {date}");
        println!("Issue URL: {url}");
        return Ok(());
    }

    let target_crate = metadata.target_crate()?;
    match registry::crate_repository(target_crate)? {
        None => println!("Repository URL not found in crates.io metadata"),
        Some(url) if !report::supports_automatic_reporting(&url) => {
            println!("Reporting to: {url}");
            println!("Automatic reporting is only supported for GitHub");
        }
        Some(url) => {
            println!("Reporting to: {url}");
            // Filing the issue through the tracker API is not implemented;
            // the metadata markers are only written once a real issue URL
            // exists.
            tracing::info!(
                reporter = %format!("{} <{}>", config.name, config.email),
                "issue submission not implemented; report manually"
            );
        }
    }
    Ok(())
}

fn report_to_rustsec(id: &str, config: &Config) -> Result<()> {
    ensure_advisory_fork(config)?;
    println!("Reporting {id} to the RustSec advisory database");
    // Drafting the advisory in the fork is not implemented.
    tracing::info!("advisory submission not implemented; draft manually in `{ADVISORY_DB_DIR}`");
    Ok(())
}

/// Make sure a local working copy of the advisory-database fork exists.
fn ensure_advisory_fork(config: &Config) -> Result<()> {
    if Path::new(ADVISORY_DB_DIR).exists() {
        return Ok(());
    }
    which::which("git").context("`git` not found in PATH")?;
    let status = ProcessCommand::new("git")
        .args(["clone", &config.rustsec_fork_url, ADVISORY_DB_DIR])
        .status()
        .context("run git clone")?;
    ensure!(status.success(), "git clone of the advisory fork failed");
    Ok(())
}

/// Host OS descriptor for the Demonstration section, best effort.
fn os_descriptor() -> String {
    let output = ProcessCommand::new("lsb_release").arg("-sd").output();
    match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        _ => {
            tracing::warn!("`lsb_release -sd` unavailable; omitting OS details");
            "unknown".to_string()
        }
    }
}
