//! CLI argument parsing for the PoC database workflow.

use clap::{Parser, Subcommand};

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "pocman",
    version,
    about = "Manage, run, and report crate vulnerability proof-of-concepts",
    after_help = "Commands:\n  add <crate> <version>   Scaffold a new PoC against a pinned crate version\n  run <id> [--copy]       Build and execute a PoC in a throwaway project\n  report <id>             Compose a report and check reporting targets\n\nExamples:\n  pocman add smallvec 0.6.9\n  pocman run 0001 --copy\n  pocman report 0001 --preview",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Add(AddArgs),
    Run(RunArgs),
    Report(ReportArgs),
}

/// Scaffold a new PoC record.
#[derive(Parser, Debug)]
#[command(about = "Create a new PoC with templated metadata")]
pub struct AddArgs {
    /// Target crate name
    #[arg(value_name = "CRATE")]
    pub krate: String,

    /// Target crate version (pinned exactly)
    #[arg(value_name = "VERSION")]
    pub version: String,
}

/// Build and execute a PoC.
#[derive(Parser, Debug)]
#[command(about = "Build and run a PoC in an isolated project directory")]
pub struct RunArgs {
    /// PoC id (4 digits)
    pub id: String,

    /// Save the build directory to `poc-debug` after the run
    #[arg(long)]
    pub copy: bool,
}

/// Compose and (eventually) submit a report for a confirmed PoC.
#[derive(Parser, Debug)]
#[command(about = "Prepare a vulnerability report from a confirmed PoC")]
pub struct ReportArgs {
    /// PoC id (4 digits)
    pub id: String,

    /// Print the report before reporting
    #[arg(long)]
    pub preview: bool,

    /// Report the issue to the crate's repository
    #[arg(long)]
    pub crate_repo: bool,

    /// Report the issue to the RustSec advisory database
    #[arg(long)]
    pub rustsec: bool,
}
