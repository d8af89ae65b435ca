//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// cvegate -- fail the build when dependencies carry known vulnerabilities.
///
/// Use `cvegate <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "cvegate", version, about, long_about = None)]
pub struct Cli {
    /// Path to the cvegate.toml policy file.
    #[arg(short, long, global = true, default_value = "cvegate.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one dependency check against a build description.
    Check(CheckArgs),

    /// Manage the policy file.
    Config(ConfigArgs),
}

// ---- check ----

/// Run one full dependency check.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Build description (host version, project, groups, artifacts) as JSON.
    #[arg(long)]
    pub build: PathBuf,

    /// Advisory snapshot replayed by the analysis engine.
    #[arg(long)]
    pub advisories: PathBuf,

    /// Override the report output directory.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Fail when a vulnerability scores at or above this CVSS value (above 10 disables).
    #[arg(long)]
    pub fail_on_cvss: Option<f64>,

    /// Skip groups recognised as test groups.
    #[arg(long)]
    pub skip_test_groups: Option<bool>,

    /// Abort on analysis, report and engine errors.
    #[arg(long)]
    pub fail_on_error: Option<bool>,

    /// Report format (repeatable): html, xml, csv, json, junit, sarif, all.
    #[arg(long = "format")]
    pub formats: Vec<String>,
}

// ---- config ----

/// Manage the cvegate policy file.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the policy file and report errors.
    Validate,
    /// Show the effective policy (file + env overrides + defaults).
    Show {
        /// Show only one section (general, scan, failure, report, engine, analyzers).
        #[arg(long)]
        section: Option<String>,
    },
}
