//! `cvegate check` command handler

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use cvegate_core::config::PolicyConfig;
use cvegate_core::error::{ConfigError, CvegateError};
use cvegate_dependency_check::{
    AnalysisOrchestrator, BuildGraph, GraphCollector, Phase, ProjectContext, ReplayEngineFactory,
    RunOutcome, RunReport,
};

use crate::cli::CheckArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `check` command.
///
/// The report is rendered before the outcome is mapped to an error, so a
/// failing gate still prints what was found.
pub async fn execute(
    args: CheckArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let run = run(args, config_path).await?;
    writer.render(&CheckReport::from_run(&run))?;
    run.into_result()?;
    Ok(())
}

/// Load the policy, read the build description and drive one orchestrated run.
///
/// # Errors
///
/// Returns `CliError::Config` for policy problems and `CliError::Command`
/// when the build description cannot be read or parsed. Outcomes of the run
/// itself are carried in the returned [`RunReport`].
pub async fn run(args: CheckArgs, config_path: &Path) -> Result<RunReport, CliError> {
    let mut policy = load_policy(config_path).await?;
    apply_overrides(&mut policy, &args);
    policy
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let graph = read_build_graph(&args.build).await?;
    let context = ProjectContext::new(
        graph.project.clone(),
        PathBuf::from(&policy.report.output_directory),
    );

    info!(
        project = %context,
        host_version = %graph.host_version,
        groups = graph.group_count(),
        "build description loaded"
    );

    let collector = GraphCollector::new(graph, &policy.scan);
    let orchestrator = AnalysisOrchestrator::builder()
        .policy(policy)
        .context(context)
        .build()?;
    let factory = ReplayEngineFactory::new(args.advisories);

    // every engine call blocks
    tokio::task::spawn_blocking(move || orchestrator.run(&factory, &collector))
        .await
        .map_err(|e| CliError::Command(format!("dependency check task failed: {e}")))
}

/// Load `cvegate.toml`, falling back to defaults when the file does not exist.
pub async fn load_policy(config_path: &Path) -> Result<PolicyConfig, CliError> {
    match PolicyConfig::load(config_path).await {
        Ok(policy) => Ok(policy),
        Err(CvegateError::Config(ConfigError::FileNotFound { path })) => {
            info!(path = %path, "policy file not found, using defaults");
            let mut policy = PolicyConfig::default();
            policy.apply_env_overrides();
            policy
                .validate()
                .map_err(|e| CliError::Config(e.to_string()))?;
            Ok(policy)
        }
        Err(e) => Err(CliError::Config(e.to_string())),
    }
}

/// Apply command-line overrides on top of the loaded policy.
pub fn apply_overrides(policy: &mut PolicyConfig, args: &CheckArgs) {
    if let Some(threshold) = args.fail_on_cvss {
        policy.failure.fail_build_on_cvss = threshold;
    }
    if let Some(skip) = args.skip_test_groups {
        policy.scan.skip_test_groups = skip;
    }
    if let Some(fail) = args.fail_on_error {
        policy.failure.fail_on_error = fail;
    }
    if let Some(ref dir) = args.output_dir {
        policy.report.output_directory = dir.display().to_string();
    }
    if !args.formats.is_empty() {
        policy.report.formats = args.formats.clone();
    }
    debug!(
        fail_build_on_cvss = policy.failure.fail_build_on_cvss,
        fail_on_error = policy.failure.fail_on_error,
        skip_test_groups = policy.scan.skip_test_groups,
        "policy overrides applied"
    );
}

async fn read_build_graph(path: &Path) -> Result<BuildGraph, CliError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        CliError::Command(format!(
            "failed to read build description {}: {e}",
            path.display()
        ))
    })?;
    BuildGraph::from_json(&content).map_err(|e| {
        CliError::Command(format!(
            "invalid build description {}: {e}",
            path.display()
        ))
    })
}

/// Result of one `check` run, as rendered to stdout.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub run_id: String,
    pub outcome: String,
    pub phases: Vec<Phase>,
    pub dependencies: usize,
    pub vulnerabilities: usize,
    /// One line per vulnerable dependency
    pub summary: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckReport {
    pub fn from_run(run: &RunReport) -> Self {
        let error = match &run.outcome {
            RunOutcome::Aborted(e) => Some(e.to_string()),
            RunOutcome::Completed | RunOutcome::CompletedWithWarnings => None,
        };
        Self {
            run_id: run.run_id.clone(),
            outcome: run.outcome.as_label().to_owned(),
            phases: run.phases.clone(),
            dependencies: run.dependency_count,
            vulnerabilities: run.vulnerability_count,
            summary: run.summary.lines.clone(),
            warnings: run.warnings.clone(),
            error,
        }
    }
}

impl Render for CheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let outcome = match self.outcome.as_str() {
            "completed" => self.outcome.green().bold(),
            "aborted" => self.outcome.red().bold(),
            _ => self.outcome.yellow().bold(),
        };
        writeln!(w, "Dependency Check: {} (run {})", outcome, self.run_id)?;
        writeln!(
            w,
            "  Dependencies: {}  Vulnerabilities: {}",
            self.dependencies, self.vulnerabilities
        )?;

        let phases: Vec<String> = self.phases.iter().map(ToString::to_string).collect();
        writeln!(w, "  Phases: {}", phases.join(" -> "))?;

        if !self.summary.is_empty() {
            writeln!(w)?;
            writeln!(w, "{}", "Vulnerable dependencies:".bold())?;
            for line in &self.summary {
                writeln!(w, "  {}", line.red())?;
            }
        }

        if !self.warnings.is_empty() {
            writeln!(w)?;
            for warning in &self.warnings {
                writeln!(w, "  {} {}", "warning:".yellow(), warning)?;
            }
        }

        if let Some(ref error) = self.error {
            writeln!(w)?;
            writeln!(w, "  {} {}", "error:".red().bold(), error)?;
        }

        Ok(())
    }
}
