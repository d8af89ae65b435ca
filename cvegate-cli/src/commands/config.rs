//! `cvegate config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use cvegate_core::config::PolicyConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const REDACTED: &str = "***REDACTED***";

/// Section names accepted by `config show --section`.
pub const SECTIONS: [&str; 6] = ["general", "scan", "failure", "report", "engine", "analyzers"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => {
            let report = validate(config_path).await;
            writer.render(&report)?;
            if !report.valid {
                return Err(CliError::Config("policy file is invalid".to_owned()));
            }
            Ok(())
        }
        ConfigAction::Show { section } => {
            let report = show(config_path, section.as_deref()).await?;
            writer.render(&report)
        }
    }
}

/// Load and validate the policy file, collecting any error into the report.
pub async fn validate(config_path: &Path) -> ConfigValidationReport {
    info!(path = %config_path.display(), "validating policy");

    let errors = match PolicyConfig::load(config_path).await {
        Ok(_) => Vec::new(),
        Err(e) => vec![e.to_string()],
    };

    ConfigValidationReport {
        source: config_path.display().to_string(),
        valid: errors.is_empty(),
        errors,
    }
}

/// Build the effective policy view with credentials redacted.
///
/// # Errors
///
/// Returns `CliError::Config` if loading fails or `CliError::Command` if the
/// section name is not one of [`SECTIONS`].
pub async fn show(config_path: &Path, section: Option<&str>) -> Result<ConfigReport, CliError> {
    info!(path = %config_path.display(), "loading policy");

    let mut policy = PolicyConfig::load(config_path).await?;
    redact_credentials(&mut policy);

    let config_toml = match section {
        None => to_toml(&policy),
        Some("general") => to_toml(&policy.general),
        Some("scan") => to_toml(&policy.scan),
        Some("failure") => to_toml(&policy.failure),
        Some("report") => to_toml(&policy.report),
        Some("engine") => to_toml(&policy.engine),
        Some("analyzers") => to_toml(&policy.analyzers),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    Ok(ConfigReport {
        source: config_path.display().to_string(),
        section: section.map(str::to_owned),
        config_toml,
    })
}

fn to_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {})", e))
}

/// Blank out proxy and database passwords and credentials in the connection string.
pub fn redact_credentials(policy: &mut PolicyConfig) {
    if policy.engine.proxy.password.is_some() {
        policy.engine.proxy.password = Some(REDACTED.to_owned());
    }
    if policy.engine.data.password.is_some() {
        policy.engine.data.password = Some(REDACTED.to_owned());
    }
    if let Some(ref url) = policy.engine.data.connection_string {
        policy.engine.data.connection_string = Some(redact_url(url));
    }
}

/// Replace `user:password@` in a connection URL with the redaction marker.
///
/// `jdbc:postgresql://user:pw@host:5432/db` becomes
/// `jdbc:postgresql://***REDACTED***@host:5432/db`.
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_owned();
    };
    let (scheme, rest) = url.split_at(scheme_end + 3);

    let Some(at_pos) = rest.find('@') else {
        return url.to_owned();
    };
    match rest.find('/') {
        Some(slash_pos) if slash_pos < at_pos => url.to_owned(),
        _ => format!("{}{}{}", scheme, REDACTED, &rest[at_pos..]),
    }
}

/// Effective policy display.
///
/// `config_toml` is only used for text rendering.
#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Policy {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Policy (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Policy validation result.
#[derive(Debug, Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty when valid
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Policy Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
