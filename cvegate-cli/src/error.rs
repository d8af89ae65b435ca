//! CLI-specific error types and exit code mapping

use cvegate_core::error::{CvegateError, EngineError};
use cvegate_dependency_check::DependencyCheckError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Policy loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The CVSS gate fired.
    #[error("{0}")]
    Threshold(String),

    /// The run was aborted by engine, analysis or report errors.
    #[error("analysis aborted: {0}")]
    Analysis(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from cvegate-core.
    #[error("{0}")]
    Core(#[from] CvegateError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                        |
    /// |------|--------------------------------|
    /// | 0    | Success                        |
    /// | 1    | General / command error        |
    /// | 2    | Configuration error            |
    /// | 4    | CVSS threshold violated        |
    /// | 5    | Analysis aborted               |
    /// | 10   | IO error                       |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Threshold(_) => 4,
            Self::Analysis(_) => 5,
            Self::Io(_) => 10,
            Self::Core(core) => match core {
                CvegateError::Config(_) => 2,
                CvegateError::Engine(EngineError::ThresholdViolation(_)) => 4,
                CvegateError::Engine(_) => 5,
                CvegateError::Io(_) => 10,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<DependencyCheckError> for CliError {
    fn from(e: DependencyCheckError) -> Self {
        match e {
            DependencyCheckError::Config { .. } => Self::Config(e.to_string()),
            DependencyCheckError::ThresholdViolation { .. } => Self::Threshold(e.to_string()),
            DependencyCheckError::EngineInit(_)
            | DependencyCheckError::Analysis(_)
            | DependencyCheckError::Aggregate(_) => Self::Analysis(e.to_string()),
        }
    }
}
