//! CLI-specific error types and exit code mapping

use converge_core::error::ConvergeError;
use converge_poller::PollerError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// A lifecycle operation did not succeed.
    #[error("{0}")]
    Poll(#[from] PollerError),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from converge-core.
    #[error("{0}")]
    Core(#[from] ConvergeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | Wait timed out                   |
    /// | 4    | Wait stopped on a fatal error    |
    /// | 130  | Cancelled by interrupt           |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Core(ConvergeError::Config(_)) => 2,
            Self::Poll(err) => match err {
                PollerError::Config { .. } => 2,
                PollerError::TimedOut { .. } => 3,
                PollerError::Fatal { .. } => 4,
                PollerError::Cancelled { .. } => 130,
                _ => 1,
            },
            Self::Command(_) | Self::JsonSerialize(_) | Self::Io(_) | Self::Core(_) => 1,
        }
    }
}
