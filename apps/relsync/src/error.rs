//! CLI error handling

use std::fmt;

use relsync_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(relsync_errors::ConfigError),
    /// Operations error
    Ops(relsync_errors::Error),
    /// Invalid command arguments
    InvalidArguments(String),
    /// I/O error
    Io(std::io::Error),
}

impl CliError {
    /// Whether re-running the whole cycle may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CliError::Ops(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Stable error code, when there is one
    pub fn code(&self) -> Option<&'static str> {
        match self {
            CliError::Config(e) => e.user_code(),
            CliError::Ops(e) => e.user_code(),
            CliError::InvalidArguments(_) => Some("cli.invalid_arguments"),
            CliError::Io(_) => Some("error.io"),
        }
    }

    /// Remediation hint, when there is one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::Config(e) => e.user_hint(),
            CliError::Ops(e) => e.user_hint(),
            _ => None,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Ops(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::InvalidArguments(_) => None,
        }
    }
}

impl From<relsync_errors::ConfigError> for CliError {
    fn from(e: relsync_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<relsync_errors::Error> for CliError {
    fn from(e: relsync_errors::Error) -> Self {
        CliError::Ops(e)
    }
}

impl From<relsync_errors::SyncError> for CliError {
    fn from(e: relsync_errors::SyncError) -> Self {
        CliError::Ops(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
