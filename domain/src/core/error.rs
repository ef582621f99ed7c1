//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// Every variant names the thing that was wrong (a group identifier, a
/// configuration key or a pipeline node) so a failed run can be traced back
/// to its cause without re-running it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Structural mismatch: missing slot, inconsistent volume counts,
    /// incompatible spatial grids, too few groups for averaging.
    #[error("Validation error [{subject}]: {message}")]
    Validation { subject: String, message: String },

    /// Invalid or contradictory configuration.
    #[error("Configuration error [{key}]: {message}")]
    Config { key: String, message: String },

    /// A required upstream signal was never produced.
    #[error("Missing input '{input}' for node '{node}'")]
    MissingInput { node: String, input: String },

    /// Malformed gradient or table input.
    #[error("Format error: {0}")]
    Format(String),
}

impl DomainError {
    pub fn validation(subject: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation {
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Config {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn missing_input(node: impl Into<String>, input: impl Into<String>) -> Self {
        DomainError::MissingInput {
            node: node.into(),
            input: input.into(),
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        DomainError::Format(message.into())
    }

    /// Stable label for logs and exit messages
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Validation { .. } => "validation",
            DomainError::Config { .. } => "config",
            DomainError::MissingInput { .. } => "missing_input",
            DomainError::Format(_) => "format",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Validation { .. })
    }

    pub fn is_config(&self) -> bool {
        matches!(self, DomainError::Config { .. })
    }

    pub fn is_missing_input(&self) -> bool {
        matches!(self, DomainError::MissingInput { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, DomainError::Format(_))
    }
}
