//! Domain Errors
//!
//! One taxonomy shared by every collaborator contract, so the jobs can decide
//! "skip and log" vs "report to the operator" without knowing which adapter failed.

use std::fmt;
use thiserror::Error;

/// External collaborator that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    Tracker,
    Retrieval,
    LanguageModel,
    Storage,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collaborator::Tracker => "tracker",
            Collaborator::Retrieval => "retrieval",
            Collaborator::LanguageModel => "language_model",
            Collaborator::Storage => "storage",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Lookup by id found nothing (unknown item, resolved or unknown pending advice)
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// Collaborator unreachable or answered with a failure
    #[error("{collaborator} unavailable: {message}")]
    CollaboratorUnavailable {
        collaborator: Collaborator,
        message: String,
    },

    /// Collaborator call exceeded its time budget
    #[error("{collaborator} timed out during {operation} after {seconds}s")]
    Timeout {
        collaborator: Collaborator,
        operation: String,
        seconds: u64,
    },

    /// Collaborator answered successfully but with nothing usable
    #[error("{collaborator} returned an empty response")]
    EmptyResponse { collaborator: Collaborator },

    /// Writing persisted state failed
    #[error("Persistence error for '{key}': {message}")]
    Persistence { key: String, message: String },

    /// Persisted state exists but cannot be decoded
    #[error("Corrupted record '{key}': {message}")]
    Corrupted { key: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn unavailable(collaborator: Collaborator, message: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable {
            collaborator,
            message: message.into(),
        }
    }

    pub fn persistence(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Persistence {
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the next scheduled tick may succeed where this attempt failed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CollaboratorUnavailable { .. }
                | Self::Timeout { .. }
                | Self::EmptyResponse { .. }
                | Self::Persistence { .. }
        )
    }

    /// Stable label used as a structured logging field
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::CollaboratorUnavailable { .. } => "collaborator_unavailable",
            Self::Timeout { .. } => "timeout",
            Self::EmptyResponse { .. } => "empty_response",
            Self::Persistence { .. } => "persistence",
            Self::Corrupted { .. } => "corrupted",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let unavailable = DomainError::unavailable(Collaborator::Tracker, "connection refused");
        assert!(unavailable.is_retryable());
        assert_eq!(unavailable.category(), "collaborator_unavailable");

        let missing = DomainError::not_found("pending advice", "abc");
        assert!(!missing.is_retryable());
        assert!(missing.is_not_found());
        assert_eq!(missing.to_string(), "pending advice not found: abc");
    }

    #[test]
    fn test_timeout_message_names_collaborator() {
        let err = DomainError::Timeout {
            collaborator: Collaborator::LanguageModel,
            operation: "generate_advice".into(),
            seconds: 120,
        };
        assert_eq!(
            err.to_string(),
            "language_model timed out during generate_advice after 120s"
        );
    }
}
