//! Application Layer Errors

use domain::errors::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain layer errors
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// A manual trigger arrived while the job was already running
    #[error("Job '{job}' is already running")]
    JobBusy { job: &'static str },
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

impl ApplicationError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_not_found())
    }

    /// Stable label for structured logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.category(),
            Self::JobBusy { .. } => "job_busy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_keep_their_category() {
        let err: ApplicationError = DomainError::not_found("pending advice", "p1").into();
        assert!(err.is_not_found());
        assert_eq!(err.category(), "not_found");
        assert_eq!(err.to_string(), "Domain error: pending advice not found: p1");
    }

    #[test]
    fn test_job_busy_message() {
        let err = ApplicationError::JobBusy { job: "knowledge_update" };
        assert_eq!(err.to_string(), "Job 'knowledge_update' is already running");
        assert!(!err.is_not_found());
    }
}
