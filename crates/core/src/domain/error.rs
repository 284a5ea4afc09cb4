// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid job state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Verification code does not match")]
    CodeMismatch,

    #[error("Job is not claimable")]
    NotClaimable,

    #[error("Last ran case {last_ran_case} out of range (problem has {test_cases} cases)")]
    CaseOutOfRange { last_ran_case: i64, test_cases: i64 },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Unknown verdict: {0}")]
    UnknownVerdict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
