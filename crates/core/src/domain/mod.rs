// Domain Layer - Pure business logic and entities

pub mod api_key;
pub mod error;
pub mod job;
pub mod language;
pub mod problem;
pub mod submission;

// Re-exports
pub use api_key::{ApiKey, Capability, NewApiKey, MAX_KEY_NAME_LEN};
pub use error::DomainError;
pub use job::{
    ClaimDetails, Job, JobDetails, JobProgress, JobStatus, Verdict, VerdictDetails, STALE_CLAIM_MS,
};
pub use language::Language;
pub use problem::{NewProblem, Problem, ProblemDetails, ProblemPatch};
pub use submission::{NewSubmission, Submission, SubmissionDetails};

/// Epoch-millisecond timestamps are the storage convention; the wire
/// convention is POSIX seconds as a float.
pub fn millis_to_secs(ms: i64) -> f64 {
    ms as f64 / 1000.0
}
