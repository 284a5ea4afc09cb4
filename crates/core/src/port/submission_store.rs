// Submission Store Port (Interface)

use crate::domain::{Job, NewSubmission, Submission};
use crate::error::Result;
use async_trait::async_trait;

/// Listing filters for the submission read endpoints.
#[derive(Debug, Clone, Copy)]
pub enum SubmissionFilter {
    All,
    Uid(i64),
    Gid(i64),
    Problem(i64),
}

/// Store interface for submissions. Creation always produces the first job
/// in the same transaction: a submission without at least one job never
/// becomes visible.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn create_with_job(
        &self,
        new: NewSubmission,
        callback_url: Option<String>,
        now: i64,
    ) -> Result<(Submission, Job)>;

    async fn find(&self, id: i64) -> Result<Option<Submission>>;

    /// List submissions matching a filter, id ascending.
    async fn list(&self, filter: SubmissionFilter) -> Result<Vec<Submission>>;
}
