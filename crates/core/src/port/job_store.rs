// Job Store Port (Interface)

use crate::domain::{Job, JobProgress, Verdict};
use crate::error::Result;
use async_trait::async_trait;

/// Listing filters for the read endpoints. `Uid`/`Gid`/`Problem` filter
/// through the owning submission.
#[derive(Debug, Clone, Copy)]
pub enum JobFilter {
    All,
    Uid(i64),
    Gid(i64),
    Problem(i64),
    Submission(i64),
}

/// Store interface for job persistence and the serialized state
/// transitions. Every mutating call runs its read-check-write cycle inside
/// one transaction so job rows never interleave mid-transition.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new queued job for a submission.
    async fn insert(
        &self,
        submission_id: i64,
        creation_time: i64,
        callback_url: Option<String>,
    ) -> Result<Job>;

    /// Find job by id.
    async fn find(&self, id: i64) -> Result<Option<Job>>;

    /// List jobs matching a filter, creation time ascending.
    async fn list(&self, filter: JobFilter) -> Result<Vec<Job>>;

    /// Atomically hand the next claimable job to a caller: smallest
    /// `(creation_time, id)` among `queued` or stale `started` jobs. The
    /// winning row leaves the call `started` with `claim_time = now` and the
    /// supplied verification code; concurrent callers each receive distinct
    /// jobs or nothing.
    async fn claim_next(&self, now: i64, verification_code: i64) -> Result<Option<Job>>;

    /// Count of jobs currently satisfying the claimable predicate (the
    /// autoscaler's load sample).
    async fn count_claimable(&self, now: i64) -> Result<i64>;

    /// `started -> queued` with code check; clears claim time and code.
    async fn release(&self, id: i64, supplied_code: i64) -> Result<Job>;

    /// Progress/verdict message from the holding jury. Overwrites the
    /// execution metrics; moves to `awaiting_verdict` when the last case has
    /// run; a present verdict finalizes the job.
    async fn submit(
        &self,
        id: i64,
        supplied_code: i64,
        progress: JobProgress,
        verdict: Option<Verdict>,
        now: i64,
    ) -> Result<Job>;

    /// Any non-terminal state -> `cancelled`.
    async fn cancel(&self, id: i64) -> Result<Job>;
}
