//! Claim Dispatcher
//!
//! Juries pull work through here. The store performs the selection and the
//! `queued -> started` transition in one atomic step, so concurrent claims
//! each win at most one job; a `started` job whose claim has gone stale
//! (older than five minutes) is claimable again through the same path,
//! which rolls a fresh verification code and locks the previous holder out.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use crate::domain::ClaimDetails;
use crate::error::{AppError, Result};
use crate::port::{Event, EventBus, JobStore, Room, SubmissionStore, TimeProvider, TokenProvider};

pub struct ClaimDispatcher {
    jobs: Arc<dyn JobStore>,
    submissions: Arc<dyn SubmissionStore>,
    events: Arc<dyn EventBus>,
    tokens: Arc<dyn TokenProvider>,
    clock: Arc<dyn TimeProvider>,
}

impl ClaimDispatcher {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        submissions: Arc<dyn SubmissionStore>,
        events: Arc<dyn EventBus>,
        tokens: Arc<dyn TokenProvider>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            jobs,
            submissions,
            events,
            tokens,
            clock,
        }
    }

    /// Hand the next runnable job to the calling jury, or `None` when there
    /// is nothing to give. The returned payload is the jury's working set:
    /// problem id, submission source, and the verification code its
    /// subsequent submit/release messages must echo.
    pub async fn claim(&self) -> Result<Option<ClaimDetails>> {
        let verification_code = self.tokens.verification_code();
        let now = self.clock.now_millis();

        let Some(job) = self.jobs.claim_next(now, verification_code).await? else {
            return Ok(None);
        };

        let submission = self
            .submissions
            .find(job.submission_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Job {} references missing submission {}",
                    job.id, job.submission_id
                ))
            })?;

        let event = Event::new("job_claimed", vec![Room::Job(job.id)], json!(job.id));
        if let Err(error) = self.events.publish(event).await {
            warn!(job_id = job.id, %error, "Event publish failed");
        }

        Ok(Some(ClaimDetails {
            id: job.id,
            problem_id: submission.problem_id,
            verification_code,
            code: submission.code,
            language: submission.language,
        }))
    }
}
