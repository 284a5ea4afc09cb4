//! Job Lifecycle Engine
//!
//! Owns every job state transition except the claim itself (see
//! `dispatch`): creation, voluntary release, progress/verdict submission,
//! and cancellation. Transitions are serialized per job row by the store;
//! this service adds room fan-out and the one-shot verdict callback.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use crate::domain::{Job, JobProgress, JobStatus, NewSubmission, Submission, SubmissionDetails, Verdict};
use crate::error::{AppError, Result};
use crate::port::{
    CallbackPoster, Event, EventBus, JobFilter, JobStore, ProblemStore, Room, SubmissionFilter,
    SubmissionStore, TimeProvider,
};

/// Callback URLs beyond this length are rejected at the boundary.
pub const MAX_CALLBACK_URL_LEN: usize = 256;

pub struct JobLifecycle {
    jobs: Arc<dyn JobStore>,
    submissions: Arc<dyn SubmissionStore>,
    problems: Arc<dyn ProblemStore>,
    events: Arc<dyn EventBus>,
    callbacks: Arc<dyn CallbackPoster>,
    clock: Arc<dyn TimeProvider>,
}

impl JobLifecycle {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        submissions: Arc<dyn SubmissionStore>,
        problems: Arc<dyn ProblemStore>,
        events: Arc<dyn EventBus>,
        callbacks: Arc<dyn CallbackPoster>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            jobs,
            submissions,
            problems,
            events,
            callbacks,
            clock,
        }
    }

    /// Accept a new submission and enqueue its first job.
    pub async fn create_submission(
        &self,
        new: NewSubmission,
        callback_url: Option<String>,
    ) -> Result<(Submission, Job)> {
        if self.problems.find(new.problem_id).await?.is_none() {
            return Err(AppError::Validation(format!(
                "Problem {} does not exist",
                new.problem_id
            )));
        }
        check_callback_url(&callback_url)?;

        let now = self.clock.now_millis();
        let (submission, job) = self
            .submissions
            .create_with_job(new, callback_url, now)
            .await?;

        self.emit(Event::new(
            "submission_new",
            vec![Room::Submissions],
            json!(submission.id),
        ))
        .await;
        self.emit(Event::new(
            "job_new",
            vec![Room::Jobs, Room::Submission(submission.id)],
            json!(job.id),
        ))
        .await;

        Ok((submission, job))
    }

    /// Enqueue a rerun job for an existing submission.
    pub async fn create_job(
        &self,
        submission_id: i64,
        callback_url: Option<String>,
    ) -> Result<Job> {
        let submission = self
            .submissions
            .find(submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", submission_id)))?;
        check_callback_url(&callback_url)?;

        let job = self
            .jobs
            .insert(submission.id, self.clock.now_millis(), callback_url)
            .await?;

        self.emit(Event::new(
            "job_new",
            vec![Room::Jobs, Room::Submission(submission.id)],
            json!(job.id),
        ))
        .await;

        Ok(job)
    }

    /// Voluntary hand-back: `started -> queued`, code required.
    pub async fn release(&self, job_id: i64, supplied_code: i64) -> Result<()> {
        let job = self.jobs.release(job_id, supplied_code).await?;

        self.emit(Event::new(
            "job_released",
            vec![Room::Job(job.id)],
            json!(job.id),
        ))
        .await;
        Ok(())
    }

    /// Progress/verdict message from the holding jury. A present verdict
    /// finalizes the job and fires its callback exactly once, off this
    /// request path.
    pub async fn submit(
        &self,
        job_id: i64,
        supplied_code: i64,
        progress: JobProgress,
        verdict: Option<Verdict>,
    ) -> Result<Job> {
        let now = self.clock.now_millis();
        let job = self
            .jobs
            .submit(job_id, supplied_code, progress, verdict, now)
            .await?;

        let mut payload = serde_json::to_value(job.verdict_details())?;
        payload["id"] = json!(job.id);
        self.emit(Event::new("job_updated", vec![Room::Job(job.id)], payload))
            .await;

        if job.status == JobStatus::Finished {
            self.fire_callback(&job);
        }

        Ok(job)
    }

    /// Mark a job cancelled. The holding jury, if any, is not signalled; it
    /// finds out when its next submit returns a conflict.
    pub async fn cancel(&self, job_id: i64) -> Result<()> {
        let job = self.jobs.cancel(job_id).await?;

        self.emit(Event::new(
            "job_cancelled",
            vec![Room::Job(job.id)],
            json!(job.id),
        ))
        .await;
        Ok(())
    }

    pub async fn get_job(&self, id: i64) -> Result<Job> {
        self.jobs
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))
    }

    pub async fn list_jobs(&self, filter: JobFilter) -> Result<Vec<Job>> {
        self.jobs.list(filter).await
    }

    /// Submission details carry the full ordered job history.
    pub async fn get_submission_details(&self, id: i64) -> Result<SubmissionDetails> {
        let submission = self
            .submissions
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;
        let jobs = self.jobs.list(JobFilter::Submission(id)).await?;
        Ok(submission.details(jobs.iter().map(Job::details).collect()))
    }

    /// Listing loads the jobs for the whole result set in one query rather
    /// than walking submission-by-submission.
    pub async fn list_submission_details(
        &self,
        filter: SubmissionFilter,
    ) -> Result<Vec<SubmissionDetails>> {
        let submissions = self.submissions.list(filter).await?;
        let jobs = self.jobs.list(job_filter_for(filter)).await?;

        Ok(submissions
            .into_iter()
            .map(|submission| {
                let own_jobs = jobs
                    .iter()
                    .filter(|job| job.submission_id == submission.id)
                    .map(Job::details)
                    .collect();
                submission.details(own_jobs)
            })
            .collect())
    }

    fn fire_callback(&self, job: &Job) {
        let Some(url) = job.callback_url.clone() else {
            return;
        };
        let payload = match serde_json::to_value(job.details()) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(job_id = job.id, %error, "Failed to encode callback payload");
                return;
            }
        };
        let poster = Arc::clone(&self.callbacks);
        let job_id = job.id;
        tokio::spawn(async move {
            if let Err(error) = poster.post(&url, payload).await {
                warn!(job_id, url = %url, %error, "Verdict callback failed");
            }
        });
    }

    async fn emit(&self, event: Event) {
        let name = event.name;
        if let Err(error) = self.events.publish(event).await {
            warn!(event = name, %error, "Event publish failed");
        }
    }
}

fn job_filter_for(filter: SubmissionFilter) -> JobFilter {
    match filter {
        SubmissionFilter::All => JobFilter::All,
        SubmissionFilter::Uid(uid) => JobFilter::Uid(uid),
        SubmissionFilter::Gid(gid) => JobFilter::Gid(gid),
        SubmissionFilter::Problem(id) => JobFilter::Problem(id),
    }
}

fn check_callback_url(callback_url: &Option<String>) -> Result<()> {
    match callback_url {
        Some(url) if url.len() > MAX_CALLBACK_URL_LEN => {
            Err(AppError::Validation("Callback URL too long".to_string()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_url_length_boundary() {
        assert!(check_callback_url(&None).is_ok());
        assert!(check_callback_url(&Some("x".repeat(256))).is_ok());
        assert!(check_callback_url(&Some("x".repeat(257))).is_err());
    }
}
