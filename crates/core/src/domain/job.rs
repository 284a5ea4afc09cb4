// Job entity: the unit of evaluation and the primary state-bearing record.

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};
use crate::domain::millis_to_secs;

/// A started job whose claim is older than this is considered abandoned and
/// may be handed to another jury.
pub const STALE_CLAIM_MS: i64 = 5 * 60 * 1000;

/// Job status over its lifecycle. `finished` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Started,
    AwaitingVerdict,
    Finished,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Started => "started",
            JobStatus::AwaitingVerdict => "awaiting_verdict",
            JobStatus::Finished => "finished",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<JobStatus> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "started" => Some(JobStatus::Started),
            "awaiting_verdict" => Some(JobStatus::AwaitingVerdict),
            "finished" => Some(JobStatus::Finished),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Cancelled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ten verdict codes a jury may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "AC")]
    Accepted,
    #[serde(rename = "RAN")]
    Ran,
    #[serde(rename = "IS")]
    InvalidSource,
    #[serde(rename = "WA")]
    WrongAnswer,
    #[serde(rename = "TLE")]
    TimeLimitExceeded,
    #[serde(rename = "MLE")]
    MemoryLimitExceeded,
    #[serde(rename = "RTE")]
    RuntimeError,
    #[serde(rename = "ISC")]
    IllegalSyscall,
    #[serde(rename = "CE")]
    CompilationError,
    #[serde(rename = "JE")]
    JudgeError,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Accepted => "AC",
            Verdict::Ran => "RAN",
            Verdict::InvalidSource => "IS",
            Verdict::WrongAnswer => "WA",
            Verdict::TimeLimitExceeded => "TLE",
            Verdict::MemoryLimitExceeded => "MLE",
            Verdict::RuntimeError => "RTE",
            Verdict::IllegalSyscall => "ISC",
            Verdict::CompilationError => "CE",
            Verdict::JudgeError => "JE",
        }
    }

    pub fn parse(s: &str) -> Result<Verdict> {
        match s {
            "AC" => Ok(Verdict::Accepted),
            "RAN" => Ok(Verdict::Ran),
            "IS" => Ok(Verdict::InvalidSource),
            "WA" => Ok(Verdict::WrongAnswer),
            "TLE" => Ok(Verdict::TimeLimitExceeded),
            "MLE" => Ok(Verdict::MemoryLimitExceeded),
            "RTE" => Ok(Verdict::RuntimeError),
            "ISC" => Ok(Verdict::IllegalSyscall),
            "CE" => Ok(Verdict::CompilationError),
            "JE" => Ok(Verdict::JudgeError),
            other => Err(DomainError::UnknownVerdict(other.to_string())),
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-testcase progress reported by a jury on submit.
#[derive(Debug, Clone, Copy)]
pub struct JobProgress {
    pub execution_time: f64,
    pub execution_memory: i64,
    pub last_ran_case: i64,
}

/// Job Entity
///
/// Timestamps are epoch milliseconds. Invariants:
/// - `started` implies `claim_time` and `verification_code` are set,
/// - `finished` implies `verdict` and `completion_time` set, code cleared,
/// - `queued` implies `claim_time` and `verification_code` cleared,
/// - terminal states accept no further mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub submission_id: i64,
    pub creation_time: i64,
    pub status: JobStatus,
    pub claim_time: Option<i64>,
    pub completion_time: Option<i64>,

    // Filled while a jury holds the job
    pub verification_code: Option<i64>,
    pub last_ran_case: Option<i64>,
    pub execution_time: Option<f64>,
    pub execution_memory: Option<i64>,

    pub verdict: Option<Verdict>,

    pub callback_url: Option<String>,
}

impl Job {
    pub fn new(id: i64, submission_id: i64, creation_time: i64, callback_url: Option<String>) -> Self {
        Self {
            id,
            submission_id,
            creation_time,
            status: JobStatus::Queued,
            claim_time: None,
            completion_time: None,
            verification_code: None,
            last_ran_case: None,
            execution_time: None,
            execution_memory: None,
            verdict: None,
            callback_url,
        }
    }

    /// The claimable predicate: queued, or started with a stale claim.
    pub fn is_claimable(&self, now_millis: i64) -> bool {
        match self.status {
            JobStatus::Queued => true,
            JobStatus::Started => self
                .claim_time
                .map(|t| t < now_millis - STALE_CLAIM_MS)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Hand the job to a jury, rolling a fresh verification code. Reclaiming
    /// a stale `started` job goes through here too and invalidates the
    /// previous holder's code.
    pub fn claim(&mut self, now_millis: i64, verification_code: i64) -> Result<()> {
        if !self.is_claimable(now_millis) {
            return Err(DomainError::NotClaimable);
        }
        self.status = JobStatus::Started;
        self.claim_time = Some(now_millis);
        self.verification_code = Some(verification_code);
        Ok(())
    }

    /// Compare a supplied verification code against the stored one. A held
    /// job without a stored code predates the interlock and passes; callers
    /// log that case.
    pub fn verify_code(&self, supplied: i64) -> Result<()> {
        match self.verification_code {
            Some(code) if code != supplied => Err(DomainError::CodeMismatch),
            _ => Ok(()),
        }
    }

    /// Voluntary release back to the queue. Clears both the claim time and
    /// the verification code, so only a fresh claim can act on the job again.
    pub fn release(&mut self, supplied_code: i64) -> Result<()> {
        if self.status != JobStatus::Started {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: JobStatus::Queued.to_string(),
            });
        }
        self.verify_code(supplied_code)?;
        self.status = JobStatus::Queued;
        self.claim_time = None;
        self.verification_code = None;
        Ok(())
    }

    /// Record per-case progress from the holding jury. Once every case has
    /// run the job awaits its verdict.
    pub fn record_progress(&mut self, progress: JobProgress, test_cases: i64) -> Result<()> {
        if self.status != JobStatus::Started && self.status != JobStatus::AwaitingVerdict {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: JobStatus::AwaitingVerdict.to_string(),
            });
        }
        if progress.last_ran_case < 0 || progress.last_ran_case > test_cases {
            return Err(DomainError::CaseOutOfRange {
                last_ran_case: progress.last_ran_case,
                test_cases,
            });
        }
        self.execution_time = Some(progress.execution_time);
        self.execution_memory = Some(progress.execution_memory);
        self.last_ran_case = Some(progress.last_ran_case);
        if progress.last_ran_case == test_cases {
            self.status = JobStatus::AwaitingVerdict;
        }
        Ok(())
    }

    /// Final transition: the verdict is in. Clears the verification code so
    /// no further jury message can touch the job.
    pub fn finish(&mut self, verdict: Verdict, now_millis: i64) -> Result<()> {
        if self.status != JobStatus::Started && self.status != JobStatus::AwaitingVerdict {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: JobStatus::Finished.to_string(),
            });
        }
        self.verdict = Some(verdict);
        self.status = JobStatus::Finished;
        self.completion_time = Some(now_millis);
        self.verification_code = None;
        Ok(())
    }

    /// One submit message from the holding jury, applied in request order:
    /// state conflict beats a bad code, the code check beats any mutation,
    /// and a present verdict finalizes after progress is recorded.
    pub fn submit_message(
        &mut self,
        supplied_code: i64,
        progress: JobProgress,
        test_cases: i64,
        verdict: Option<Verdict>,
        now_millis: i64,
    ) -> Result<()> {
        if self.status != JobStatus::Started && self.status != JobStatus::AwaitingVerdict {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: JobStatus::AwaitingVerdict.to_string(),
            });
        }
        self.verify_code(supplied_code)?;
        self.record_progress(progress, test_cases)?;
        if let Some(verdict) = verdict {
            self.finish(verdict, now_millis)?;
        }
        Ok(())
    }

    /// Cancel from any non-terminal state. The holding jury, if any, learns
    /// of this on its next submit.
    pub fn cancel(&mut self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: JobStatus::Cancelled.to_string(),
            });
        }
        self.status = JobStatus::Cancelled;
        Ok(())
    }

    /// Human-readable status for the monitor page.
    pub fn status_display(&self) -> String {
        match self.status {
            JobStatus::Started => {
                format!("Running on test case {}", self.last_ran_case.unwrap_or(0) + 1)
            }
            JobStatus::Finished => self
                .verdict
                .map(|v| v.as_str().to_string())
                .unwrap_or_else(|| self.status.to_string()),
            _ => self.status.to_string(),
        }
    }

    pub fn details(&self) -> JobDetails {
        JobDetails {
            id: self.id,
            submission_id: self.submission_id,
            creation_time: millis_to_secs(self.creation_time),
            status: self.status,
            claim_time: self.claim_time.map(millis_to_secs),
            completion_time: self.completion_time.map(millis_to_secs),
            last_ran_case: self.last_ran_case,
            execution_time: self.execution_time,
            execution_memory: self.execution_memory,
            verdict: self.verdict,
        }
    }

    pub fn verdict_details(&self) -> VerdictDetails {
        VerdictDetails {
            status: self.status,
            completion_time: self.completion_time.map(millis_to_secs),
            last_ran_case: self.last_ran_case,
            execution_time: self.execution_time,
            execution_memory: self.execution_memory,
            verdict: self.verdict,
        }
    }
}

/// Full job payload for readers; null fields are omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetails {
    pub id: i64,
    pub submission_id: i64,
    pub creation_time: f64,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_ran_case: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_memory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

/// Payload handed to the jury that wins a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimDetails {
    pub id: i64,
    pub problem_id: i64,
    pub verification_code: i64,
    pub code: String,
    pub language: crate::domain::Language,
}

/// Progress/verdict payload pushed to the job's room on every submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictDetails {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_ran_case: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_memory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}
