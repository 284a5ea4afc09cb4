// Submission entity: one upload of source code targeting one problem.

use serde::{Deserialize, Serialize};

use crate::domain::job::JobDetails;
use crate::domain::millis_to_secs;
use crate::domain::Language;

/// Immutable record of user-supplied code. `uid` and `gid` are opaque
/// identifiers owned by the calling frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub uid: Option<i64>,
    pub gid: Option<i64>,
    pub time: i64,
    pub problem_id: i64,
    pub code: String,
    pub language: Language,
}

/// Fields supplied by the caller when creating a submission.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub uid: Option<i64>,
    pub gid: Option<i64>,
    pub problem_id: i64,
    pub code: String,
    pub language: Language,
}

impl Submission {
    /// Submission payload; unlike job details, absent `uid`/`gid` serialize
    /// as explicit nulls. The jobs array is ordered by creation time.
    pub fn details(&self, jobs: Vec<JobDetails>) -> SubmissionDetails {
        SubmissionDetails {
            id: self.id,
            uid: self.uid,
            gid: self.gid,
            time: millis_to_secs(self.time),
            problem_id: self.problem_id,
            code: self.code.clone(),
            language: self.language,
            jobs: Some(jobs),
        }
    }

}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionDetails {
    pub id: i64,
    pub uid: Option<i64>,
    pub gid: Option<i64>,
    pub time: f64,
    pub problem_id: i64,
    pub code: String,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<JobDetails>>,
}
