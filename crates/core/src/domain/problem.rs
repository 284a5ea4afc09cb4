// Problem entity: immutable-by-convention definition of one contest problem.

use serde::{Deserialize, Serialize};

use crate::domain::millis_to_secs;
use crate::domain::Language;

/// Problem definition. The id is assigned by the contest frontend, not the
/// store. `last_modified` is maintained by the store on every mutation and
/// drives HTTP conditional fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub last_modified: i64,
    pub test_cases: i64,
    pub time_limit: f64,
    pub memory_limit: i64,
    pub generator_code: String,
    pub generator_language: Language,
    pub grader_code: String,
    pub grader_language: Language,
    pub source_verifier_code: Option<String>,
    pub source_verifier_language: Option<Language>,
}

/// All non-nullable columns are required at creation.
#[derive(Debug, Clone)]
pub struct NewProblem {
    pub id: i64,
    pub test_cases: i64,
    pub time_limit: f64,
    pub memory_limit: i64,
    pub generator_code: String,
    pub generator_language: Language,
    pub grader_code: String,
    pub grader_language: Language,
    pub source_verifier_code: Option<String>,
    pub source_verifier_language: Option<Language>,
}

/// Partial update; only provided fields change. The id and `last_modified`
/// are never client-settable.
#[derive(Debug, Clone, Default)]
pub struct ProblemPatch {
    pub test_cases: Option<i64>,
    pub time_limit: Option<f64>,
    pub memory_limit: Option<i64>,
    pub generator_code: Option<String>,
    pub generator_language: Option<Language>,
    pub grader_code: Option<String>,
    pub grader_language: Option<Language>,
    pub source_verifier_code: Option<String>,
    pub source_verifier_language: Option<Language>,
}

impl Problem {
    /// Full-column payload; nullable columns serialize as nulls.
    pub fn details(&self) -> ProblemDetails {
        ProblemDetails {
            id: self.id,
            last_modified: millis_to_secs(self.last_modified),
            test_cases: self.test_cases,
            time_limit: self.time_limit,
            memory_limit: self.memory_limit,
            generator_code: self.generator_code.clone(),
            generator_language: self.generator_language,
            grader_code: self.grader_code.clone(),
            grader_language: self.grader_language,
            source_verifier_code: self.source_verifier_code.clone(),
            source_verifier_language: self.source_verifier_language,
        }
    }

    /// `If-Modified-Since` check: a snapshot taken at or after whole-second
    /// `given` needs no resend.
    pub fn modified_since(&self, given_unix_secs: i64) -> bool {
        self.last_modified / 1000 > given_unix_secs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub id: i64,
    pub last_modified: f64,
    pub test_cases: i64,
    pub time_limit: f64,
    pub memory_limit: i64,
    pub generator_code: String,
    pub generator_language: Language,
    pub grader_code: String,
    pub grader_language: Language,
    pub source_verifier_code: Option<String>,
    pub source_verifier_language: Option<Language>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(last_modified: i64) -> Problem {
        Problem {
            id: 2,
            last_modified,
            test_cases: 10,
            time_limit: 1.0,
            memory_limit: 65536,
            generator_code: "gen".into(),
            generator_language: Language::Python3,
            grader_code: "grade".into(),
            grader_language: Language::Python3,
            source_verifier_code: None,
            source_verifier_language: None,
        }
    }

    #[test]
    fn conditional_fetch_uses_floored_seconds() {
        // last_modified 1234.9s floors to 1234: not modified since 1234.
        let p = problem(1_234_900);
        assert!(!p.modified_since(1_234));
        assert!(!p.modified_since(1_235));
        assert!(p.modified_since(1_233));
    }
}
