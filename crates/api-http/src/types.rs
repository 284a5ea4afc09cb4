// Form DTOs and field parsing.
//
// Mutating endpoints accept form bodies. Every field arrives as an
// optional string so that missing and malformed values produce the 400s
// the surface promises instead of an extractor rejection.

use serde::Deserialize;

use judge_core::domain::{Language, Verdict};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ApiKeyForm {
    pub name: Option<String>,
    pub jury: Option<String>,
    pub reader: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionForm {
    pub problem_id: Option<String>,
    pub code: Option<String>,
    pub language: Option<String>,
    pub uid: Option<String>,
    pub gid: Option<String>,
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateJobForm {
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseForm {
    pub verification_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    pub verification_code: Option<String>,
    pub execution_time: Option<String>,
    pub execution_memory: Option<String>,
    pub last_ran_case: Option<String>,
    pub verdict: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProblemForm {
    pub id: Option<String>,
    pub test_cases: Option<String>,
    pub time_limit: Option<String>,
    pub memory_limit: Option<String>,
    pub generator_code: Option<String>,
    pub generator_language: Option<String>,
    pub grader_code: Option<String>,
    pub grader_language: Option<String>,
    pub source_verifier_code: Option<String>,
    pub source_verifier_language: Option<String>,
}

pub fn require<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str, ApiError> {
    field
        .as_deref()
        .ok_or_else(|| ApiError::bad_request(format!("Missing field {}", name)))
}

pub fn require_i64(field: &Option<String>, name: &str) -> Result<i64, ApiError> {
    require(field, name)?
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Field {} is not an integer", name)))
}

pub fn require_f64(field: &Option<String>, name: &str) -> Result<f64, ApiError> {
    require(field, name)?
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Field {} is not a number", name)))
}

pub fn optional_i64(field: &Option<String>, name: &str) -> Result<Option<i64>, ApiError> {
    field
        .as_deref()
        .map(|value| {
            value
                .parse()
                .map_err(|_| ApiError::bad_request(format!("Field {} is not an integer", name)))
        })
        .transpose()
}

pub fn optional_f64(field: &Option<String>, name: &str) -> Result<Option<f64>, ApiError> {
    field
        .as_deref()
        .map(|value| {
            value
                .parse()
                .map_err(|_| ApiError::bad_request(format!("Field {} is not a number", name)))
        })
        .transpose()
}

pub fn parse_language(code: &str) -> Result<Language, ApiError> {
    Language::parse(code)
        .map_err(|_| ApiError::bad_request(format!("Language {} not supported", code)))
}

pub fn optional_language(field: &Option<String>) -> Result<Option<Language>, ApiError> {
    field.as_deref().map(parse_language).transpose()
}

/// The verdict field is optional and an empty string means "not yet".
pub fn optional_verdict(field: &Option<String>) -> Result<Option<Verdict>, ApiError> {
    match field.as_deref() {
        None | Some("") => Ok(None),
        Some(code) => Verdict::parse(code)
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Unknown verdict {}", code))),
    }
}

/// Form booleans arrive as the literal string "true".
pub fn form_bool(field: &Option<String>) -> bool {
    field.as_deref() == Some("true")
}
