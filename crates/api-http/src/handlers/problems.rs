// Problem endpoints. Juries fetch problems too, so reads accept either
// capability; writes stay with readers.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};

use judge_core::domain::{Capability, NewProblem, Problem, ProblemDetails, ProblemPatch};

use crate::auth::authorize;
use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{
    optional_f64, optional_i64, optional_language, parse_language, require, require_f64,
    require_i64, ProblemForm,
};

pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProblemDetails>>, ApiError> {
    authorize(&state, &headers, &[Capability::Jury, Capability::Reader]).await?;
    let problems = state.problems.list_all().await?;
    Ok(Json(problems.iter().map(Problem::details).collect()))
}

/// Single-problem fetch honoring `If-Modified-Since` (unix seconds): the
/// snapshot is resent only if it changed after the given whole second.
pub async fn details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &[Capability::Jury, Capability::Reader]).await?;

    let problem = state
        .problems
        .find(id)
        .await?
        .ok_or_else(|| ApiError::bare(StatusCode::NOT_FOUND))?;

    if let Some(given) = if_modified_since(&headers)? {
        if !problem.modified_since(given) {
            return Ok(StatusCode::NOT_MODIFIED.into_response());
        }
    }
    Ok(Json(problem.details()).into_response())
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ProblemForm>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers, &[Capability::Reader]).await?;

    let new = NewProblem {
        id: require_i64(&form.id, "id")?,
        test_cases: require_i64(&form.test_cases, "test_cases")?,
        time_limit: require_f64(&form.time_limit, "time_limit")?,
        memory_limit: require_i64(&form.memory_limit, "memory_limit")?,
        generator_code: require(&form.generator_code, "generator_code")?.to_string(),
        generator_language: parse_language(require(&form.generator_language, "generator_language")?)?,
        grader_code: require(&form.grader_code, "grader_code")?.to_string(),
        grader_language: parse_language(require(&form.grader_language, "grader_language")?)?,
        source_verifier_code: form.source_verifier_code.clone(),
        source_verifier_language: optional_language(&form.source_verifier_language)?,
    };

    state
        .problems
        .insert(new, state.clock.now_millis())
        .await?;
    Ok(StatusCode::CREATED)
}

/// Partial update; `id` and `last_modified` are never client-settable.
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<ProblemForm>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers, &[Capability::Reader]).await?;

    let patch = ProblemPatch {
        test_cases: optional_i64(&form.test_cases, "test_cases")?,
        time_limit: optional_f64(&form.time_limit, "time_limit")?,
        memory_limit: optional_i64(&form.memory_limit, "memory_limit")?,
        generator_code: form.generator_code.clone(),
        generator_language: optional_language(&form.generator_language)?,
        grader_code: form.grader_code.clone(),
        grader_language: optional_language(&form.grader_language)?,
        source_verifier_code: form.source_verifier_code.clone(),
        source_verifier_language: optional_language(&form.source_verifier_language)?,
    };

    state
        .problems
        .update(id, patch, state.clock.now_millis())
        .await?;
    Ok(StatusCode::OK)
}

fn if_modified_since(headers: &HeaderMap) -> Result<Option<i64>, ApiError> {
    let Some(value) = headers.get("If-Modified-Since") else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::bad_request("Bad If-Modified-Since header"))?;
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| ApiError::bad_request("If-Modified-Since must be unix seconds"))
}
