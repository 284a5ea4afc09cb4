// Submission endpoints.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Form, Json};
use serde_json::json;

use judge_core::domain::{Capability, NewSubmission, SubmissionDetails};
use judge_core::port::SubmissionFilter;

use crate::auth::authorize;
use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{optional_i64, parse_language, require, CreateJobForm, SubmissionForm};

pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SubmissionDetails>>, ApiError> {
    list_filtered(state, headers, SubmissionFilter::All).await
}

pub async fn list_by_uid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(uid): Path<i64>,
) -> Result<Json<Vec<SubmissionDetails>>, ApiError> {
    list_filtered(state, headers, SubmissionFilter::Uid(uid)).await
}

pub async fn list_by_gid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(gid): Path<i64>,
) -> Result<Json<Vec<SubmissionDetails>>, ApiError> {
    list_filtered(state, headers, SubmissionFilter::Gid(gid)).await
}

pub async fn list_by_problem(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(problem_id): Path<i64>,
) -> Result<Json<Vec<SubmissionDetails>>, ApiError> {
    list_filtered(state, headers, SubmissionFilter::Problem(problem_id)).await
}

async fn list_filtered(
    state: AppState,
    headers: HeaderMap,
    filter: SubmissionFilter,
) -> Result<Json<Vec<SubmissionDetails>>, ApiError> {
    authorize(&state, &headers, &[Capability::Reader]).await?;
    Ok(Json(state.lifecycle.list_submission_details(filter).await?))
}

/// Accept a submission and enqueue its first evaluation job.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SubmissionForm>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    authorize(&state, &headers, &[Capability::Reader]).await?;

    let new = NewSubmission {
        uid: optional_i64(&form.uid, "uid")?,
        gid: optional_i64(&form.gid, "gid")?,
        problem_id: crate::types::require_i64(&form.problem_id, "problem_id")?,
        code: require(&form.code, "code")?.to_string(),
        language: parse_language(require(&form.language, "language")?)?,
    };

    let (submission, job) = state
        .lifecycle
        .create_submission(new, form.callback_url.clone())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": submission.id, "job_id": job.id })),
    ))
}

pub async fn details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SubmissionDetails>, ApiError> {
    authorize(&state, &headers, &[Capability::Reader]).await?;
    Ok(Json(state.lifecycle.get_submission_details(id).await?))
}

/// Enqueue a rerun of an existing submission.
pub async fn create_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<CreateJobForm>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    authorize(&state, &headers, &[Capability::Reader]).await?;

    let job = state
        .lifecycle
        .create_job(id, form.callback_url.clone())
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "job_id": job.id }))))
}
