// Job endpoints: reader views plus the jury-facing claim/release/submit.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};

use judge_core::domain::{Capability, Job, JobDetails, JobProgress};
use judge_core::port::JobFilter;

use crate::auth::authorize;
use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{optional_verdict, require_f64, require_i64, ReleaseForm, SubmitForm};

pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<JobDetails>>, ApiError> {
    list_filtered(state, headers, JobFilter::All).await
}

pub async fn list_by_uid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(uid): Path<i64>,
) -> Result<Json<Vec<JobDetails>>, ApiError> {
    list_filtered(state, headers, JobFilter::Uid(uid)).await
}

pub async fn list_by_gid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(gid): Path<i64>,
) -> Result<Json<Vec<JobDetails>>, ApiError> {
    list_filtered(state, headers, JobFilter::Gid(gid)).await
}

pub async fn list_by_problem(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(problem_id): Path<i64>,
) -> Result<Json<Vec<JobDetails>>, ApiError> {
    list_filtered(state, headers, JobFilter::Problem(problem_id)).await
}

async fn list_filtered(
    state: AppState,
    headers: HeaderMap,
    filter: JobFilter,
) -> Result<Json<Vec<JobDetails>>, ApiError> {
    authorize(&state, &headers, &[Capability::Reader]).await?;
    let jobs = state.lifecycle.list_jobs(filter).await?;
    Ok(Json(jobs.iter().map(Job::details).collect()))
}

/// Pull the next runnable job: 200 with the claim payload, or 204 when
/// the queue has nothing to give.
pub async fn claim(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &[Capability::Jury]).await?;

    match state.dispatcher.claim().await? {
        Some(details) => Ok(Json(details).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<JobDetails>, ApiError> {
    authorize(&state, &headers, &[Capability::Reader]).await?;
    let job = state.lifecycle.get_job(id).await?;
    Ok(Json(job.details()))
}

/// Hand a held job back to the queue.
pub async fn release(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<ReleaseForm>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers, &[Capability::Jury]).await?;

    // State conflicts outrank a malformed or wrong code.
    let job = state.lifecycle.get_job(id).await?;
    if job.status != judge_core::domain::JobStatus::Started {
        return Err(ApiError::bare(StatusCode::CONFLICT));
    }

    let code = require_i64(&form.verification_code, "verification_code")?;
    state.lifecycle.release(id, code).await?;
    Ok(StatusCode::OK)
}

/// Per-testcase progress and, eventually, the final verdict.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<SubmitForm>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers, &[Capability::Jury]).await?;

    let code = require_i64(&form.verification_code, "verification_code")?;
    let progress = JobProgress {
        execution_time: require_f64(&form.execution_time, "execution_time")?,
        execution_memory: require_i64(&form.execution_memory, "execution_memory")?,
        last_ran_case: require_i64(&form.last_ran_case, "last_ran_case")?,
    };
    let verdict = optional_verdict(&form.verdict)?;

    state.lifecycle.submit(id, code, progress, verdict).await?;
    Ok(StatusCode::OK)
}

/// DELETE /jobs/{id}: cancel a pending or running evaluation.
pub async fn cancel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    authorize(&state, &headers, &[Capability::Reader]).await?;
    state.lifecycle.cancel(id).await?;
    Ok(StatusCode::OK)
}
