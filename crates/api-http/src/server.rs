// Application state and router.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use judge_core::application::{ClaimDispatcher, JobLifecycle};
use judge_core::port::{ApiKeyStore, ProblemStore, TimeProvider, TokenProvider};

use crate::handlers;

/// Shared application state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<JobLifecycle>,
    pub dispatcher: Arc<ClaimDispatcher>,
    pub problems: Arc<dyn ProblemStore>,
    pub api_keys: Arc<dyn ApiKeyStore>,
    pub tokens: Arc<dyn TokenProvider>,
    pub clock: Arc<dyn TimeProvider>,
}

/// Build the full HTTP surface.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/amisane", get(handlers::sanity_check))
        .route("/", get(handlers::monitor_page))
        .route("/api_key", post(handlers::api_keys::generate))
        .route(
            "/submissions",
            get(handlers::submissions::list).post(handlers::submissions::create),
        )
        .route(
            "/submissions/uid/{uid}",
            get(handlers::submissions::list_by_uid),
        )
        .route(
            "/submissions/gid/{gid}",
            get(handlers::submissions::list_by_gid),
        )
        .route(
            "/submissions/problem/{problem_id}",
            get(handlers::submissions::list_by_problem),
        )
        .route("/submissions/{id}", get(handlers::submissions::details))
        .route(
            "/submissions/{id}/create_job",
            post(handlers::submissions::create_job),
        )
        .route("/jobs", get(handlers::jobs::list))
        .route("/jobs/uid/{uid}", get(handlers::jobs::list_by_uid))
        .route("/jobs/gid/{gid}", get(handlers::jobs::list_by_gid))
        .route(
            "/jobs/problem/{problem_id}",
            get(handlers::jobs::list_by_problem),
        )
        .route("/jobs/claim", post(handlers::jobs::claim))
        .route(
            "/jobs/{id}",
            get(handlers::jobs::details).delete(handlers::jobs::cancel),
        )
        .route("/jobs/{id}/release", post(handlers::jobs::release))
        .route("/jobs/{id}/submit", post(handlers::jobs::submit))
        .route(
            "/problems",
            get(handlers::problems::list).post(handlers::problems::create),
        )
        .route(
            "/problems/{id}",
            get(handlers::problems::details).put(handlers::problems::update),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
