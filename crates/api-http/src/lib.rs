//! HTTP API Layer
//!
//! The REST surface over the job lifecycle engine, claim dispatcher, and
//! the submission/problem stores. All responses are JSON (or empty bodies
//! for 204/304); authentication is an opaque token in the `api_key` header.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use server::{build_router, AppState};
