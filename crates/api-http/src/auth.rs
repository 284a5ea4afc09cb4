// Token & permission guard.

use axum::http::HeaderMap;

use judge_core::domain::{ApiKey, Capability};

use crate::error::ApiError;
use crate::server::AppState;

/// Header carrying the opaque token.
pub const API_KEY_HEADER: &str = "api_key";

/// The single guard every endpoint calls: resolve the `api_key` header to
/// an active key holding at least one of the listed capabilities. Missing,
/// unknown, inactive, and under-privileged keys are indistinguishable to
/// the caller.
pub async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    capabilities: &[Capability],
) -> Result<ApiKey, ApiError> {
    let token = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(ApiError::forbidden)?;

    let key = state
        .api_keys
        .find_by_key(token)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(ApiError::forbidden)?;

    if !key.allows_any(capabilities) {
        return Err(ApiError::forbidden());
    }
    Ok(key)
}
