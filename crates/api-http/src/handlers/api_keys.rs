// POST /api_key - operator-facing key issuance.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::{Form, Json};

use judge_core::domain::{Capability, NewApiKey, MAX_KEY_NAME_LEN};

use crate::auth::authorize;
use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{form_bool, ApiKeyForm};

/// Issue a jury and/or reader key. Master keys are never issued through
/// the web surface; that path exists only in the operator CLI.
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ApiKeyForm>,
) -> Result<Json<String>, ApiError> {
    authorize(&state, &headers, &[Capability::Master]).await?;

    if let Some(name) = &form.name {
        if name.len() > MAX_KEY_NAME_LEN {
            return Err(ApiError::bad_request("Name must be 16 characters or less"));
        }
    }

    let key = state
        .api_keys
        .insert(NewApiKey {
            name: form.name.clone(),
            key: state.tokens.api_key(),
            perm_jury: form_bool(&form.jury),
            perm_reader: form_bool(&form.reader),
            perm_master: false,
        })
        .await?;

    Ok(Json(key.key))
}
