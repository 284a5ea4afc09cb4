// HTTP error mapping
//
// Every application error lands on one of the boundary status codes:
// 400 malformed, 403 not authorized, 404 missing, 409 state conflict,
// 500 everything else.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use judge_core::domain::DomainError;
use judge_core::error::AppError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
        }
    }

    pub fn bare(status: StatusCode) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden() -> Self {
        Self::bare(StatusCode::FORBIDDEN)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.message {
            Some(message) => (self.status, Json(message)).into_response(),
            None => self.status.into_response(),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Domain(domain) => domain_error(domain),
            AppError::Validation(msg) => ApiError::new(StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(_) => ApiError::forbidden(),
            AppError::NotFound(_) => ApiError::bare(StatusCode::NOT_FOUND),
            AppError::Conflict(_) => ApiError::bare(StatusCode::CONFLICT),
            other => {
                tracing::error!(error = %other, "Unhandled application error");
                ApiError::bare(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

fn domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::InvalidStateTransition { .. } | DomainError::NotClaimable => {
            ApiError::bare(StatusCode::CONFLICT)
        }
        DomainError::CodeMismatch => ApiError::forbidden(),
        DomainError::CaseOutOfRange { .. }
        | DomainError::UnsupportedLanguage(_)
        | DomainError::UnknownVerdict(_)
        | DomainError::ValidationError(_) => ApiError::new(StatusCode::BAD_REQUEST, err.to_string()),
    }
}
