//! Request-level failures and their HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::profile::ProfileError;

/// Every variant short-circuits the request before any completion task is
/// spawned.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),
    #[error("profile lookup failed: {0}")]
    ProfileLookup(#[from] ProfileError),
    #[error("profile update failed: {0}")]
    ProfileUpdate(ProfileError),
    #[error("malformed request body: {0}")]
    MalformedRequest(String),
    #[error("no questions found in the submitted markup")]
    NoQuestionsFound,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::ProfileLookup(_) | ApiError::ProfileUpdate(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::MalformedRequest(_) | ApiError::NoQuestionsFound => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable code for the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::ProfileLookup(_) => "profile_lookup_failed",
            ApiError::ProfileUpdate(_) => "profile_update_failed",
            ApiError::MalformedRequest(_) => "malformed_request",
            ApiError::NoQuestionsFound => "no_questions_found",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Profile backend details stay in the logs.
        let message = match &self {
            ApiError::ProfileLookup(_) => "could not load the user profile".to_string(),
            ApiError::ProfileUpdate(_) => "could not store the user profile".to_string(),
            other => other.to_string(),
        };
        (self.status(), Json(json!({ "error": self.code(), "message": message }))).into_response()
    }
}
