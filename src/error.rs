// SPDX-License-Identifier: MIT
//! Request-level error taxonomy.
//!
//! Every failure a handler can produce maps to one HTTP status and an
//! `{"error": "..."}` body. Internal causes are logged, never surfaced.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No session cookie, or the session is expired/unknown.
    #[error("Unauthorized")]
    Unauthorized,
    /// Malformed input: empty name, non-positive hours, missing required field.
    #[error("{0}")]
    Validation(String),
    /// Covers both "does not exist" and "not owned by the caller" — merged so
    /// a response never reveals whether another user's resource exists.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Duplicate username at registration.
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            // Duplicate usernames surface as 400 — the client treats them as
            // a form validation failure, same as the original API.
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(e) => {
                tracing::error!(err = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        assert_eq!(ApiError::NotFound("Project").to_string(), "Project not found");
    }

    #[test]
    fn test_conflict_maps_to_bad_request() {
        let resp = ApiError::Conflict("Username is already taken".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_body_is_generic() {
        let resp = ApiError::Internal(anyhow::anyhow!("pool exhausted")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
