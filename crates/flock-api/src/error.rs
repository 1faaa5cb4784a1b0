use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use flock_db::StoreError;

/// One failed declarative field check, as surfaced in a 400 body.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    pub message: &'static str,
}

impl FieldError {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self {
            field: Some(field),
            message,
        }
    }
}

/// Request-level error taxonomy. Every failure is terminal for the request;
/// there are no retries.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing credential")]
    MissingCredential,

    #[error("invalid token")]
    InvalidToken,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "errors": errors })),
            )
                .into_response(),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "message": message })),
            )
                .into_response(),
            ApiError::Conflict(message) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "message": message })),
            )
                .into_response(),
            ApiError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "message": "Invalid credentials" })),
            )
                .into_response(),
            ApiError::MissingCredential => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "message": "Please provide a valid token" })),
            )
                .into_response(),
            ApiError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "message": "Invalid token" })),
            )
                .into_response(),
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UserNotFound => ApiError::NotFound("User with given id not found"),
            StoreError::DuplicateUser => ApiError::Conflict("User already exists"),
            StoreError::AlreadyFollowing => ApiError::Conflict("You already follow this user"),
            StoreError::NotFollowing => ApiError::Conflict("You don't follow this user"),
            StoreError::AlreadyRequested => {
                ApiError::Conflict("You already sent a friend request to this user")
            }
            StoreError::NoSuchRequest => {
                ApiError::Conflict("You don't have a friend request from this user")
            }
            StoreError::Lock | StoreError::Sql(_) => ApiError::Internal(err.into()),
        }
    }
}
