// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Session token rejected by identity service")]
    ValidationFailed,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("No credentials found in callback URL")]
    NoCredentialsFound,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Free document view limit reached")]
    FreeLimitReached,

    #[error("Upstream service error: {0}")]
    Service(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::ValidationFailed => "validation_failed",
            AppError::NotFound(_) => "not_found",
            AppError::NoCredentialsFound => "no_credentials_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::FreeLimitReached => "free_limit_reached",
            AppError::Service(_) => "service_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::ValidationFailed => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NoCredentialsFound | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::FreeLimitReached => StatusCode::FORBIDDEN,
            AppError::Service(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let details = match &self {
            AppError::NotFound(msg) | AppError::BadRequest(msg) => Some(msg.clone()),
            AppError::Service(msg) => {
                tracing::error!(error = %msg, "Upstream service error");
                None
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                None
            }
            _ => None,
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            details,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
