// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{http::StatusCode, response::IntoResponse};
use examhub::error::AppError;

#[test]
fn test_status_mapping() {
    assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::ValidationFailed.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        AppError::NotFound("profile".to_string()).status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(AppError::NoCredentialsFound.status(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::FreeLimitReached.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        AppError::Service("timeout".to_string()).status(),
        StatusCode::BAD_GATEWAY
    );
}

#[tokio::test]
async fn test_error_body_hides_upstream_details() {
    let response = AppError::Service("connection refused to 10.0.0.3".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, serde_json::json!({ "error": "service_error" }));
}

#[tokio::test]
async fn test_not_found_includes_details() {
    let response = AppError::NotFound("profile u1".to_string()).into_response();

    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["details"], "profile u1");
}
