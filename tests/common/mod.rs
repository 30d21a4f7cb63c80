// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{body::Body, http::Request, response::Response};
use examhub::config::Config;
use examhub::db::ProfileStore;
use examhub::models::{AuthUser, Session};
use examhub::routes::create_router;
use examhub::services::{IdentityClient, ProfileService, StaticIdentity};
use examhub::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Offline app: static identity service and in-memory datastore.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub identity: Arc<StaticIdentity>,
}

#[allow(dead_code)]
impl TestApp {
    /// Send one request through a fresh clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Register a valid session for `user_id` and return it.
    pub fn login(&self, access_token: &str, user_id: &str) -> Session {
        let session = test_session(access_token, user_id);
        self.identity.register_session(&session);
        session
    }
}

/// Create a test app with offline dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let identity = Arc::new(StaticIdentity::default());
    let client = IdentityClient::new_static(identity.clone());
    let profiles = ProfileService::new(client.clone(), ProfileStore::new_in_memory());

    let state = Arc::new(AppState {
        config,
        identity: client,
        profiles,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        identity,
    }
}

#[allow(dead_code)]
pub fn test_session(access_token: &str, user_id: &str) -> Session {
    Session {
        access_token: access_token.to_string(),
        refresh_token: format!("{access_token}-refresh"),
        expires_in: Some(3600),
        user: AuthUser {
            id: user_id.to_string(),
            email: Some(format!("{user_id}@example.edu")),
        },
    }
}

#[allow(dead_code)]
pub async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
}
