// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity-provider callback and logout routes.
//!
//! `GET /auth/callback` handles the query-code redirect directly. Token pairs
//! arrive in the URL fragment, which browsers never send, so the callback page
//! forwards its full URL to `POST /auth/callback` instead.

use axum::{
    extract::{OriginalUri, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::config::Config;
use crate::error::AppError;
use crate::middleware::auth::{cookies, session_tokens_from_cookies};
use crate::middleware::guard::{LANDING_PATH, LOGIN_PATH};
use crate::models::{Session, SessionToken};
use crate::services::{CallbackCredentials, ReadinessPolicy, SessionResolver};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/callback", get(callback_redirect).post(callback_forwarded))
        .route("/auth/logout", post(logout))
}

/// Body posted by the callback page.
#[derive(Deserialize)]
pub struct ForwardedCallback {
    /// Full redirect URL as the browser saw it, fragment included.
    url: String,
}

#[derive(Serialize)]
pub struct CallbackSuccess {
    pub redirect_to: String,
}

/// Error state shown on the callback page, with a way back to login.
#[derive(Debug, Serialize)]
pub struct CallbackFailure {
    pub error: String,
    pub message: String,
    pub retry_url: String,
}

impl CallbackFailure {
    fn from_error(err: &AppError) -> Self {
        let message = match err {
            AppError::NoCredentialsFound => "No valid authentication data found",
            AppError::ValidationFailed | AppError::Unauthenticated => {
                "Failed to establish session"
            }
            AppError::Service(_) => "The sign-in service is unavailable, please try again",
            _ => "An unexpected error occurred",
        };

        Self {
            error: err.code().to_string(),
            message: message.to_string(),
            retry_url: LOGIN_PATH.to_string(),
        }
    }
}

fn failure_response(err: AppError) -> Response {
    tracing::warn!(error = %err, "Auth callback failed");
    (err.status(), Json(CallbackFailure::from_error(&err))).into_response()
}

/// Provider redirected here with `?code=`.
async fn callback_redirect(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let url = match Url::parse(&format!("{}{}", state.config.site_url, uri)) {
        Ok(url) => url,
        Err(e) => return failure_response(AppError::BadRequest(e.to_string())),
    };

    match establish_session(&state, &jar, &url).await {
        Ok(session) => (
            with_session_cookies(jar, &session, &state.config),
            Redirect::to(LANDING_PATH),
        )
            .into_response(),
        Err(err) => failure_response(err),
    }
}

/// Callback page forwarded the redirect URL (needed for fragment tokens).
async fn callback_forwarded(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<ForwardedCallback>,
) -> Response {
    let url = match Url::parse(&body.url) {
        Ok(url) => url,
        Err(e) => return failure_response(AppError::BadRequest(e.to_string())),
    };

    match establish_session(&state, &jar, &url).await {
        Ok(session) => (
            with_session_cookies(jar, &session, &state.config),
            Json(CallbackSuccess {
                redirect_to: LANDING_PATH.to_string(),
            }),
        )
            .into_response(),
        Err(err) => failure_response(err),
    }
}

async fn establish_session(
    state: &AppState,
    jar: &CookieJar,
    url: &Url,
) -> Result<Session, AppError> {
    let credentials = CallbackCredentials::from_url(url)?;
    let code_verifier = jar
        .get(cookies::CODE_VERIFIER)
        .map(|c| c.value().to_string());

    let resolver = SessionResolver::new(
        &state.identity,
        ReadinessPolicy {
            attempts: state.config.session_ready_attempts,
            interval: state.config.session_ready_interval,
        },
    );
    let session = resolver
        .resolve(&credentials, code_verifier.as_deref())
        .await?;

    // First authenticated interaction creates the profile row.
    let token = SessionToken::new(session.access_token.clone());
    if let Err(e) = state.profiles.ensure_profile(&token).await {
        tracing::warn!(user_id = %session.user.id, error = %e, "Could not ensure profile row");
    }

    Ok(session)
}

fn session_cookie(name: &'static str, value: String, config: &Config) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies())
        .build()
}

fn with_session_cookies(jar: CookieJar, session: &Session, config: &Config) -> CookieJar {
    let mut access = session_cookie(cookies::ACCESS_TOKEN, session.access_token.clone(), config);
    if let Some(secs) = session.expires_in {
        access.set_max_age(time::Duration::seconds(secs as i64));
    }

    jar.add(access)
        .add(session_cookie(
            cookies::REFRESH_TOKEN,
            session.refresh_token.clone(),
            config,
        ))
        .remove(Cookie::build(cookies::CODE_VERIFIER).path("/"))
}

/// Expire every cookie a session can be read from.
fn without_session_cookies(jar: CookieJar, config: &Config) -> CookieJar {
    [
        cookies::ACCESS_TOKEN.to_string(),
        cookies::REFRESH_TOKEN.to_string(),
        cookies::AUTH_TOKEN.to_string(),
        config.provider_cookie_name(),
    ]
    .into_iter()
    .fold(jar, |jar, name| {
        jar.remove(Cookie::build(name).path("/"))
    })
}

/// Sign out at the identity service and drop the session cookies.
///
/// Every token the route guard could accept is revoked, not just the first.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Redirect) {
    for token in session_tokens_from_cookies(&jar, &state.config) {
        if let Err(e) = state.identity.sign_out(token.as_str()).await {
            tracing::warn!(error = %e, "Identity sign-out failed, clearing cookies anyway");
        }
    }

    (
        without_session_cookies(jar, &state.config),
        Redirect::to(LOGIN_PATH),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages() {
        let failure = CallbackFailure::from_error(&AppError::NoCredentialsFound);
        assert_eq!(failure.error, "no_credentials_found");
        assert_eq!(failure.retry_url, "/login");

        let failure = CallbackFailure::from_error(&AppError::ValidationFailed);
        assert_eq!(failure.message, "Failed to establish session");
    }

    #[test]
    fn test_session_cookie_attributes() {
        let mut config = Config::test_default();
        let cookie = session_cookie(cookies::ACCESS_TOKEN, "at".to_string(), &config);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.path(), Some("/"));

        config.site_url = "https://papers.example.edu".to_string();
        let cookie = session_cookie(cookies::ACCESS_TOKEN, "at".to_string(), &config);
        assert_eq!(cookie.secure(), Some(true));
    }
}
