// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity service client.
//!
//! Relays tokens to the managed auth service and resolves users from them.
//! This service never mints or rotates tokens itself.

use crate::config::Config;
use crate::models::{AuthUser, Session};
use anyhow::Context;
use dashmap::DashMap;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;

/// Identity service failure categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    /// The service answered and refused the token or code.
    #[error("rejected by identity service: {0}")]
    Rejected(String),
    /// Network failure, timeout, or a server-side error.
    #[error("identity service unavailable: {0}")]
    Transport(String),
}

#[derive(Clone)]
enum IdentityMode {
    Remote {
        http: reqwest::Client,
        base_url: String,
        api_key: String,
    },
    Static(Arc<StaticIdentity>),
}

/// Client for the hosted identity service.
#[derive(Clone)]
pub struct IdentityClient {
    mode: IdentityMode,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "error_description", alias = "msg")]
    message: Option<String>,
}

impl IdentityClient {
    /// Create a client talking to the configured identity service.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed building identity HTTP client")?;

        tracing::info!(
            identity_url = %config.identity_url,
            timeout_secs = config.http_timeout.as_secs(),
            "Initialized identity service client"
        );

        Ok(Self {
            mode: IdentityMode::Remote {
                http,
                base_url: config.identity_url.clone(),
                api_key: config.identity_key.clone(),
            },
        })
    }

    /// Create a client backed by a fixed set of known tokens and codes.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_static(identity: Arc<StaticIdentity>) -> Self {
        Self {
            mode: IdentityMode::Static(identity),
        }
    }

    /// Establish a session from an access/refresh token pair.
    ///
    /// The access token is accepted if it resolves to a user. If the service
    /// rejects it (typically expired), the refresh token is exchanged instead.
    pub async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, IdentityError> {
        match self.get_user(access_token).await {
            Ok(user) => Ok(Session {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
                expires_in: None,
                user,
            }),
            Err(IdentityError::Rejected(reason)) => {
                tracing::debug!(reason = %reason, "Access token rejected, trying refresh token");
                self.refresh_session(refresh_token).await
            }
            Err(err) => Err(err),
        }
    }

    /// Exchange a refresh token for a new session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        match &self.mode {
            IdentityMode::Remote { .. } => {
                let body = serde_json::json!({ "refresh_token": refresh_token });
                self.post_token("refresh_token", &body).await
            }
            IdentityMode::Static(identity) => identity.refresh(refresh_token),
        }
    }

    /// Exchange a one-time authorization code for a session.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, IdentityError> {
        match &self.mode {
            IdentityMode::Remote { .. } => {
                let body = serde_json::json!({
                    "auth_code": code,
                    "code_verifier": code_verifier.unwrap_or_default(),
                });
                self.post_token("pkce", &body).await
            }
            IdentityMode::Static(identity) => identity.exchange(code),
        }
    }

    /// Resolve the user a bearer token represents.
    pub async fn get_user(&self, token: &str) -> Result<AuthUser, IdentityError> {
        match &self.mode {
            IdentityMode::Remote {
                http,
                base_url,
                api_key,
            } => {
                let response = http
                    .get(format!("{}/auth/v1/user", base_url))
                    .header("apikey", api_key)
                    .bearer_auth(token)
                    .send()
                    .await
                    .map_err(|e| IdentityError::Transport(e.to_string()))?;

                read_json(response).await
            }
            IdentityMode::Static(identity) => identity.user_for(token),
        }
    }

    /// Revoke the session behind `token`.
    pub async fn sign_out(&self, token: &str) -> Result<(), IdentityError> {
        match &self.mode {
            IdentityMode::Remote {
                http,
                base_url,
                api_key,
            } => {
                let response = http
                    .post(format!("{}/auth/v1/logout", base_url))
                    .header("apikey", api_key)
                    .bearer_auth(token)
                    .send()
                    .await
                    .map_err(|e| IdentityError::Transport(e.to_string()))?;

                check_status(response).await.map(|_| ())
            }
            IdentityMode::Static(identity) => {
                identity.revoke(token);
                Ok(())
            }
        }
    }

    async fn post_token(
        &self,
        grant_type: &str,
        body: &serde_json::Value,
    ) -> Result<Session, IdentityError> {
        let IdentityMode::Remote {
            http,
            base_url,
            api_key,
        } = &self.mode
        else {
            return Err(IdentityError::Transport(
                "token endpoint called in static mode".to_string(),
            ));
        };

        let response = http
            .post(format!("{}/auth/v1/token", base_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        read_json(response).await
    }
}

/// Provider login URL on the identity service at `identity_url` that
/// redirects back to `redirect_to` when done.
pub fn authorize_url(identity_url: &str, provider: &str, redirect_to: &str) -> String {
    format!(
        "{}/auth/v1/authorize?provider={}&redirect_to={}",
        identity_url,
        urlencoding::encode(provider),
        urlencoding::encode(redirect_to)
    )
}

/// Split non-success responses into rejections (4xx) and transport failures.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, IdentityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(text);

    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        Err(IdentityError::Rejected(format!("{}: {}", status, message)))
    } else {
        Err(IdentityError::Transport(format!("{}: {}", status, message)))
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, IdentityError> {
    check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| IdentityError::Transport(format!("malformed response: {}", e)))
}

// ─── Static Mode ──────────────────────────────────────────────

/// In-process stand-in for the identity service.
///
/// Codes are single-use: a successful exchange consumes the code.
#[derive(Default)]
pub struct StaticIdentity {
    access_tokens: DashMap<String, AuthUser>,
    refresh_tokens: DashMap<String, Session>,
    codes: DashMap<String, Session>,
}

impl StaticIdentity {
    /// Accept `session.access_token` from now on, and hand out `session`
    /// for `session.refresh_token`.
    pub fn register_session(&self, session: &Session) {
        self.access_tokens
            .insert(session.access_token.clone(), session.user.clone());
        self.refresh_tokens
            .insert(session.refresh_token.clone(), session.clone());
    }

    /// Allow only the refresh path for `session`: the access token stays unknown
    /// until the refresh token is redeemed.
    pub fn register_refresh_only(&self, refresh_token: &str, session: &Session) {
        self.refresh_tokens
            .insert(refresh_token.to_string(), session.clone());
    }

    /// Issue `session` for a single exchange of `code`.
    pub fn register_code(&self, code: &str, session: &Session) {
        self.codes.insert(code.to_string(), session.clone());
    }

    /// Forget an access token.
    pub fn revoke(&self, access_token: &str) {
        self.access_tokens.remove(access_token);
    }

    fn user_for(&self, token: &str) -> Result<AuthUser, IdentityError> {
        self.access_tokens
            .get(token)
            .map(|user| user.value().clone())
            .ok_or_else(|| IdentityError::Rejected("invalid JWT".to_string()))
    }

    fn refresh(&self, refresh_token: &str) -> Result<Session, IdentityError> {
        let session = self
            .refresh_tokens
            .get(refresh_token)
            .map(|s| s.value().clone())
            .ok_or_else(|| IdentityError::Rejected("invalid refresh token".to_string()))?;
        self.access_tokens
            .insert(session.access_token.clone(), session.user.clone());
        Ok(session)
    }

    fn exchange(&self, code: &str) -> Result<Session, IdentityError> {
        let (_, session) = self
            .codes
            .remove(code)
            .ok_or_else(|| IdentityError::Rejected("invalid or used auth code".to_string()))?;
        self.register_session(&session);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(access: &str, refresh: &str) -> Session {
        Session {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            expires_in: Some(3600),
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("student@example.edu".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_static_code_is_single_use() {
        let identity = Arc::new(StaticIdentity::default());
        identity.register_code("code-1", &session("at", "rt"));
        let client = IdentityClient::new_static(identity);

        let first = client.exchange_code("code-1", None).await.unwrap();
        assert_eq!(first.user.id, "user-1");
        assert!(client.get_user("at").await.is_ok());

        let replay = client.exchange_code("code-1", None).await;
        assert!(matches!(replay, Err(IdentityError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_set_session_falls_back_to_refresh() {
        let identity = Arc::new(StaticIdentity::default());
        identity.register_refresh_only("rt-old", &session("at-new", "rt-new"));
        let client = IdentityClient::new_static(identity);

        let session = client.set_session("at-expired", "rt-old").await.unwrap();
        assert_eq!(session.access_token, "at-new");
        assert!(client.get_user("at-new").await.is_ok());
    }

    #[tokio::test]
    async fn test_set_session_rejects_unknown_pair() {
        let client = IdentityClient::new_static(Arc::new(StaticIdentity::default()));
        let result = client.set_session("nope", "nope").await;
        assert!(matches!(result, Err(IdentityError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_access_token() {
        let identity = Arc::new(StaticIdentity::default());
        identity.register_session(&session("at", "rt"));
        let client = IdentityClient::new_static(identity);

        client.sign_out("at").await.unwrap();
        assert!(client.get_user("at").await.is_err());
    }

    #[test]
    fn test_authorize_url_encodes_redirect() {
        let url = authorize_url(
            "https://abc.identity.example",
            "google",
            "http://localhost:3000/auth/callback",
        );
        assert_eq!(
            url,
            "https://abc.identity.example/auth/v1/authorize?provider=google&redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"
        );
    }
}
