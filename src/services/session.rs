// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session establishment from identity-provider redirects.
//!
//! Providers redirect back in one of two shapes:
//! - implicit: `#access_token=..&refresh_token=..` in the fragment
//! - PKCE: `?code=..` in the query
//!
//! The fragment pair wins when both are present.

use crate::error::AppError;
use crate::models::Session;
use crate::services::identity::{IdentityClient, IdentityError};
use std::time::Duration;
use url::Url;

/// Credentials carried by a post-login redirect URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackCredentials {
    TokenPair {
        access_token: String,
        refresh_token: String,
    },
    AuthCode(String),
}

impl CallbackCredentials {
    /// Pick the redirect convention used in `url`.
    pub fn from_url(url: &Url) -> Result<Self, AppError> {
        if let Some(fragment) = url.fragment() {
            let mut access_token = None;
            let mut refresh_token = None;
            for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
                match &*key {
                    "access_token" if !value.is_empty() => access_token = Some(value.into_owned()),
                    "refresh_token" if !value.is_empty() => {
                        refresh_token = Some(value.into_owned())
                    }
                    _ => {}
                }
            }

            if let (Some(access_token), Some(refresh_token)) = (access_token, refresh_token) {
                return Ok(Self::TokenPair {
                    access_token,
                    refresh_token,
                });
            }
        }

        url.query_pairs()
            .find(|(key, value)| key == "code" && !value.is_empty())
            .map(|(_, code)| Self::AuthCode(code.into_owned()))
            .ok_or(AppError::NoCredentialsFound)
    }
}

/// Bounded wait for a new session to become resolvable.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

/// Turns callback credentials into a confirmed session.
pub struct SessionResolver<'a> {
    identity: &'a IdentityClient,
    readiness: ReadinessPolicy,
}

impl<'a> SessionResolver<'a> {
    pub fn new(identity: &'a IdentityClient, readiness: ReadinessPolicy) -> Self {
        Self {
            identity,
            readiness,
        }
    }

    /// Establish a session from `credentials` and wait until the identity
    /// service resolves its access token.
    pub async fn resolve(
        &self,
        credentials: &CallbackCredentials,
        code_verifier: Option<&str>,
    ) -> Result<Session, AppError> {
        let session = match credentials {
            CallbackCredentials::TokenPair {
                access_token,
                refresh_token,
            } => {
                tracing::debug!("Establishing session from token pair");
                self.identity
                    .set_session(access_token, refresh_token)
                    .await
            }
            CallbackCredentials::AuthCode(code) => {
                tracing::debug!("Exchanging authorization code for session");
                self.identity.exchange_code(code, code_verifier).await
            }
        }
        .map_err(|err| identity_failure(err, "Session establishment failed"))?;

        self.await_ready(&session).await?;

        tracing::info!(user_id = %session.user.id, "Session established");
        Ok(session)
    }

    /// Poll until the access token resolves to the same user.
    async fn await_ready(&self, session: &Session) -> Result<(), AppError> {
        let attempts = self.readiness.attempts.max(1);

        for attempt in 1..=attempts {
            match self.identity.get_user(&session.access_token).await {
                Ok(user) if user.id == session.user.id => return Ok(()),
                Ok(user) => {
                    tracing::warn!(
                        expected = %session.user.id,
                        actual = %user.id,
                        "Session resolved to a different user"
                    );
                    return Err(AppError::ValidationFailed);
                }
                Err(err) => {
                    tracing::debug!(attempt, error = %err, "Session not ready yet");
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.readiness.interval).await;
            }
        }

        tracing::warn!(attempts, "Session never became ready");
        Err(AppError::Service(
            "session was not confirmed by identity service".to_string(),
        ))
    }
}

/// Fold an identity error into the application error taxonomy.
pub fn identity_failure(err: IdentityError, context: &str) -> AppError {
    match err {
        IdentityError::Rejected(reason) => {
            tracing::warn!(reason = %reason, "{}", context);
            AppError::ValidationFailed
        }
        IdentityError::Transport(reason) => {
            tracing::error!(reason = %reason, "{}", context);
            AppError::Service(reason)
        }
    }
}
