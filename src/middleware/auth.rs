// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token extraction and the `/api` authentication layer.

use crate::config::Config;
use crate::models::SessionToken;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie names used for sessions.
pub mod cookies {
    /// Access token set by the callback handler
    pub const ACCESS_TOKEN: &str = "sb-access-token";
    /// Refresh token set by the callback handler
    pub const REFRESH_TOKEN: &str = "sb-refresh-token";
    /// Combined token cookie written by older SDK versions
    pub const AUTH_TOKEN: &str = "sb-auth-token";
    /// PKCE verifier kept by the browser between login and callback
    pub const CODE_VERIFIER: &str = "sb-code-verifier";
}

/// Every distinct non-empty session token in a request's cookies, in probe order:
/// 1. `sb-access-token`
/// 2. `sb-auth-token`
/// 3. `sb-<identity host>` (see [`Config::provider_cookie_name`])
pub fn session_tokens_from_cookies(jar: &CookieJar, config: &Config) -> Vec<SessionToken> {
    let provider_cookie = config.provider_cookie_name();

    let mut tokens: Vec<SessionToken> = Vec::new();
    for name in [
        cookies::ACCESS_TOKEN,
        cookies::AUTH_TOKEN,
        provider_cookie.as_str(),
    ] {
        let Some(cookie) = jar.get(name) else {
            continue;
        };
        let token = SessionToken::new(cookie.value().trim());
        if !token.as_str().is_empty() && !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

/// Find the session token in a request's cookies.
///
/// The first value found by [`session_tokens_from_cookies`] wins.
pub fn session_token_from_cookies(jar: &CookieJar, config: &Config) -> Option<SessionToken> {
    session_tokens_from_cookies(jar, config).into_iter().next()
}

/// Middleware that requires a session token on `/api` routes.
///
/// The token is handed to handlers as a [`SessionToken`] extension; the
/// accessor validates it against the identity service on every call.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Try header first, then cookies
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(SessionToken::new);

    let token = bearer
        .or_else(|| session_token_from_cookies(&jar, &state.config))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(token);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Cookie;

    #[test]
    fn test_cookie_probe_order() {
        let config = Config::test_default();
        let provider = config.provider_cookie_name();

        let jar = CookieJar::new()
            .add(Cookie::new(provider.clone(), "provider"))
            .add(Cookie::new(cookies::AUTH_TOKEN, "auth"));
        assert_eq!(
            session_token_from_cookies(&jar, &config),
            Some(SessionToken::new("auth"))
        );

        let jar = jar.add(Cookie::new(cookies::ACCESS_TOKEN, "access"));
        assert_eq!(
            session_token_from_cookies(&jar, &config),
            Some(SessionToken::new("access"))
        );

        let jar = CookieJar::new().add(Cookie::new(provider, "provider"));
        assert_eq!(
            session_token_from_cookies(&jar, &config),
            Some(SessionToken::new("provider"))
        );
    }

    #[test]
    fn test_empty_cookie_is_skipped() {
        let config = Config::test_default();
        let jar = CookieJar::new()
            .add(Cookie::new(cookies::ACCESS_TOKEN, ""))
            .add(Cookie::new(cookies::AUTH_TOKEN, "auth"));
        assert_eq!(
            session_token_from_cookies(&jar, &config),
            Some(SessionToken::new("auth"))
        );

        assert_eq!(session_token_from_cookies(&CookieJar::new(), &config), None);
    }

    #[test]
    fn test_all_tokens_are_collected_once() {
        let config = Config::test_default();
        let jar = CookieJar::new()
            .add(Cookie::new(cookies::ACCESS_TOKEN, "a"))
            .add(Cookie::new(cookies::AUTH_TOKEN, "b"))
            .add(Cookie::new(config.provider_cookie_name(), "a"));

        assert_eq!(
            session_tokens_from_cookies(&jar, &config),
            vec![SessionToken::new("a"), SessionToken::new("b")]
        );
    }
}
