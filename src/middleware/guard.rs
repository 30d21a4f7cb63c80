// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route guard: redirects page requests based on session state.
//!
//! | route class | authenticated | action                  |
//! |-------------|---------------|-------------------------|
//! | protected   | no            | redirect to `/login`    |
//! | auth-only   | yes           | redirect to `/dashboard`|
//! | otherwise   | either        | pass through            |
//!
//! The guard only reads; it never sets cookies or touches the datastore.

use crate::middleware::auth::session_token_from_cookies;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

pub const LOGIN_PATH: &str = "/login";
pub const LANDING_PATH: &str = "/dashboard";

/// Path prefixes (after the leading `/`) the guard never looks at.
const EXEMPT_PREFIXES: [&str; 6] = [
    "_next/static",
    "_next/image",
    "favicon.ico",
    "public",
    "api",
    "auth/callback",
];

const PROTECTED_PREFIXES: [&str; 2] = ["/dashboard", "/profile"];
const AUTH_ONLY_PREFIXES: [&str; 2] = ["/login", "/signup"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Not subject to the guard at all
    Exempt,
    /// Requires a session
    Protected,
    /// Only for visitors without a session
    AuthOnly,
    Public,
}

impl RouteClass {
    pub fn of(path: &str) -> Self {
        let relative = path.strip_prefix('/').unwrap_or(path);
        if EXEMPT_PREFIXES.iter().any(|p| relative.starts_with(p)) {
            RouteClass::Exempt
        } else if PROTECTED_PREFIXES.iter().any(|p| path.starts_with(p)) {
            RouteClass::Protected
        } else if AUTH_ONLY_PREFIXES.iter().any(|p| path.starts_with(p)) {
            RouteClass::AuthOnly
        } else {
            RouteClass::Public
        }
    }

    /// Whether the decision depends on session state.
    fn needs_session_check(self) -> bool {
        matches!(self, RouteClass::Protected | RouteClass::AuthOnly)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

pub fn decide(class: RouteClass, authenticated: bool) -> GuardDecision {
    match (class, authenticated) {
        (RouteClass::Protected, false) => GuardDecision::Redirect(LOGIN_PATH),
        (RouteClass::AuthOnly, true) => GuardDecision::Redirect(LANDING_PATH),
        _ => GuardDecision::Allow,
    }
}

/// Middleware applied to every route.
pub async fn route_guard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let class = RouteClass::of(&path);

    if !class.needs_session_check() {
        return next.run(request).await;
    }

    let token = session_token_from_cookies(&jar, &state.config);
    let has_token = token.is_some();

    let authenticated = match token {
        Some(token) => match state.identity.get_user(token.as_str()).await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(path = %path, error = %err, "Session token did not validate");
                false
            }
        },
        None => false,
    };

    let decision = decide(class, authenticated);
    tracing::debug!(
        path = %path,
        class = ?class,
        has_token,
        authenticated,
        decision = ?decision,
        "Route guard decision"
    );

    match decision {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::Redirect(target) => Redirect::temporary(target).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_paths() {
        assert_eq!(RouteClass::of("/dashboard"), RouteClass::Protected);
        assert_eq!(RouteClass::of("/profile/edit"), RouteClass::Protected);
        assert_eq!(RouteClass::of("/login"), RouteClass::AuthOnly);
        assert_eq!(RouteClass::of("/signup"), RouteClass::AuthOnly);
        assert_eq!(RouteClass::of("/"), RouteClass::Public);
        assert_eq!(RouteClass::of("/health"), RouteClass::Public);
    }

    #[test]
    fn test_exempt_prefixes() {
        for path in [
            "/auth/callback",
            "/auth/callback?code=x",
            "/api/profile",
            "/_next/static/chunk.js",
            "/_next/image",
            "/favicon.ico",
            "/public/logo.svg",
        ] {
            assert_eq!(RouteClass::of(path), RouteClass::Exempt, "{path}");
        }
        assert_eq!(RouteClass::of("/auth/logout"), RouteClass::Public);
    }

    #[test]
    fn test_decision_table() {
        use GuardDecision::*;
        use RouteClass::*;

        assert_eq!(decide(Protected, false), Redirect("/login"));
        assert_eq!(decide(Protected, true), Allow);
        assert_eq!(decide(AuthOnly, true), Redirect("/dashboard"));
        assert_eq!(decide(AuthOnly, false), Allow);
        assert_eq!(decide(Public, false), Allow);
        assert_eq!(decide(Public, true), Allow);
        assert_eq!(decide(Exempt, false), Allow);
    }
}
