// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Page data for the view layer.
//!
//! Access to these routes is decided by the route guard before they run.

use crate::error::{AppError, Result};
use crate::middleware::auth::session_token_from_cookies;
use crate::models::{UserProfile, UserStats};
use crate::services::identity::authorize_url;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub const STATUS_FREE: &str = "Free";
pub const STATUS_LIMIT_REACHED: &str = "Limit Reached";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login_page))
        .route("/signup", get(signup_page))
        .route("/dashboard", get(dashboard_page))
        .route("/profile", get(profile_page))
}

// ─── Login / Signup ──────────────────────────────────────────

#[derive(Deserialize)]
struct AuthPageParams {
    /// Override the configured OAuth provider
    provider: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthPageView {
    pub page: String,
    pub authorize_url: String,
}

async fn login_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthPageParams>,
) -> Json<AuthPageView> {
    Json(auth_page(&state, "login", params))
}

async fn signup_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuthPageParams>,
) -> Json<AuthPageView> {
    Json(auth_page(&state, "signup", params))
}

fn auth_page(state: &AppState, page: &str, params: AuthPageParams) -> AuthPageView {
    let provider = params
        .provider
        .unwrap_or_else(|| state.config.oauth_provider.clone());

    AuthPageView {
        page: page.to_string(),
        authorize_url: authorize_url(
            &state.config.identity_url,
            &provider,
            &state.config.callback_url(),
        ),
    }
}

// ─── Dashboard ───────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardView {
    pub profile: Option<UserProfile>,
    pub stats: Option<UserStats>,
    /// "Free" or "Limit Reached"
    pub account_status: String,
    pub limit_reached: bool,
}

/// Dashboard summary. Usage that cannot be read counts as over the limit.
async fn dashboard_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<DashboardView>> {
    let token =
        session_token_from_cookies(&jar, &state.config).ok_or(AppError::Unauthenticated)?;

    let profile = match state.profiles.fetch_profile(&token).await {
        Ok(profile) => Some(profile),
        Err(AppError::Unauthenticated) => return Err(AppError::Unauthenticated),
        Err(e) => {
            tracing::warn!(error = %e, "Dashboard could not load profile");
            None
        }
    };

    let stats = profile.as_ref().map(UserStats::from_profile);
    let limit_reached = stats.map_or(true, |s| s.limit_reached());

    Ok(Json(DashboardView {
        profile,
        stats,
        account_status: if limit_reached {
            STATUS_LIMIT_REACHED
        } else {
            STATUS_FREE
        }
        .to_string(),
        limit_reached,
    }))
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileView {
    pub profile: UserProfile,
    /// "Premium" or "Free"
    pub plan: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub remaining_free_views: u64,
    pub limit_reached: bool,
}

async fn profile_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<ProfileView>> {
    let token =
        session_token_from_cookies(&jar, &state.config).ok_or(AppError::Unauthenticated)?;
    let profile = state.profiles.fetch_profile(&token).await?;
    let stats = UserStats::from_profile(&profile);

    Ok(Json(ProfileView {
        plan: if profile.is_premium { "Premium" } else { "Free" }.to_string(),
        remaining_free_views: stats.remaining_free_views,
        limit_reached: stats.limit_reached(),
        profile,
    }))
}
