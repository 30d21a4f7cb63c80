// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::config::FREE_VIEW_LIMIT;
use crate::error::{AppError, Result};
use crate::models::stats::remaining_free_views;
use crate::models::{NewProfile, ProfileUpdate, SessionToken, UserProfile, UserStats};
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require a session token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/profile",
            get(get_profile).put(upsert_profile).patch(update_profile),
        )
        .route("/api/stats", get(get_stats))
        .route("/api/quota", get(get_quota))
        .route("/api/documents/view", post(record_view))
        .route("/api/documents/download", post(record_download))
}

// ─── Profile ─────────────────────────────────────────────────

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<SessionToken>,
) -> Result<Json<UserProfile>> {
    Ok(Json(state.profiles.fetch_profile(&token).await?))
}

async fn upsert_profile(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<SessionToken>,
    Json(body): Json<NewProfile>,
) -> Result<Json<UserProfile>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Json(state.profiles.upsert_profile(&token, &body).await?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<SessionToken>,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Json(state.profiles.update_profile(&token, &body).await?))
}

// ─── Usage ───────────────────────────────────────────────────

async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<SessionToken>,
) -> Result<Json<UserStats>> {
    Ok(Json(state.profiles.fetch_stats(&token).await?))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct QuotaResponse {
    pub exceeded: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub free_view_limit: u64,
}

async fn get_quota(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<SessionToken>,
) -> Json<QuotaResponse> {
    Json(QuotaResponse {
        exceeded: state.profiles.has_exceeded_free_limit(&token).await,
        free_view_limit: FREE_VIEW_LIMIT,
    })
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ViewRecorded {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub documents_viewed: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub remaining_free_views: u64,
}

/// Count a document view, refusing once the free views are used up.
async fn record_view(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<SessionToken>,
) -> Result<Json<ViewRecorded>> {
    let documents_viewed = state.profiles.record_free_view(&token).await?;
    Ok(Json(ViewRecorded {
        documents_viewed,
        remaining_free_views: remaining_free_views(documents_viewed),
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DownloadRecorded {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub documents_downloaded: u64,
}

async fn record_download(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<SessionToken>,
) -> Result<Json<DownloadRecorded>> {
    let documents_downloaded = state.profiles.increment_download_count(&token).await?;
    Ok(Json(DownloadRecorded {
        documents_downloaded,
    }))
}
