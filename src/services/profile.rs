// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile and usage accessor.
//!
//! Every operation is scoped to the identity behind the session token it is
//! given. The identity is resolved afresh on each call; nothing is cached.

use crate::config::FREE_VIEW_LIMIT;
use crate::db::{Counter, Increment, ProfileStore};
use crate::error::AppError;
use crate::models::{AuthUser, NewProfile, ProfileUpdate, SessionToken, UserProfile, UserStats};
use crate::services::identity::{IdentityClient, IdentityError};

/// Data-access facade over the profile table.
#[derive(Clone)]
pub struct ProfileService {
    identity: IdentityClient,
    store: ProfileStore,
}

impl ProfileService {
    pub fn new(identity: IdentityClient, store: ProfileStore) -> Self {
        Self { identity, store }
    }

    /// The caller's profile.
    pub async fn fetch_profile(&self, session: &SessionToken) -> Result<UserProfile, AppError> {
        let user = self.current_user(session).await?;
        self.store
            .get_profile(session, &user.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile {}", user.id)))
    }

    /// Create the caller's profile, or overwrite the provided fields.
    pub async fn upsert_profile(
        &self,
        session: &SessionToken,
        profile: &NewProfile,
    ) -> Result<UserProfile, AppError> {
        let user = self.current_user(session).await?;
        let email = profile
            .email
            .as_deref()
            .or(user.email.as_deref())
            .ok_or_else(|| AppError::BadRequest("email is required".to_string()))?;

        let saved = self
            .store
            .upsert_profile(session, &user.id, email, &profile.fields)
            .await?;

        tracing::info!(user_id = %user.id, "Profile upserted");
        Ok(saved)
    }

    /// Create the caller's profile if it does not exist yet.
    pub async fn ensure_profile(&self, session: &SessionToken) -> Result<UserProfile, AppError> {
        match self.fetch_profile(session).await {
            Err(AppError::NotFound(_)) => {
                self.upsert_profile(session, &NewProfile::default()).await
            }
            other => other,
        }
    }

    /// Change only the provided fields of the caller's existing profile.
    pub async fn update_profile(
        &self,
        session: &SessionToken,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, AppError> {
        if update.is_empty() {
            return Err(AppError::BadRequest("no fields to update".to_string()));
        }

        let user = self.current_user(session).await?;
        let updated = self
            .store
            .update_profile(session, &user.id, update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile {}", user.id)))?;

        tracing::info!(user_id = %user.id, "Profile updated");
        Ok(updated)
    }

    /// Add one document view. Returns the new total.
    pub async fn increment_view_count(&self, session: &SessionToken) -> Result<u64, AppError> {
        self.increment(session, Counter::DocumentsViewed, None)
            .await
            .map(Increment::value)
    }

    /// Add one document view only while free views remain.
    ///
    /// The limit check and the increment are a single datastore operation, so
    /// concurrent views never push the counter past the limit. A missing
    /// profile counts as no free views left.
    pub async fn record_free_view(&self, session: &SessionToken) -> Result<u64, AppError> {
        match self
            .increment(session, Counter::DocumentsViewed, Some(FREE_VIEW_LIMIT))
            .await
        {
            Ok(Increment::Applied(value)) => Ok(value),
            Ok(Increment::AtLimit(_)) | Err(AppError::NotFound(_)) => {
                Err(AppError::FreeLimitReached)
            }
            Err(e) => Err(e),
        }
    }

    /// Add one document download. Returns the new total.
    pub async fn increment_download_count(
        &self,
        session: &SessionToken,
    ) -> Result<u64, AppError> {
        self.increment(session, Counter::DocumentsDownloaded, None)
            .await
            .map(Increment::value)
    }

    /// Counters plus remaining free views.
    pub async fn fetch_stats(&self, session: &SessionToken) -> Result<UserStats, AppError> {
        let profile = self.fetch_profile(session).await?;
        Ok(UserStats::from_profile(&profile))
    }

    /// Whether the caller has used up the free views.
    ///
    /// Any failure counts as exceeded.
    pub async fn has_exceeded_free_limit(&self, session: &SessionToken) -> bool {
        match self.fetch_stats(session).await {
            Ok(stats) => stats.limit_reached(),
            Err(err) => {
                tracing::warn!(error = %err, "Could not read usage stats, treating limit as reached");
                true
            }
        }
    }

    async fn increment(
        &self,
        session: &SessionToken,
        counter: Counter,
        limit: Option<u64>,
    ) -> Result<Increment, AppError> {
        let user = self.current_user(session).await?;
        let outcome = self
            .store
            .increment_counter(session, &user.id, counter, limit)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile {}", user.id)))?;

        tracing::debug!(
            user_id = %user.id,
            counter = counter.column(),
            outcome = ?outcome,
            "Counter incremented"
        );
        Ok(outcome)
    }

    async fn current_user(&self, session: &SessionToken) -> Result<AuthUser, AppError> {
        self.identity
            .get_user(session.as_str())
            .await
            .map_err(|err| match err {
                IdentityError::Rejected(_) => AppError::Unauthenticated,
                IdentityError::Transport(reason) => AppError::Service(reason),
            })
    }
}
