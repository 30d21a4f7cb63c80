// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile table client with typed operations.
//!
//! Every request carries the caller's access token so the datastore's
//! row-level policies apply. Counters are only ever changed through the
//! datastore's atomic increment function.

use crate::config::Config;
use crate::db::tables;
use crate::error::AppError;
use crate::models::{ProfileUpdate, SessionToken, UserProfile};
use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use dashmap::DashMap;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize};
use std::sync::Arc;

/// Usage counter columns on a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    DocumentsViewed,
    DocumentsDownloaded,
}

impl Counter {
    pub fn column(&self) -> &'static str {
        match self {
            Counter::DocumentsViewed => "documents_viewed",
            Counter::DocumentsDownloaded => "documents_downloaded",
        }
    }
}

/// Outcome of a counter increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    /// The counter now holds this value.
    Applied(u64),
    /// The counter already sat at the limit and was left unchanged.
    AtLimit(u64),
}

impl Increment {
    pub fn value(self) -> u64 {
        match self {
            Increment::Applied(value) | Increment::AtLimit(value) => value,
        }
    }
}

/// Row returned by the increment function.
#[derive(Deserialize)]
struct IncrementRow {
    new_value: u64,
    incremented: bool,
}

#[derive(Clone)]
enum Backend {
    Rest {
        http: reqwest::Client,
        base_url: String,
        api_key: String,
    },
    Memory(Arc<DashMap<String, UserProfile>>),
}

/// Profile datastore client.
#[derive(Clone)]
pub struct ProfileStore {
    backend: Backend,
}

impl ProfileStore {
    /// Create a client for the configured REST datastore.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed building datastore HTTP client")?;

        tracing::info!(datastore_url = %config.datastore_url, "Initialized datastore client");

        Ok(Self {
            backend: Backend::Rest {
                http,
                base_url: format!("{}/rest/v1", config.datastore_url),
                api_key: config.identity_key.clone(),
            },
        })
    }

    /// Create an in-process store for offline tests.
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(DashMap::new())),
        }
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// Get a profile by identity id.
    pub async fn get_profile(
        &self,
        token: &SessionToken,
        id: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        match &self.backend {
            Backend::Rest {
                http,
                base_url,
                api_key,
            } => {
                let response = http
                    .get(format!("{}/{}", base_url, tables::USER_PROFILES))
                    .query(&[("id", format!("eq.{}", id)), ("select", "*".to_string())])
                    .header("apikey", api_key)
                    .bearer_auth(token.as_str())
                    .send()
                    .await
                    .map_err(|e| AppError::Service(format!("datastore request failed: {}", e)))?;

                let rows: Vec<UserProfile> = read_json(response).await?;
                Ok(rows.into_iter().next())
            }
            Backend::Memory(rows) => Ok(rows.get(id).map(|p| p.value().clone())),
        }
    }

    // ─── Writes ──────────────────────────────────────────────────

    /// Create the profile if absent, otherwise overwrite `email` and the
    /// fields present in `fields`. Counters are never written here.
    pub async fn upsert_profile(
        &self,
        token: &SessionToken,
        id: &str,
        email: &str,
        fields: &ProfileUpdate,
    ) -> Result<UserProfile, AppError> {
        match &self.backend {
            Backend::Rest {
                http,
                base_url,
                api_key,
            } => {
                let mut row = serde_json::to_value(fields)
                    .context("failed to serialize profile fields")?;
                row["id"] = serde_json::Value::String(id.to_string());
                row["email"] = serde_json::Value::String(email.to_string());

                let response = http
                    .post(format!("{}/{}", base_url, tables::USER_PROFILES))
                    .query(&[("on_conflict", "id")])
                    .header("apikey", api_key)
                    .header("Prefer", "resolution=merge-duplicates,return=representation")
                    .bearer_auth(token.as_str())
                    .json(&row)
                    .send()
                    .await
                    .map_err(|e| AppError::Service(format!("datastore request failed: {}", e)))?;

                let rows: Vec<UserProfile> = read_json(response).await?;
                rows.into_iter()
                    .next()
                    .ok_or_else(|| AppError::Service("upsert returned no row".to_string()))
            }
            Backend::Memory(rows) => {
                let now = now_rfc3339();
                let profile = rows
                    .entry(id.to_string())
                    .and_modify(|p| {
                        p.email = email.to_string();
                        p.apply(fields);
                        p.updated_at = now.clone();
                    })
                    .or_insert_with(|| {
                        let mut p = UserProfile::new(id, email, &now);
                        p.apply(fields);
                        p
                    })
                    .value()
                    .clone();
                Ok(profile)
            }
        }
    }

    /// Change only the fields present in `update`.
    ///
    /// Returns `None` if no row exists for `id`.
    pub async fn update_profile(
        &self,
        token: &SessionToken,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserProfile>, AppError> {
        match &self.backend {
            Backend::Rest {
                http,
                base_url,
                api_key,
            } => {
                let response = http
                    .patch(format!("{}/{}", base_url, tables::USER_PROFILES))
                    .query(&[("id", format!("eq.{}", id))])
                    .header("apikey", api_key)
                    .header("Prefer", "return=representation")
                    .bearer_auth(token.as_str())
                    .json(update)
                    .send()
                    .await
                    .map_err(|e| AppError::Service(format!("datastore request failed: {}", e)))?;

                let rows: Vec<UserProfile> = read_json(response).await?;
                Ok(rows.into_iter().next())
            }
            Backend::Memory(rows) => Ok(rows.get_mut(id).map(|mut p| {
                p.apply(update);
                p.updated_at = now_rfc3339();
                p.value().clone()
            })),
        }
    }

    /// Atomically add one to `counter`.
    ///
    /// With a `limit`, the counter is only incremented while it is below the
    /// limit; the check and the write happen in one datastore operation.
    /// Returns `None` if no row exists for `id`.
    pub async fn increment_counter(
        &self,
        token: &SessionToken,
        id: &str,
        counter: Counter,
        limit: Option<u64>,
    ) -> Result<Option<Increment>, AppError> {
        match &self.backend {
            Backend::Rest {
                http,
                base_url,
                api_key,
            } => {
                let response = http
                    .post(format!("{}/rpc/{}", base_url, tables::INCREMENT_COUNTER_FN))
                    .header("apikey", api_key)
                    .bearer_auth(token.as_str())
                    .json(&serde_json::json!({
                        "row_id": id,
                        "column_name": counter.column(),
                        "max_value": limit,
                    }))
                    .send()
                    .await
                    .map_err(|e| AppError::Service(format!("datastore request failed: {}", e)))?;

                let rows: Vec<IncrementRow> = read_json(response).await?;
                Ok(rows.into_iter().next().map(|row| {
                    if row.incremented {
                        Increment::Applied(row.new_value)
                    } else {
                        Increment::AtLimit(row.new_value)
                    }
                }))
            }
            // The shard write lock is held across the check and the write.
            Backend::Memory(rows) => Ok(rows.get_mut(id).map(|mut p| {
                let value = match counter {
                    Counter::DocumentsViewed => &mut p.documents_viewed,
                    Counter::DocumentsDownloaded => &mut p.documents_downloaded,
                };
                if limit.is_some_and(|limit| *value >= limit) {
                    return Increment::AtLimit(*value);
                }
                *value += 1;
                let value = *value;
                p.updated_at = now_rfc3339();
                Increment::Applied(value)
            })),
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %body, "Datastore request rejected");
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthenticated,
            _ => AppError::Service(format!("datastore returned {}", status)),
        });
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Service(format!("malformed datastore response: {}", e)))
}

/// UTC timestamp as RFC3339 with a `Z` suffix.
fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> SessionToken {
        SessionToken::new("test-token")
    }

    #[tokio::test]
    async fn test_memory_upsert_creates_then_merges() {
        let store = ProfileStore::new_in_memory();

        let created = store
            .upsert_profile(&token(), "u1", "a@b.edu", &ProfileUpdate::default())
            .await
            .unwrap();
        assert_eq!(created.documents_viewed, 0);
        assert!(created.created_at.ends_with('Z'));

        store
            .increment_counter(&token(), "u1", Counter::DocumentsViewed, None)
            .await
            .unwrap();

        let merged = store
            .upsert_profile(
                &token(),
                "u1",
                "a@b.edu",
                &ProfileUpdate {
                    institution: Some("ETH".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(merged.institution.as_deref(), Some("ETH"));
        assert_eq!(merged.documents_viewed, 1);
        assert_eq!(merged.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_memory_update_and_increment_missing_row() {
        let store = ProfileStore::new_in_memory();

        let updated = store
            .update_profile(&token(), "ghost", &ProfileUpdate::default())
            .await
            .unwrap();
        assert!(updated.is_none());

        let incremented = store
            .increment_counter(&token(), "ghost", Counter::DocumentsDownloaded, None)
            .await
            .unwrap();
        assert!(incremented.is_none());
    }

    #[tokio::test]
    async fn test_memory_increment_stops_at_limit() {
        let store = ProfileStore::new_in_memory();
        store
            .upsert_profile(&token(), "u1", "a@b.edu", &ProfileUpdate::default())
            .await
            .unwrap();

        for expected in 1..=2 {
            let result = store
                .increment_counter(&token(), "u1", Counter::DocumentsViewed, Some(2))
                .await
                .unwrap();
            assert_eq!(result, Some(Increment::Applied(expected)));
        }

        let capped = store
            .increment_counter(&token(), "u1", Counter::DocumentsViewed, Some(2))
            .await
            .unwrap();
        assert_eq!(capped, Some(Increment::AtLimit(2)));

        let other = store
            .increment_counter(&token(), "u1", Counter::DocumentsDownloaded, Some(2))
            .await
            .unwrap();
        assert_eq!(other, Some(Increment::Applied(1)));
    }

    #[test]
    fn test_counter_columns() {
        assert_eq!(Counter::DocumentsViewed.column(), "documents_viewed");
        assert_eq!(Counter::DocumentsDownloaded.column(), "documents_downloaded");
    }
}
