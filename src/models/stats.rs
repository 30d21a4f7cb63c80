// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Usage counters and the derived free-view quota.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::FREE_VIEW_LIMIT;
use crate::models::UserProfile;

/// Counters read from a profile plus the remaining free views.
///
/// `remaining_free_views` is computed on read and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserStats {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub documents_viewed: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub documents_downloaded: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub documents_uploaded: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub remaining_free_views: u64,
}

impl UserStats {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            documents_viewed: profile.documents_viewed,
            documents_downloaded: profile.documents_downloaded,
            documents_uploaded: profile.documents_uploaded,
            remaining_free_views: remaining_free_views(profile.documents_viewed),
        }
    }

    pub fn limit_reached(&self) -> bool {
        self.documents_viewed >= FREE_VIEW_LIMIT
    }
}

/// `max(0, FREE_VIEW_LIMIT - documents_viewed)`.
pub fn remaining_free_views(documents_viewed: u64) -> u64 {
    FREE_VIEW_LIMIT.saturating_sub(documents_viewed)
}
