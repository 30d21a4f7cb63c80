// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile record stored in the `user_profiles` table.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Account role. New profiles start as students.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Admin,
}

/// Paid plan level, when the account has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SubscriptionTier {
    Free,
    Basic,
    Premium,
}

/// One row per identity. `id` is the identity service's user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub role: Role,
    // Counters only ever move up, and only through the datastore's increment.
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub documents_viewed: u64,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub documents_downloaded: u64,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub documents_uploaded: u64,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub subscription_tier: Option<SubscriptionTier>,
    /// Set by the datastore (ISO 8601)
    #[serde(default)]
    pub created_at: String,
    /// Set by the datastore (ISO 8601)
    #[serde(default)]
    pub updated_at: String,
}

impl UserProfile {
    /// A fresh row with default role, zeroed counters and no plan.
    pub fn new(id: impl Into<String>, email: impl Into<String>, now: &str) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            full_name: None,
            avatar_url: None,
            institution: None,
            role: Role::default(),
            documents_viewed: 0,
            documents_downloaded: 0,
            documents_uploaded: 0,
            is_premium: false,
            subscription_tier: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Copy every field present in `update` onto this profile.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(full_name) = &update.full_name {
            self.full_name = Some(full_name.clone());
        }
        if let Some(avatar_url) = &update.avatar_url {
            self.avatar_url = Some(avatar_url.clone());
        }
        if let Some(institution) = &update.institution {
            self.institution = Some(institution.clone());
        }
        if let Some(role) = update.role {
            self.role = role;
        }
    }
}

/// Fields accepted when creating or overwriting a profile.
///
/// `email` falls back to the identity's email when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: ProfileUpdate,
}

/// User-editable profile fields. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub institution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.avatar_url.is_none()
            && self.institution.is_none()
            && self.role.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_row_uses_defaults() {
        let json = r#"{"id":"u1","email":"a@b.edu","created_at":"t","updated_at":"t"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.role, Role::Student);
        assert_eq!(profile.documents_viewed, 0);
        assert_eq!(profile.documents_uploaded, 0);
        assert!(!profile.is_premium);
        assert_eq!(profile.subscription_tier, None);
    }

    #[test]
    fn test_role_and_tier_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");
        assert_eq!(
            serde_json::from_str::<SubscriptionTier>("\"basic\"").unwrap(),
            SubscriptionTier::Basic
        );
        assert!(serde_json::from_str::<Role>("\"principal\"").is_err());
    }

    #[test]
    fn test_apply_only_touches_present_fields() {
        let mut profile = UserProfile::new("u1", "a@b.edu", "now");
        profile.institution = Some("MIT".to_string());
        profile.role = Role::Teacher;
        profile.documents_viewed = 7;

        profile.apply(&ProfileUpdate {
            full_name: Some("A".to_string()),
            ..Default::default()
        });

        assert_eq!(profile.full_name.as_deref(), Some("A"));
        assert_eq!(profile.institution.as_deref(), Some("MIT"));
        assert_eq!(profile.role, Role::Teacher);
        assert_eq!(profile.documents_viewed, 7);
    }

    #[test]
    fn test_update_serializes_only_present_fields() {
        let update = ProfileUpdate {
            institution: Some("Oxford".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"institution": "Oxford"})
        );
    }

    #[test]
    fn test_update_validation() {
        let too_long = ProfileUpdate {
            full_name: Some("x".repeat(201)),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());

        let bad_avatar = ProfileUpdate {
            avatar_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(bad_avatar.validate().is_err());

        assert!(ProfileUpdate::default().is_empty());
    }
}
