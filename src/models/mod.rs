// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod profile;
pub mod session;
pub mod stats;

pub use profile::{NewProfile, ProfileUpdate, Role, SubscriptionTier, UserProfile};
pub use session::{AuthUser, Session, SessionToken};
pub use stats::UserStats;
