// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (REST datastore).

pub mod profiles;

pub use profiles::{Counter, Increment, ProfileStore};

/// Table and function names as constants.
pub mod tables {
    pub const USER_PROFILES: &str = "user_profiles";
    /// Server-side `col = col + 1 RETURNING col` on a profile counter, optionally capped
    pub const INCREMENT_COUNTER_FN: &str = "increment_profile_counter";
}
