// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod identity;
pub mod profile;
pub mod session;

pub use identity::{IdentityClient, IdentityError, StaticIdentity};
pub use profile::ProfileService;
pub use session::{CallbackCredentials, ReadinessPolicy, SessionResolver};
