// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! ExamHub: session gateway and usage tracking for an exam-paper sharing site
//!
//! This crate sits in front of the page layer. It establishes sessions from
//! identity-provider redirects, guards page routes by session state, and
//! tracks each user's free document-view quota in the profile datastore.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::{IdentityClient, ProfileService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub identity: IdentityClient,
    pub profiles: ProfileService,
}
