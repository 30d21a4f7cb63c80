// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

/// Number of document views a free account gets before uploads are required.
pub const FREE_VIEW_LIMIT: u64 = 20;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity service base URL (e.g. `https://abc.example.co`)
    pub identity_url: String,
    /// Public API key sent with every identity/datastore request
    pub identity_key: String,
    /// REST datastore base URL
    pub datastore_url: String,
    /// Public origin of the site
    pub site_url: String,
    /// Server port
    pub port: u16,
    /// Provider offered on the login page
    pub oauth_provider: String,
    /// Timeout applied to every outbound service call
    pub http_timeout: Duration,
    /// How many times to confirm a fresh session before giving up
    pub session_ready_attempts: u32,
    /// Delay between session readiness checks
    pub session_ready_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let identity_url = env::var("IDENTITY_SERVICE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .map_err(|_| ConfigError::Missing("IDENTITY_SERVICE_URL"))?;

        if !identity_url.starts_with("http://") && !identity_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                name: "IDENTITY_SERVICE_URL",
                reason: "must start with http:// or https://".to_string(),
            });
        }

        Ok(Self {
            datastore_url: env::var("DATASTORE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|_| identity_url.clone()),
            identity_key: env::var("IDENTITY_SERVICE_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("IDENTITY_SERVICE_KEY"))?,
            identity_url,
            site_url: env::var("SITE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: parse_or("PORT", 8080)?,
            oauth_provider: env::var("OAUTH_PROVIDER").unwrap_or_else(|_| "google".to_string()),
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 10)?),
            session_ready_attempts: parse_or("SESSION_READY_ATTEMPTS", 5)?,
            session_ready_interval: Duration::from_millis(parse_or(
                "SESSION_READY_INTERVAL_MS",
                200,
            )?),
        })
    }

    /// Fixed configuration for tests.
    pub fn test_default() -> Self {
        Self {
            identity_url: "https://testproject.identity.example".to_string(),
            identity_key: "test_anon_key".to_string(),
            datastore_url: "https://testproject.identity.example".to_string(),
            site_url: "http://localhost:3000".to_string(),
            port: 8080,
            oauth_provider: "google".to_string(),
            http_timeout: Duration::from_secs(2),
            session_ready_attempts: 3,
            session_ready_interval: Duration::from_millis(10),
        }
    }

    /// Name of the session cookie the identity SDK derives from the service host:
    /// `sb-` followed by the host with every non-alphanumeric character replaced by `_`.
    pub fn provider_cookie_name(&self) -> String {
        let host = self
            .identity_url
            .trim_start_matches("https://")
            .trim_start_matches("http://");

        let sanitized: String = host
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();

        format!("sb-{}", sanitized)
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.site_url.starts_with("https://")
    }

    /// Absolute URL the identity provider redirects back to.
    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.site_url)
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("could not parse {:?}", raw),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("IDENTITY_SERVICE_URL", "https://abc123.identity.example/");
        env::set_var("IDENTITY_SERVICE_KEY", "anon");
        env::remove_var("DATASTORE_URL");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.identity_url, "https://abc123.identity.example");
        assert_eq!(config.datastore_url, config.identity_url);
        assert_eq!(config.identity_key, "anon");
    }

    #[test]
    fn test_provider_cookie_name_sanitizes_host() {
        let mut config = Config::test_default();
        config.identity_url = "https://abc123.supabase.co".to_string();
        assert_eq!(config.provider_cookie_name(), "sb-abc123_supabase_co");

        config.identity_url = "http://localhost:54321".to_string();
        assert_eq!(config.provider_cookie_name(), "sb-localhost_54321");
    }

    #[test]
    fn test_secure_cookies_follow_site_scheme() {
        let mut config = Config::test_default();
        assert!(!config.secure_cookies());

        config.site_url = "https://papers.example.edu".to_string();
        assert!(config.secure_cookies());
        assert_eq!(
            config.callback_url(),
            "https://papers.example.edu/auth/callback"
        );
    }
}
