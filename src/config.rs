//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Longest accepted access token lifetime: thirty days.
const MAX_TOKEN_TTL_MINUTES: i64 = 30 * 24 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `LEDGER_BASE_URL` (required): base URL of the ledger service
/// - `LEDGER_TIMEOUT_SECS` (optional): ledger request timeout, defaults to 300
/// - `NOTIFICATION_URL` (optional): endpoint for signed notifications; when
///   unset, notifications are only logged
/// - `NOTIFICATION_SECRET` (optional): HMAC key for notification signatures
/// - `TOKEN_SECRET` (required): HMAC key for access tokens
/// - `TOKEN_TTL_MINUTES` (optional): access token lifetime, defaults to 60,
///   at least 1 and at most 30 days
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    pub ledger_base_url: String,

    #[serde(default = "default_ledger_timeout")]
    pub ledger_timeout_secs: u64,

    #[serde(default)]
    pub notification_url: Option<String>,

    #[serde(default)]
    pub notification_secret: String,

    pub token_secret: String,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_ledger_timeout() -> u64 {
    300
}

fn default_token_ttl() -> i64 {
    60
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - `TOKEN_TTL_MINUTES` is outside its accepted range
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()?.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&self.token_ttl_minutes) {
            return Err(ConfigError::OutOfRange {
                name: "TOKEN_TTL_MINUTES",
                value: self.token_ttl_minutes,
                min: 1,
                max: MAX_TOKEN_TTL_MINUTES,
            });
        }
        Ok(self)
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes)
    }
}
