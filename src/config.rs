//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local use.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Upper bound for `SUBTRACK_UPCOMING_WINDOW_DAYS` (about ten years).
pub const MAX_UPCOMING_WINDOW_DAYS: i64 = 3650;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL, without trailing slash
    pub api_base_url: String,
    /// Time allowed to establish a connection
    pub request_timeout: Duration,
    /// Time allowed for a whole request including the body
    pub resource_timeout: Duration,
    /// Where the session token is persisted
    pub token_path: PathBuf,
    /// Country code used for phone logins when none is given
    pub default_country_code: String,
    /// Seconds between OTP resends
    pub resend_cooldown_secs: u32,
    /// Look-ahead for upcoming payments
    pub upcoming_window_days: i64,
    /// Count overdue active subscriptions as upcoming
    pub include_overdue: bool,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(30),
            resource_timeout: Duration::from_secs(60),
            token_path: env::temp_dir().join("subtrack-test-session.json"),
            default_country_code: "+62".to_string(),
            resend_cooldown_secs: 30,
            upcoming_window_days: 7,
            include_overdue: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            api_base_url: env::var("SUBTRACK_API_BASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "https://api.subscriptionmanager.com".to_string()),
            request_timeout: Duration::from_secs(parse_var(
                "SUBTRACK_REQUEST_TIMEOUT_SECS",
                30u64,
            )?),
            resource_timeout: Duration::from_secs(parse_var(
                "SUBTRACK_RESOURCE_TIMEOUT_SECS",
                60u64,
            )?),
            token_path: env::var("SUBTRACK_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_token_path()),
            default_country_code: env::var("SUBTRACK_DEFAULT_COUNTRY_CODE")
                .unwrap_or_else(|_| "+62".to_string()),
            resend_cooldown_secs: parse_var("SUBTRACK_RESEND_COOLDOWN_SECS", 30u32)?,
            upcoming_window_days: parse_bounded_var(
                "SUBTRACK_UPCOMING_WINDOW_DAYS",
                7i64,
                0..=MAX_UPCOMING_WINDOW_DAYS,
            )?,
            include_overdue: parse_var("SUBTRACK_INCLUDE_OVERDUE", true)?,
        })
    }
}

/// Read `name` and parse it, falling back to `default` when unset.
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Like [`parse_var`], but values outside `range` are rejected.
fn parse_bounded_var<T: FromStr + PartialOrd>(
    name: &'static str,
    default: T,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError> {
    let value = parse_var(name, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(name))
    }
}

fn default_token_path() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(env::temp_dir)
        .join(".subtrack")
        .join("session.json")
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
