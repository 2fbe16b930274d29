//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `UNIBITES_BASE_URL` - Origin of the storefront server (e.g., `http://127.0.0.1:5000`)
//!
//! ## Optional
//! - `UNIBITES_SESSION_COOKIE` - Session cookie sent with every call (logged-in user)
//! - `UNIBITES_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `UNIBITES_SEARCH_DEBOUNCE_MS` - Search debounce window (default: 300)
//! - `UNIBITES_SEARCH_MIN_CHARS` - Shortest query that is dispatched (default: 2)
//! - `UNIBITES_TOAST_DURATION_MS` - Notification display time (default: 5000)
//! - `UNIBITES_CURRENCY` - Display currency (default: INR)
//! - `UNIBITES_QUANTITY_FAILURE_POLICY` - `leave` or `revert` (default: leave)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use unibites_core::CurrencyCode;
use url::Url;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
const DEFAULT_SEARCH_MIN_CHARS: usize = 2;
const DEFAULT_TOAST_DURATION_MS: u64 = 5000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// What the cart does with an optimistic quantity when the server rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantityFailurePolicy {
    /// Keep showing the quantity the user picked.
    #[default]
    LeaveOptimistic,
    /// Put back the quantity shown before the change.
    Revert,
}

impl std::str::FromStr for QuantityFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leave" | "leave_optimistic" => Ok(Self::LeaveOptimistic),
            "revert" => Ok(Self::Revert),
            _ => Err(format!("expected `leave` or `revert`, got `{s}`")),
        }
    }
}

/// Search panel tuning.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Trailing-edge debounce window for keystrokes.
    pub debounce: Duration,
    /// Queries shorter than this (in characters) are never dispatched.
    pub min_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            min_chars: DEFAULT_SEARCH_MIN_CHARS,
        }
    }
}

/// Storefront interaction layer configuration.
///
/// Implements `Debug` manually to redact the session cookie.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Server origin all API paths are resolved against
    pub base_url: Url,
    /// Session cookie for the logged-in user, if any
    pub session_cookie: Option<SecretString>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Search debounce settings
    pub search: SearchConfig,
    /// How long a notification stays visible
    pub toast_duration: Duration,
    /// Currency used for all displayed amounts
    pub currency: CurrencyCode,
    /// Optimistic quantity handling on failure
    pub quantity_failure_policy: QuantityFailurePolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "session_cookie",
                &self.session_cookie.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("search", &self.search)
            .field("toast_duration", &self.toast_duration)
            .field("currency", &self.currency)
            .field("quantity_failure_policy", &self.quantity_failure_policy)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

impl StorefrontConfig {
    /// Configuration with defaults for everything except the server origin.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            session_cookie: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            search: SearchConfig::default(),
            toast_duration: Duration::from_millis(DEFAULT_TOAST_DURATION_MS),
            currency: CurrencyCode::default(),
            quantity_failure_policy: QuantityFailurePolicy::default(),
            sentry_dsn: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = parse_env("UNIBITES_BASE_URL", &get_required_env("UNIBITES_BASE_URL")?)?;

        let timeout_secs: u64 = parse_env(
            "UNIBITES_REQUEST_TIMEOUT_SECS",
            &get_env_or_default(
                "UNIBITES_REQUEST_TIMEOUT_SECS",
                &DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
            ),
        )?;
        let debounce_ms: u64 = parse_env(
            "UNIBITES_SEARCH_DEBOUNCE_MS",
            &get_env_or_default(
                "UNIBITES_SEARCH_DEBOUNCE_MS",
                &DEFAULT_SEARCH_DEBOUNCE_MS.to_string(),
            ),
        )?;
        let min_chars: usize = parse_env(
            "UNIBITES_SEARCH_MIN_CHARS",
            &get_env_or_default(
                "UNIBITES_SEARCH_MIN_CHARS",
                &DEFAULT_SEARCH_MIN_CHARS.to_string(),
            ),
        )?;
        let toast_ms: u64 = parse_env(
            "UNIBITES_TOAST_DURATION_MS",
            &get_env_or_default(
                "UNIBITES_TOAST_DURATION_MS",
                &DEFAULT_TOAST_DURATION_MS.to_string(),
            ),
        )?;
        let currency = parse_env(
            "UNIBITES_CURRENCY",
            &get_env_or_default("UNIBITES_CURRENCY", "INR"),
        )?;
        let quantity_failure_policy = parse_env(
            "UNIBITES_QUANTITY_FAILURE_POLICY",
            &get_env_or_default("UNIBITES_QUANTITY_FAILURE_POLICY", "leave"),
        )?;

        Ok(Self {
            base_url,
            session_cookie: get_optional_env("UNIBITES_SESSION_COOKIE").map(SecretString::from),
            request_timeout: Duration::from_secs(timeout_secs),
            search: SearchConfig {
                debounce: Duration::from_millis(debounce_ms),
                min_chars,
            },
            toast_duration: Duration::from_millis(toast_ms),
            currency,
            quantity_failure_policy,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a raw value, attributing failures to the variable name.
fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::new(Url::parse("http://localhost:5000").unwrap());
        assert_eq!(config.search.debounce, Duration::from_millis(300));
        assert_eq!(config.search.min_chars, 2);
        assert_eq!(config.toast_duration, Duration::from_millis(5000));
        assert_eq!(config.currency, CurrencyCode::INR);
        assert_eq!(
            config.quantity_failure_policy,
            QuantityFailurePolicy::LeaveOptimistic
        );
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "revert".parse::<QuantityFailurePolicy>().unwrap(),
            QuantityFailurePolicy::Revert
        );
        assert_eq!(
            "leave".parse::<QuantityFailurePolicy>().unwrap(),
            QuantityFailurePolicy::LeaveOptimistic
        );
        assert!("rollback".parse::<QuantityFailurePolicy>().is_err());
    }

    #[test]
    fn test_parse_env_error_names_variable() {
        let err = parse_env::<u64>("UNIBITES_SEARCH_DEBOUNCE_MS", "soon").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "UNIBITES_SEARCH_DEBOUNCE_MS"));
    }

    #[test]
    fn test_debug_redacts_cookie() {
        let mut config = StorefrontConfig::new(Url::parse("http://localhost:5000").unwrap());
        config.session_cookie = Some(SecretString::from("session=abc123".to_string()));
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("abc123"));
    }
}
