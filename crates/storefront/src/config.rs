//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GARAGEHUB_DATABASE_URL` - `PostgreSQL` connection string for the session
//!   store (falls back to `DATABASE_URL`)
//! - `GARAGEHUB_BASE_URL` - Public URL for the storefront
//! - `BACKEND_API_URL` - Base URL of the backend REST API
//!
//! ## Optional
//! - `GARAGEHUB_HOST` - Bind address (default: 127.0.0.1)
//! - `GARAGEHUB_PORT` - Listen port (default: 3000)
//! - `BACKEND_TIMEOUT_SECS` - Per-request timeout for backend calls (default: 10)
//! - `BACKEND_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Backend REST API configuration
    pub backend: BackendConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of errors reported to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced in Sentry
    pub sentry_traces_sample_rate: f32,
}

/// Backend REST API configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL; endpoint paths are joined onto it.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How long catalog responses stay cached.
    pub cache_ttl: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("GARAGEHUB_DATABASE_URL")?;
        let host = parse_env("GARAGEHUB_HOST", "127.0.0.1")?;
        let port = parse_env("GARAGEHUB_PORT", "3000")?;
        let base_url = get_required_env("GARAGEHUB_BASE_URL")?;
        let backend = BackendConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            backend,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("BACKEND_API_URL")?;
        let base_url = parse_base_url(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_API_URL".to_string(), e))?;

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(parse_env("BACKEND_TIMEOUT_SECS", "10")?),
            cache_ttl: Duration::from_secs(parse_env("BACKEND_CACHE_TTL_SECS", "300")?),
        })
    }
}

/// Parse a base URL and make sure it ends with `/`, so that joining
/// `categories` onto `https://api.example.lk/v1` keeps the `/v1` segment.
///
/// # Errors
///
/// Returns a message when the URL is malformed or cannot be a base.
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("URL cannot be used as a base".to_string());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Parse an environment variable, using `default` when it is unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
