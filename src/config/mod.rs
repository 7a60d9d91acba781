//! Configuration management for the auth server
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::jwt::DEFAULT_ACCESS_TOKEN_TTL_SECONDS;
use crate::auth::nonce::DEFAULT_NONCE_TTL_SECONDS;

/// Upper bound for nonce and access token lifetimes (30 days)
pub const MAX_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }
}

impl Environment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Where nonces and issued token IDs are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NonceStoreBackend {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for NonceStoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(NonceStoreBackend::Postgres),
            "memory" | "in-memory" => Ok(NonceStoreBackend::Memory),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid NONCE_STORE: '{}'. Expected: postgres or memory",
                s
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Storage backend for nonces and token IDs
    pub nonce_store: NonceStoreBackend,

    /// Database connection URL (required for the postgres backend)
    pub database_url: Option<String>,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// Domain that signed messages must name, also the JWT issuer and audience
    pub auth_domain: String,

    /// JWT secret for token signing
    pub jwt_secret: Option<String>,

    /// Access token TTL in seconds (default: 1800 = 30 minutes)
    pub access_token_ttl_seconds: i64,

    /// Auth nonce TTL in seconds (default: 600 = 10 minutes)
    pub auth_nonce_ttl_seconds: i64,

    /// How often expired nonces are purged
    pub nonce_cleanup_interval_seconds: u64,

    /// Rate limit: requests per second per IP
    pub rate_limit_rps: u32,

    /// CORS allowed origins (comma separated)
    pub cors_allowed_origins: Option<String>,

    /// Per-request timeout
    pub request_timeout_seconds: u64,

    /// Maximum accepted request body
    pub max_body_bytes: usize,

    /// Log filter (RUST_LOG, falling back to LOG_LEVEL)
    pub log_level: String,

    /// Emit JSON logs instead of human-readable ones
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: Environment::Development,
            host: "0.0.0.0".to_string(),
            port: 3001,
            nonce_store: NonceStoreBackend::Postgres,
            database_url: None,
            db_max_connections: 5,
            auth_domain: "localhost".to_string(),
            jwt_secret: None,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            auth_nonce_ttl_seconds: DEFAULT_NONCE_TTL_SECONDS,
            nonce_cleanup_interval_seconds: 300,
            rate_limit_rps: 100,
            cors_allowed_origins: None,
            request_timeout_seconds: 10,
            max_body_bytes: 1024 * 1024,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = env::var("ENVIRONMENT")
            .map(|s| s.parse::<Environment>())
            .unwrap_or(Ok(defaults.environment))?;

        let host = env::var("HOST").unwrap_or(defaults.host);

        let port = env::var("PORT")
            .unwrap_or_else(|_| defaults.port.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let nonce_store = env::var("NONCE_STORE")
            .map(|s| s.parse::<NonceStoreBackend>())
            .unwrap_or(Ok(defaults.nonce_store))?;

        let database_url = non_empty_var("DATABASE_URL");
        if nonce_store == NonceStoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
        }

        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", defaults.db_max_connections);

        let auth_domain = non_empty_var("AUTH_DOMAIN").unwrap_or(defaults.auth_domain);

        let jwt_secret = non_empty_var("JWT_SECRET");
        if environment.is_production() && jwt_secret.is_none() {
            return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()));
        }

        let access_token_ttl_seconds = check_ttl(
            "ACCESS_TOKEN_TTL_SECONDS",
            parse_or("ACCESS_TOKEN_TTL_SECONDS", defaults.access_token_ttl_seconds),
        )?;

        let auth_nonce_ttl_seconds = check_ttl(
            "AUTH_NONCE_TTL_SECONDS",
            parse_or("AUTH_NONCE_TTL_SECONDS", defaults.auth_nonce_ttl_seconds),
        )?;

        let nonce_cleanup_interval_seconds = parse_or(
            "NONCE_CLEANUP_INTERVAL_SECONDS",
            defaults.nonce_cleanup_interval_seconds,
        );

        let rate_limit_rps = parse_or("RATE_LIMIT_RPS", defaults.rate_limit_rps);

        let cors_allowed_origins = non_empty_var("CORS_ALLOWED_ORIGINS");

        let request_timeout_seconds =
            parse_or("REQUEST_TIMEOUT_SECONDS", defaults.request_timeout_seconds);

        let max_body_bytes = parse_or("MAX_BODY_BYTES", defaults.max_body_bytes);

        let log_level = env::var("RUST_LOG")
            .or_else(|_| env::var("LOG_LEVEL"))
            .unwrap_or(defaults.log_level);

        let log_json = env::var("LOG_FORMAT")
            .map(|s| s.eq_ignore_ascii_case("json"))
            .unwrap_or(defaults.log_json);

        Ok(Config {
            environment,
            host,
            port,
            nonce_store,
            database_url,
            db_max_connections,
            auth_domain,
            jwt_secret,
            access_token_ttl_seconds,
            auth_nonce_ttl_seconds,
            nonce_cleanup_interval_seconds,
            rate_limit_rps,
            cors_allowed_origins,
            request_timeout_seconds,
            max_body_bytes,
            log_level,
            log_json,
        })
    }

    /// Get database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> String {
        let Some(url) = &self.database_url else {
            return String::new();
        };

        if let Some(at_pos) = url.find('@') {
            if let Some(colon_pos) = url[..at_pos].rfind(':') {
                let prefix = &url[..colon_pos + 1];
                let suffix = &url[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        url.clone()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Lifetimes must be positive and no longer than [`MAX_TTL_SECONDS`]
fn check_ttl(key: &str, seconds: i64) -> Result<i64, ConfigError> {
    if (1..=MAX_TTL_SECONDS).contains(&seconds) {
        Ok(seconds)
    } else {
        Err(ConfigError::InvalidValue(format!(
            "{} must be between 1 and {}, got {}",
            key, MAX_TTL_SECONDS, seconds
        )))
    }
}
