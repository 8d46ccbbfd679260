//! Buddhira API configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default expected audience claim for access tokens.
pub const DEFAULT_JWT_AUDIENCE: &str = "authenticated";

/// Default key-set cache TTL in seconds (1 hour).
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 3600;

/// Default rate limit in requests per minute per client IP.
pub const DEFAULT_RATE_LIMIT_RPM: u32 = 120;

/// Path of the provider's key-set document, relative to the base URL.
const JWKS_WELL_KNOWN_PATH: &str = "/auth/v1/.well-known/jwks.json";

/// Buddhira API configuration.
///
/// Loaded from environment variables with sensible defaults. The database
/// URL and the Supabase service key are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Base URL of the Supabase project (identity provider).
    pub supabase_url: Option<String>,

    /// Supabase service-role key, sent as the `apikey` header on the
    /// key-set discovery fetch.
    pub supabase_service_role_key: Option<SecretString>,

    /// Explicit key-set endpoint override. When unset, derived from
    /// `supabase_url`.
    pub supabase_jwks_url: Option<String>,

    /// Expected `aud` claim (default: "authenticated").
    pub jwt_audience: String,

    /// Expected `iss` claim. Only validated when set.
    pub jwt_issuer: Option<String>,

    /// How long a fetched key set stays fresh.
    pub jwks_cache_ttl: Duration,

    /// Rate limit in requests per minute per client IP.
    pub rate_limit_rpm: u32,

    /// Allowed CORS origins. Empty means cross-origin requests are not
    /// allowed.
    pub cors_origins: Vec<String>,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("supabase_url", &self.supabase_url)
            .field(
                "supabase_service_role_key",
                &self.supabase_service_role_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("supabase_jwks_url", &self.supabase_jwks_url)
            .field("jwt_audience", &self.jwt_audience)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid key-set cache TTL configuration: {0}")]
    InvalidJwksCacheTtl(String),

    #[error("Invalid rate limit configuration: {0}")]
    InvalidRateLimit(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing or a value
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing or a value
    /// fails validation.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let supabase_url = vars
            .get("SUPABASE_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // SUPABASE_KEY is the legacy name; prefer SUPABASE_SERVICE_ROLE_KEY.
        let supabase_service_role_key = vars
            .get("SUPABASE_SERVICE_ROLE_KEY")
            .or_else(|| vars.get("SUPABASE_KEY"))
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::from(s.as_str()));

        let supabase_jwks_url = vars
            .get("SUPABASE_JWKS_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let jwt_audience = vars
            .get("JWT_AUDIENCE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.to_string());

        let jwt_issuer = vars
            .get("JWT_ISSUER")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Parse key-set cache TTL with validation
        let jwks_cache_ttl_seconds =
            if let Some(value_str) = vars.get("JWKS_CACHE_TTL_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwksCacheTtl(format!(
                        "JWKS_CACHE_TTL_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidJwksCacheTtl(
                        "JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
                    ));
                }

                value
            } else {
                DEFAULT_JWKS_CACHE_TTL_SECONDS
            };

        // Parse rate limit with validation
        let rate_limit_rpm = if let Some(value_str) = vars.get("RATE_LIMIT_RPM") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRateLimit(format!(
                    "RATE_LIMIT_RPM must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidRateLimit(
                    "RATE_LIMIT_RPM must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_RATE_LIMIT_RPM
        };

        let cors_origins = vars
            .get("CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            database_url,
            bind_address,
            supabase_url,
            supabase_service_role_key,
            supabase_jwks_url,
            jwt_audience,
            jwt_issuer,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_seconds),
            rate_limit_rpm,
            cors_origins,
        })
    }

    /// The key-set discovery endpoint: the explicit override when set,
    /// otherwise derived from the provider base URL. `None` means the
    /// service cannot authenticate anyone.
    #[must_use]
    pub fn jwks_url(&self) -> Option<String> {
        if let Some(url) = &self.supabase_jwks_url {
            return Some(url.clone());
        }
        self.supabase_url
            .as_ref()
            .map(|base| format!("{}{}", base.trim_end_matches('/'), JWKS_WELL_KNOWN_PATH))
    }
}
