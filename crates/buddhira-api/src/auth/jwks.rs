//! Key resolver: fetches and caches the identity provider's signing keys.
//!
//! The provider publishes its public keys as a JWKS document. Keys are
//! cached by `kid` with a configurable TTL (default one hour). An unknown
//! `kid` triggers a refresh only once the cached set has gone stale, which
//! is how provider-side key rotation is picked up without a push channel —
//! and which keeps a storm of bogus `kid`s from turning into a fetch storm.
//!
//! # Concurrency
//!
//! The cache is replaced wholesale on refresh (readers never observe a
//! partially updated set), and refreshes are serialized behind an async
//! mutex so concurrent misses share a single in-flight fetch.

use crate::auth::AuthError;
use common::secret::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default key-set cache TTL in seconds (1 hour).
const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Timeout for the key-set discovery fetch. An unbounded hang is treated
/// the same as an unreachable endpoint.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON Web Key from the provider's key-set document.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("EC" for the P-256 keys the provider issues).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Curve name (expected "P-256").
    #[serde(default)]
    pub crv: Option<String>,

    /// X coordinate of the public key point (base64url encoded).
    #[serde(default)]
    pub x: Option<String>,

    /// Y coordinate of the public key point (base64url encoded).
    #[serde(default)]
    pub y: Option<String>,

    /// Algorithm (expected "ES256").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// Key-set document returned by the discovery endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Cached key set with its fetch time.
struct CachedJwks {
    /// Map of key ID to JWK.
    keys: HashMap<String, Jwk>,

    /// When this set was fetched.
    fetched_at: Instant,
}

/// Result of a cache probe.
enum Lookup {
    /// Key present in the cached set.
    Hit(Jwk),

    /// The cached set is still fresh and does not contain the key; a
    /// refresh would not be allowed yet.
    KnownAbsent,

    /// No cached set, or the set has gone stale; a refresh is in order.
    Refreshable,
}

/// Key resolver with a TTL cache over the provider's key-set endpoint.
pub struct JwksClient {
    /// Discovery endpoint. `None` means authentication is unconfigured.
    jwks_url: Option<String>,

    /// API credential sent as the `apikey` header on the discovery fetch.
    api_key: Option<SecretString>,

    /// HTTP client for fetching the key set.
    http_client: reqwest::Client,

    /// Cached key set, replaced wholesale on refresh.
    cache: Arc<RwLock<Option<CachedJwks>>>,

    /// Serializes refreshes so concurrent misses share one fetch.
    refresh_lock: Mutex<()>,

    /// Cache TTL duration.
    cache_ttl: Duration,
}

impl JwksClient {
    /// Create a new key resolver with the default cache TTL.
    #[must_use]
    pub fn new(jwks_url: Option<String>, api_key: Option<SecretString>) -> Self {
        Self::with_ttl(
            jwks_url,
            api_key,
            Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
        )
    }

    /// Create a new key resolver with a custom cache TTL.
    #[must_use]
    pub fn with_ttl(
        jwks_url: Option<String>,
        api_key: Option<SecretString>,
        cache_ttl: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(
                    target: "buddhira.auth.jwks",
                    error = %e,
                    "Failed to build HTTP client with custom config, using defaults"
                );
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            api_key,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            refresh_lock: Mutex::new(()),
            cache_ttl,
        }
    }

    /// Get a signing key by key ID.
    ///
    /// Serves from the cache when possible. When the `kid` is unknown and
    /// the cached set is empty or stale, performs exactly one refresh and
    /// retries the lookup.
    ///
    /// # Errors
    ///
    /// - `AuthError::Configuration` when no discovery endpoint is configured
    /// - `AuthError::KeyResolution` when the `kid` is unknown or the key
    ///   set cannot be fetched
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, AuthError> {
        let Some(url) = self.jwks_url.clone() else {
            tracing::error!(
                target: "buddhira.auth.jwks",
                "No key-set endpoint configured; cannot resolve signing keys"
            );
            return Err(AuthError::Configuration(
                "key-set discovery endpoint is not configured".to_string(),
            ));
        };

        match self.lookup(kid).await {
            Lookup::Hit(key) => {
                tracing::debug!(target: "buddhira.auth.jwks", kid = %kid, "Key-set cache hit");
                return Ok(key);
            }
            Lookup::KnownAbsent => {
                tracing::debug!(
                    target: "buddhira.auth.jwks",
                    kid = %kid,
                    "Key not found in fresh key set"
                );
                return Err(AuthError::KeyResolution("unknown signing key".to_string()));
            }
            Lookup::Refreshable => {}
        }

        // Serialize refreshes: a concurrent caller may already be fetching.
        let _guard = self.refresh_lock.lock().await;

        // The set may have been refreshed while we waited for the guard.
        match self.lookup(kid).await {
            Lookup::Hit(key) => return Ok(key),
            Lookup::KnownAbsent => {
                return Err(AuthError::KeyResolution("unknown signing key".to_string()));
            }
            Lookup::Refreshable => {}
        }

        self.refresh(&url).await?;

        let cache = self.cache.read().await;
        if let Some(cached) = cache.as_ref() {
            if let Some(key) = cached.keys.get(kid) {
                return Ok(key.clone());
            }
        }

        tracing::warn!(
            target: "buddhira.auth.jwks",
            kid = %kid,
            "Key not found in key set after refresh"
        );
        Err(AuthError::KeyResolution("unknown signing key".to_string()))
    }

    /// Probe the cache for a key without performing any I/O.
    async fn lookup(&self, kid: &str) -> Lookup {
        let cache = self.cache.read().await;
        match cache.as_ref() {
            Some(cached) => {
                if let Some(key) = cached.keys.get(kid) {
                    Lookup::Hit(key.clone())
                } else if cached.fetched_at.elapsed() < self.cache_ttl {
                    Lookup::KnownAbsent
                } else {
                    Lookup::Refreshable
                }
            }
            None => Lookup::Refreshable,
        }
    }

    /// Fetch the key set and replace the cache wholesale.
    #[instrument(skip_all)]
    async fn refresh(&self, url: &str) -> Result<(), AuthError> {
        tracing::debug!(target: "buddhira.auth.jwks", url = %url, "Fetching key set");

        let mut request = self.http_client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(target: "buddhira.auth.jwks", error = %e, "Failed to fetch key set");
            AuthError::KeyResolution("key set unavailable".to_string())
        })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "buddhira.auth.jwks",
                status = %response.status(),
                "Key-set endpoint returned error"
            );
            return Err(AuthError::KeyResolution("key set unavailable".to_string()));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(
                target: "buddhira.auth.jwks",
                error = %e,
                "Failed to parse key-set response"
            );
            AuthError::KeyResolution("key set unavailable".to_string())
        })?;

        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();

        tracing::info!(
            target: "buddhira.auth.jwks",
            key_count = keys.len(),
            "Key-set cache refreshed"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            fetched_at: Instant::now(),
        });

        Ok(())
    }
}
