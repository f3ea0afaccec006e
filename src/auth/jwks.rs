// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Caching
//!
//! - Keys are cached individually by `kid` with a TTL (default one hour)
//! - At most `max_cached_keys` keys are held (default 16, LRU eviction)
//! - An unknown or expired `kid` triggers a re-fetch, which picks up rotated keys
//! - Nothing is fetched until the first token is verified
//!
//! Concurrent misses may each fetch the key set; the fetch is idempotent.
//!
//! ## Usage
//!
//! Create one `JwksManager` at startup, share it through `AppState` via
//! `TokenVerifier`.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, PublicKeyUse};
use jsonwebtoken::DecodingKey;
use lru::LruCache;

use super::error::AuthError;

/// Default signing key cache TTL (1 hour).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default number of signing keys held at once.
pub const DEFAULT_MAX_CACHED_KEYS: usize = 16;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

struct CachedKey {
    key: DecodingKey,
    fetched_at: Instant,
}

/// JWKS manager with a per-key TTL cache.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS URL (Clerk endpoint)
    jwks_url: String,
    cache_ttl: Duration,
    keys: Arc<Mutex<LruCache<String, CachedKey>>>,
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint URL
    ///   (e.g., `https://your-app.clerk.accounts.dev/.well-known/jwks.json`)
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AuthError::InternalError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            keys: Arc::new(Mutex::new(LruCache::new(capacity(DEFAULT_MAX_CACHED_KEYS)))),
            client,
        })
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with a custom key capacity. Drops anything already cached.
    pub fn with_max_cached_keys(mut self, max: usize) -> Self {
        self.keys = Arc::new(Mutex::new(LruCache::new(capacity(max))));
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Get a decoding key for the given key ID, fetching the key set on a miss.
    ///
    /// An unknown `kid` after a fresh fetch is an [`AuthError::InvalidToken`].
    pub async fn get_decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        if let Some(key) = self.cached(kid)? {
            return Ok(key);
        }

        tracing::debug!(kid, "Signing key not cached, fetching JWKS");
        let jwks = self.fetch_jwks().await?;
        let found = self.store(&jwks, Some(kid))?;

        found.ok_or_else(|| {
            AuthError::InvalidToken(format!("Unable to find a signing key that matches: {kid}"))
        })
    }

    /// Force refresh the key cache.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let jwks = self.fetch_jwks().await?;
        self.store(&jwks, None)?;
        Ok(())
    }

    /// Check if at least one unexpired key is cached.
    pub fn is_cached(&self) -> bool {
        match self.lock() {
            Ok(keys) => keys
                .iter()
                .any(|(_, entry)| entry.fetched_at.elapsed() < self.cache_ttl),
            Err(_) => false,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LruCache<String, CachedKey>>, AuthError> {
        self.keys
            .lock()
            .map_err(|_| AuthError::InternalError("JWKS cache lock poisoned".to_string()))
    }

    fn cached(&self, kid: &str) -> Result<Option<DecodingKey>, AuthError> {
        let mut keys = self.lock()?;
        if let Some(entry) = keys.get(kid) {
            if entry.fetched_at.elapsed() < self.cache_ttl {
                return Ok(Some(entry.key.clone()));
            }
            // Expired, evict
            keys.pop(kid);
        }
        Ok(None)
    }

    /// Cache every usable key in `jwks`, returning the one matching `wanted`.
    ///
    /// The wanted key is inserted last so it survives even when the set is
    /// larger than the cache.
    fn store(
        &self,
        jwks: &JwkSet,
        wanted: Option<&str>,
    ) -> Result<Option<DecodingKey>, AuthError> {
        let now = Instant::now();
        let mut found = None;
        let mut keys = self.lock()?;

        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.as_deref() else {
                continue;
            };
            let key = match jwk_to_decoding_key(jwk) {
                Ok(key) => key,
                Err(e) => {
                    tracing::debug!(kid, error = %e, "Skipping unusable JWK");
                    continue;
                }
            };
            if wanted == Some(kid) {
                found = Some((kid.to_string(), key));
                continue;
            }
            keys.put(kid.to_string(), CachedKey { key, fetched_at: now });
        }

        Ok(found.map(|(kid, key)| {
            keys.put(
                kid,
                CachedKey {
                    key: key.clone(),
                    fetched_at: now,
                },
            );
            key
        }))
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::InternalError(format!("Failed to fetch JWKS: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::InternalError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::InternalError(format!("Invalid JWKS document: {e}")))
    }
}

fn capacity(max: usize) -> NonZeroUsize {
    NonZeroUsize::new(max).unwrap_or(NonZeroUsize::MIN)
}

/// Convert an RSA signing JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    if jwk.common.public_key_use == Some(PublicKeyUse::Encryption) {
        return Err(AuthError::InternalError("JWK is an encryption key".to_string()));
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| AuthError::InternalError(format!("Failed to create RSA key: {e}"))),
        _ => Err(AuthError::InternalError(
            "Unsupported key type in JWKS".to_string(),
        )),
    }
}
