// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Behaviour
//!
//! - Keys are cached with a TTL and refetched once it elapses
//! - An unknown `kid` triggers an early refetch, at most once per
//!   [`MIN_REFRESH_INTERVAL`]
//! - A stale key set is kept when a refetch fails, and the endpoint is not
//!   retried for another [`MIN_REFRESH_INTERVAL`]
//! - Only one refetch is in flight at a time; concurrent callers wait for it
//!   and read its result

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};

use super::error::VerifyError;

/// Default JWKS cache TTL (5 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Minimum spacing between refetches outside the TTL schedule.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
    /// Last fetch attempt, successful or not.
    checked_at: Instant,
}

/// A verification key resolved from the JWKS.
pub struct ResolvedKey {
    pub key: DecodingKey,
    /// Algorithm declared by the JWK, if any.
    pub algorithm: Option<Algorithm>,
}

/// JWKS manager with caching.
#[derive(Clone)]
pub struct JwksManager {
    jwks_uri: String,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// Held for the duration of a fetch.
    refetch: Arc<Mutex<()>>,
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a manager for `jwks_uri` using the given HTTP client.
    pub fn new(jwks_uri: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
            cache: Arc::new(RwLock::new(None)),
            refetch: Arc::new(Mutex::new(())),
            client,
        }
    }

    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    /// Fetch JWKS (with caching).
    async fn get_jwks(&self) -> Result<JwkSet, VerifyError> {
        if let Some(jwks) = self.fresh().await {
            return Ok(jwks);
        }

        let _guard = self.refetch.lock().await;
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                // Refetched while we waited, or a refetch just failed.
                if entry.fetched_at.elapsed() < self.cache_ttl
                    || entry.checked_at.elapsed() < self.min_refresh_interval
                {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        match self.refetch_locked().await {
            Ok(jwks) => Ok(jwks),
            Err(e) => {
                let cache = self.cache.read().await;
                match &*cache {
                    Some(entry) => {
                        tracing::warn!(error = %e, jwks_uri = %self.jwks_uri, "JWKS refetch failed, using stale keys");
                        Ok(entry.jwks.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn fresh(&self) -> Option<JwkSet> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
            .map(|entry| entry.jwks.clone())
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, VerifyError> {
        let response = self
            .client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| VerifyError::JwksFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VerifyError::JwksFetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| VerifyError::JwksFetch(e.to_string()))
    }

    /// Force refresh the JWKS cache.
    pub async fn refresh(&self) -> Result<JwkSet, VerifyError> {
        let _guard = self.refetch.lock().await;
        self.refetch_locked().await
    }

    /// Caller must hold `self.refetch`.
    async fn refetch_locked(&self) -> Result<JwkSet, VerifyError> {
        match self.fetch_jwks().await {
            Ok(jwks) => {
                tracing::debug!(jwks_uri = %self.jwks_uri, keys = jwks.keys.len(), "fetched JWKS");
                let now = Instant::now();
                *self.cache.write().await = Some(CacheEntry {
                    jwks: jwks.clone(),
                    fetched_at: now,
                    checked_at: now,
                });
                Ok(jwks)
            }
            Err(e) => {
                let mut cache = self.cache.write().await;
                if let Some(entry) = &mut *cache {
                    entry.checked_at = Instant::now();
                }
                Err(e)
            }
        }
    }

    /// Resolve the candidate keys for a token.
    ///
    /// With a `kid`, exactly the matching key is returned, refetching the set
    /// once if the key is unknown. Without one, every usable signing key is
    /// returned.
    pub async fn resolve(&self, kid: Option<&str>) -> Result<Vec<ResolvedKey>, VerifyError> {
        let jwks = self.get_jwks().await?;

        let Some(kid) = kid else {
            let keys: Vec<_> = jwks
                .keys
                .iter()
                .filter_map(|jwk| jwk_to_decoding_key(jwk).ok())
                .collect();
            if keys.is_empty() {
                return Err(VerifyError::NoMatchingKey);
            }
            return Ok(keys);
        };

        if let Some(jwk) = find_key(&jwks, kid) {
            return Ok(vec![jwk_to_decoding_key(jwk)?]);
        }

        let jwks = self.refresh_for_kid(kid).await?;
        let jwk = find_key(&jwks, kid).ok_or(VerifyError::NoMatchingKey)?;
        Ok(vec![jwk_to_decoding_key(jwk)?])
    }

    /// Refetch for an unknown `kid`, unless another caller already did.
    async fn refresh_for_kid(&self, kid: &str) -> Result<JwkSet, VerifyError> {
        let _guard = self.refetch.lock().await;
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if find_key(&entry.jwks, kid).is_some() {
                    return Ok(entry.jwks.clone());
                }
                if entry.checked_at.elapsed() < self.min_refresh_interval {
                    return Err(VerifyError::NoMatchingKey);
                }
            }
        }

        tracing::debug!(kid, "unknown key ID, refetching JWKS");
        self.refetch_locked().await
    }
}

fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<ResolvedKey, VerifyError> {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return Err(VerifyError::UnsupportedKey("encryption key".to_string()));
    }

    let declared = jwk.common.key_algorithm.as_ref().and_then(|a| match a {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    });

    let key = match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| VerifyError::UnsupportedKey(format!("invalid RSA key: {e}")))?,
        AlgorithmParameters::EllipticCurve(ec) => DecodingKey::from_ec_components(&ec.x, &ec.y)
            .map_err(|e| VerifyError::UnsupportedKey(format!("invalid EC key: {e}")))?,
        AlgorithmParameters::OctetKeyPair(okp) => DecodingKey::from_ed_components(&okp.x)
            .map_err(|e| VerifyError::UnsupportedKey(format!("invalid OKP key: {e}")))?,
        _ => {
            return Err(VerifyError::UnsupportedKey(
                "symmetric keys are not accepted".to_string(),
            ))
        }
    };

    Ok(ResolvedKey {
        key,
        algorithm: declared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ec_jwk(kid: &str) -> serde_json::Value {
        let mut jwk: serde_json::Value =
            serde_json::from_str(include_str!("../../tests/fixtures/ec_public.jwk.json")).unwrap();
        jwk["kid"] = json!(kid);
        jwk
    }

    async fn jwks_server(keys: Vec<serde_json::Value>, expected_calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .expect(expected_calls)
            .mount(&server)
            .await;
        server
    }

    fn manager(server: &MockServer) -> JwksManager {
        JwksManager::new(format!("{}/jwks", server.uri()), reqwest::Client::new())
    }

    #[tokio::test]
    async fn resolves_key_by_kid_and_caches() {
        let server = jwks_server(vec![ec_jwk("key-1")], 1).await;
        let manager = manager(&server);

        let keys = manager.resolve(Some("key-1")).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].algorithm, Some(Algorithm::ES256));
        assert_eq!(manager.jwks_uri(), format!("{}/jwks", server.uri()));

        // Served from cache.
        manager.resolve(Some("key-1")).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_kid_refetches_rotated_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "keys": [ec_jwk("key-1")] })),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "keys": [ec_jwk("key-1"), ec_jwk("rotated")] }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut manager = manager(&server);
        manager.min_refresh_interval = Duration::ZERO;

        manager.resolve(Some("key-1")).await.unwrap();
        let keys = manager.resolve(Some("rotated")).await.unwrap();
        assert_eq!(keys.len(), 1);

        // Now cached, no third fetch.
        manager.resolve(Some("rotated")).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_cold_resolves_fetch_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "keys": [ec_jwk("key-1")] }))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let manager = manager(&server);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.resolve(Some("key-1")).await.map(|k| k.len()) })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn failed_refetch_serves_stale_keys_and_backs_off() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "keys": [ec_jwk("key-1")] })),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let mut manager = manager(&server);
        manager.cache_ttl = Duration::ZERO;
        manager.min_refresh_interval = Duration::from_millis(200);

        manager.resolve(Some("key-1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        // Expired: one failed refetch, then stale keys until the interval passes.
        for _ in 0..3 {
            manager.resolve(Some("key-1")).await.unwrap();
        }
    }

    #[tokio::test]
    async fn unknown_kid_is_rate_limited() {
        // Initial fetch only: the miss right after it is inside the refresh interval.
        let server = jwks_server(vec![ec_jwk("key-1")], 1).await;
        let manager = manager(&server);

        let err = manager.resolve(Some("rotated")).await.err().unwrap();
        assert!(matches!(err, VerifyError::NoMatchingKey));
    }

    #[tokio::test]
    async fn missing_kid_returns_all_signing_keys() {
        let mut enc = ec_jwk("enc");
        enc["use"] = json!("enc");
        let server = jwks_server(vec![ec_jwk("a"), ec_jwk("b"), enc], 1).await;
        let manager = manager(&server);

        let keys = manager.resolve(None).await.unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn fetch_error_surfaces_without_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let manager = manager(&server);

        let err = manager.resolve(Some("key-1")).await.err().unwrap();
        assert!(matches!(err, VerifyError::JwksFetch(_)));
    }
}
