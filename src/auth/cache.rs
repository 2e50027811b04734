// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification result cache.
//!
//! Successful verifications are memoized per token string so repeated
//! requests skip the network round trip. Only successes are cached, and an
//! entry never outlives the token it describes: its expiry is the earlier of
//! the cache TTL and the token's own `exp`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::claims::TokenInfo;
use super::config::DEFAULT_CACHE_TTL;
use super::error::VerifyError;
use super::verifier::TokenVerifier;

/// Entry count at which a store first sweeps out expired entries.
const SWEEP_THRESHOLD: usize = 1024;

/// Cached verification result.
struct CacheEntry {
    info: Arc<TokenInfo>,
    expires_at: Instant,
}

/// Wraps a [`TokenVerifier`] with an in-process TTL cache.
pub struct CachingVerifier<V> {
    inner: V,
    cache: DashMap<String, Arc<CacheEntry>>,
    ttl: Duration,
    sweep_threshold: usize,
}

impl<V: TokenVerifier> CachingVerifier<V> {
    /// A zero `ttl` selects the default of five minutes.
    pub fn new(inner: V, ttl: Duration) -> Self {
        let ttl = if ttl.is_zero() { DEFAULT_CACHE_TTL } else { ttl };
        Self {
            inner,
            cache: DashMap::new(),
            ttl,
            sweep_threshold: SWEEP_THRESHOLD,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, including ones not yet evicted.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Remove all expired entries.
    ///
    /// Lookups only evict the entry they hit, so tokens that are never
    /// presented again are dropped here.
    pub fn evict_expired(&self) {
        let now = Instant::now();
        self.cache.retain(|_, entry| now < entry.expires_at);
    }

    fn get(&self, token: &str) -> Option<Arc<TokenInfo>> {
        let entry = self.cache.get(token)?;
        if Instant::now() < entry.expires_at {
            return Some(Arc::clone(&entry.info));
        }
        // Drop the read guard before removing.
        drop(entry);
        self.cache.remove(token);
        None
    }

    fn store(&self, token: &str, info: &TokenInfo) {
        let mut lifetime = self.ttl;
        if info.expires_at > 0 {
            let remaining_ms = info.expires_at.saturating_mul(1000)
                - chrono::Utc::now().timestamp_millis();
            if remaining_ms <= 0 {
                return;
            }
            lifetime = lifetime.min(Duration::from_millis(remaining_ms as u64));
        }

        if self.cache.len() >= self.sweep_threshold {
            self.evict_expired();
        }

        self.cache.insert(
            token.to_string(),
            Arc::new(CacheEntry {
                info: Arc::new(info.clone()),
                expires_at: Instant::now() + lifetime,
            }),
        );
    }
}

#[async_trait]
impl<V: TokenVerifier> TokenVerifier for CachingVerifier<V> {
    async fn verify(&self, token: &str) -> Result<TokenInfo, VerifyError> {
        if let Some(info) = self.get(token) {
            return Ok((*info).clone());
        }

        let info = self.inner.verify(token).await?;
        self.store(token, &info);
        Ok(info)
    }
}
