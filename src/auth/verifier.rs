// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The token verification contract and strategy selection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::cache::CachingVerifier;
use super::claims::TokenInfo;
use super::config::OAuthConfig;
use super::error::VerifyError;
use super::introspection::IntrospectionVerifier;
use super::oidc::OidcVerifier;

/// Timeout applied to every outbound call to the authorization server.
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Validates an access token and extracts its identity.
///
/// Implementations must return an error rather than a partial [`TokenInfo`]
/// when any check fails. Dropping the returned future cancels any in-flight
/// network call.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<TokenInfo, VerifyError>;
}

#[async_trait]
impl<V: TokenVerifier + ?Sized> TokenVerifier for Arc<V> {
    async fn verify(&self, token: &str) -> Result<TokenInfo, VerifyError> {
        (**self).verify(token).await
    }
}

/// Build the verifier selected by `config`.
///
/// Introspection is used when an endpoint is configured, OIDC otherwise.
/// Either way the result is wrapped in a [`CachingVerifier`].
pub fn build_verifier(config: &OAuthConfig) -> Result<Arc<dyn TokenVerifier>, VerifyError> {
    let ttl = config.effective_cache_ttl();
    let verifier: Arc<dyn TokenVerifier> = if config.uses_introspection() {
        tracing::info!(
            endpoint = config.introspection_endpoint.as_deref().unwrap_or_default(),
            "using token introspection"
        );
        Arc::new(CachingVerifier::new(IntrospectionVerifier::new(config.clone())?, ttl))
    } else {
        tracing::info!(issuer = %config.issuer, "using OIDC token verification");
        Arc::new(CachingVerifier::new(OidcVerifier::new(config.clone())?, ttl))
    };
    Ok(verifier)
}

/// HTTP client shared by the verifiers for calls to the authorization server.
pub(crate) fn http_client(config: &OAuthConfig) -> Result<reqwest::Client, VerifyError> {
    if config.insecure_skip_verify {
        tracing::warn!("TLS certificate verification is disabled for the authorization server");
    }
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .danger_accept_invalid_certs(config.insecure_skip_verify)
        .build()
        .map_err(|e| VerifyError::HttpClient(e.to_string()))
}

/// Checks applied after any strategy has produced a [`TokenInfo`]:
/// expected audience and required scopes.
pub(crate) fn check_token_info(info: &TokenInfo, config: &OAuthConfig) -> Result<(), VerifyError> {
    if !config.audience.is_empty() && !info.has_audience(&config.audience) {
        return Err(VerifyError::AudienceMismatch {
            got: info.audience.iter().cloned().collect(),
            want: config.audience.clone(),
        });
    }

    if !config.required_scopes.is_empty() && !info.has_all_scopes(config.required_scopes.as_slice())
    {
        return Err(VerifyError::MissingScopes {
            has: info.scopes.iter().cloned().collect(),
            requires: config.required_scopes.clone(),
        });
    }

    Ok(())
}
