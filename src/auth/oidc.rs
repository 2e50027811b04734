// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local JWT validation against an OIDC provider's published keys.
//!
//! Provider discovery (`/.well-known/openid-configuration` plus the JWKS it
//! points to) happens lazily on the first verification and exactly once per
//! verifier: concurrent first callers wait on the same attempt, and the
//! outcome is kept for the verifier's lifetime. A failed discovery is not
//! retried; every later verification reports the stored error.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use super::claims::{parse_scope, Audience, TokenInfo};
use super::config::OAuthConfig;
use super::error::VerifyError;
use super::jwks::JwksManager;
use super::verifier::{check_token_info, http_client, TokenVerifier};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// The subset of the discovery document this verifier needs.
#[derive(Debug, Deserialize)]
struct ProviderMetadata {
    issuer: String,
    jwks_uri: String,
}

/// A discovered OIDC provider.
struct Provider {
    issuer: String,
    jwks: JwksManager,
}

/// Claims read from an access token. Everything else lands in `extra`.
///
/// Members are optional so that an explicit `null` reads as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AccessTokenClaims {
    sub: Option<String>,
    aud: Option<Audience>,
    /// Authorized party (Keycloak and most OIDC providers).
    azp: Option<String>,
    client_id: Option<String>,
    scope: Option<String>,
    iat: Option<i64>,
    exp: Option<i64>,
    iss: Option<String>,
}

/// Validates tokens using OIDC discovery and JWT signature checks.
pub struct OidcVerifier {
    config: OAuthConfig,
    client: reqwest::Client,
    provider: OnceCell<Result<Arc<Provider>, String>>,
}

impl OidcVerifier {
    pub fn new(config: OAuthConfig) -> Result<Self, VerifyError> {
        let client = http_client(&config)?;
        Ok(Self {
            config,
            client,
            provider: OnceCell::new(),
        })
    }

    /// Run provider discovery if it has not happened yet.
    ///
    /// Idempotent. If the discovering caller is cancelled before it finishes,
    /// the next caller starts a fresh attempt; only a completed attempt is
    /// stored.
    pub async fn ensure_initialized(&self) -> Result<(), VerifyError> {
        self.provider().await.map(|_| ())
    }

    async fn provider(&self) -> Result<Arc<Provider>, VerifyError> {
        let outcome = self
            .provider
            .get_or_init(|| async {
                match self.discover().await {
                    Ok(provider) => {
                        tracing::info!(
                            issuer = %provider.issuer,
                            jwks_uri = %provider.jwks.jwks_uri(),
                            "OIDC provider discovered"
                        );
                        Ok(Arc::new(provider))
                    }
                    Err(e) => {
                        tracing::error!(issuer = %self.config.issuer, error = %e, "OIDC discovery failed");
                        Err(e)
                    }
                }
            })
            .await;

        outcome.clone().map_err(VerifyError::Discovery)
    }

    async fn discover(&self) -> Result<Provider, String> {
        let url = format!("{}{DISCOVERY_PATH}", self.config.issuer.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("fetching {url}: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("HTTP {} from {url}", response.status()));
        }

        let metadata: ProviderMetadata = response
            .json()
            .await
            .map_err(|e| format!("decoding provider metadata: {e}"))?;

        if !self.config.skip_issuer_check && metadata.issuer != self.config.issuer {
            return Err(format!(
                "issuer did not match the issuer returned by provider, expected {:?} got {:?}",
                self.config.issuer, metadata.issuer
            ));
        }

        let jwks = JwksManager::new(metadata.jwks_uri, self.client.clone());
        jwks.refresh().await.map_err(|e| e.to_string())?;

        Ok(Provider {
            issuer: metadata.issuer,
            jwks,
        })
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_nbf = true;
        // Audience is matched after decoding, tolerating a trailing slash.
        validation.validate_aud = false;
        if !self.config.skip_issuer_check {
            // `set_issuer` alone lets a token without `iss` through.
            validation.set_required_spec_claims(&["exp", "iss"]);
            validation.set_issuer(&[&self.config.issuer]);
        }
        validation
    }

    /// Signature, expiry, not-before and issuer checks.
    async fn decode_claims(
        &self,
        provider: &Provider,
        token: &str,
    ) -> Result<Map<String, Value>, VerifyError> {
        let header = decode_header(token)?;
        if !is_asymmetric(header.alg) {
            return Err(jsonwebtoken::errors::Error::from(ErrorKind::InvalidAlgorithm).into());
        }

        let keys = provider.jwks.resolve(header.kid.as_deref()).await?;
        let validation = self.validation(header.alg);

        let mut last_err = None;
        for resolved in keys
            .iter()
            .filter(|k| k.algorithm.is_none_or(|alg| alg == header.alg))
        {
            match decode::<Map<String, Value>>(token, &resolved.key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.map_or(VerifyError::NoMatchingKey, VerifyError::from))
    }
}

#[async_trait]
impl TokenVerifier for OidcVerifier {
    async fn verify(&self, token: &str) -> Result<TokenInfo, VerifyError> {
        let provider = self.provider().await?;
        let claims = self.decode_claims(&provider, token).await?;
        let info = token_info_from_claims(claims)?;
        check_token_info(&info, &self.config)?;
        Ok(info)
    }
}

fn is_asymmetric(alg: Algorithm) -> bool {
    !matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Map a verified claim set onto [`TokenInfo`], keeping every claim in `extra`.
fn token_info_from_claims(claims: Map<String, Value>) -> Result<TokenInfo, VerifyError> {
    let parsed: AccessTokenClaims = serde_json::from_value(Value::Object(claims.clone()))
        .map_err(|e| VerifyError::Claims(e.to_string()))?;

    let client_id = parsed
        .azp
        .filter(|azp| !azp.is_empty())
        .or(parsed.client_id)
        .unwrap_or_default();

    Ok(TokenInfo {
        subject: parsed.sub.unwrap_or_default(),
        client_id,
        scopes: parse_scope(parsed.scope.as_deref().unwrap_or_default()),
        audience: parsed.aud.map(Audience::into_set).unwrap_or_default(),
        expires_at: parsed.exp.unwrap_or_default(),
        issued_at: parsed.iat.unwrap_or_default(),
        issuer: parsed.iss.unwrap_or_default(),
        extra: claims,
    })
}
