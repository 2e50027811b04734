// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth resource-server configuration and validation.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::config::{
    parse_flag, DEFAULT_PORT, OAUTH_AUDIENCE_ENV, OAUTH_CACHE_TTL_ENV, OAUTH_CLIENT_ID_ENV,
    OAUTH_CLIENT_SECRET_ENV, OAUTH_ENABLED_ENV, OAUTH_INSECURE_ENV,
    OAUTH_INTROSPECTION_ENDPOINT_ENV, OAUTH_ISSUER_ENV, OAUTH_RESOURCE_DOCUMENTATION_ENV,
    OAUTH_RESOURCE_NAME_ENV, OAUTH_RESOURCE_URL_ENV, OAUTH_SCOPES_ENV,
    OAUTH_SKIP_ISSUER_CHECK_ENV, PORT_ENV,
};

/// Default TTL for verified tokens held by the caching verifier (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Configuration validation failure.
///
/// Every violated rule is reported, not just the first one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("oauth config validation failed: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl ConfigError {
    /// The individual rule violations.
    pub fn violations(&self) -> &[String] {
        match self {
            ConfigError::Invalid(errs) => errs,
        }
    }
}

/// OAuth 2.1 configuration for the MCP resource server.
///
/// Immutable once loaded. When `enabled` is false nothing else is consulted.
#[derive(Clone, Default)]
pub struct OAuthConfig {
    /// Whether bearer token authentication is active.
    pub enabled: bool,
    /// OAuth2/OIDC issuer URL (e.g. `https://auth.example.com/realms/master`).
    pub issuer: String,
    /// Expected `aud` claim. Usually the MCP server URL.
    pub audience: String,
    /// Client ID used to authenticate introspection calls.
    pub client_id: String,
    /// Client secret used to authenticate introspection calls.
    pub client_secret: String,
    /// Scopes every token must carry. Order is irrelevant.
    pub required_scopes: Vec<String>,
    /// RFC 7662 endpoint. When set, tokens are introspected instead of
    /// validated locally.
    pub introspection_endpoint: Option<String>,
    /// Public URL of this resource server.
    pub resource_server_url: String,
    pub resource_name: Option<String>,
    pub resource_documentation: Option<String>,
    /// Disable `iss` validation. Development only.
    pub skip_issuer_check: bool,
    /// Disable TLS certificate verification. Development only.
    pub insecure_skip_verify: bool,
    /// TTL of the verified-token cache. Zero falls back to [`DEFAULT_CACHE_TTL`].
    pub cache_ttl: Duration,
    /// Values that could not be parsed by [`OAuthConfig::from_lookup`].
    /// Reported by [`OAuthConfig::validate`].
    pub invalid_settings: Vec<String>,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("enabled", &self.enabled)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &if self.client_secret.is_empty() { "" } else { "[REDACTED]" },
            )
            .field("required_scopes", &self.required_scopes)
            .field("introspection_endpoint", &self.introspection_endpoint)
            .field("resource_server_url", &self.resource_server_url)
            .field("resource_name", &self.resource_name)
            .field("resource_documentation", &self.resource_documentation)
            .field("skip_issuer_check", &self.skip_issuer_check)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("cache_ttl", &self.cache_ttl)
            .field("invalid_settings", &self.invalid_settings)
            .finish()
    }
}

impl OAuthConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset. Without an audience, both the
    /// audience and the resource URL default to `http://localhost:{PORT}`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let explicit_resource_url = get(OAUTH_RESOURCE_URL_ENV);
        let audience = get(OAUTH_AUDIENCE_ENV)
            .or_else(|| explicit_resource_url.clone())
            .unwrap_or_else(|| {
                let port = get(PORT_ENV)
                    .and_then(|p| p.parse::<u16>().ok())
                    .unwrap_or(DEFAULT_PORT);
                format!("http://localhost:{port}")
            });
        let resource_server_url = explicit_resource_url.unwrap_or_else(|| audience.clone());

        let mut invalid_settings = Vec::new();
        let cache_ttl = match get(OAUTH_CACHE_TTL_ENV) {
            None => DEFAULT_CACHE_TTL,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => {
                    invalid_settings.push(format!(
                        "{OAUTH_CACHE_TTL_ENV} must be a whole number of seconds, got {raw:?}"
                    ));
                    DEFAULT_CACHE_TTL
                }
            },
        };

        Self {
            enabled: get(OAUTH_ENABLED_ENV).is_some_and(|v| parse_flag(&v)),
            issuer: get(OAUTH_ISSUER_ENV).unwrap_or_default(),
            audience,
            client_id: get(OAUTH_CLIENT_ID_ENV).unwrap_or_default(),
            client_secret: get(OAUTH_CLIENT_SECRET_ENV).unwrap_or_default(),
            required_scopes: get(OAUTH_SCOPES_ENV)
                .map(|s| parse_scopes(&s))
                .unwrap_or_default(),
            introspection_endpoint: get(OAUTH_INTROSPECTION_ENDPOINT_ENV),
            resource_server_url,
            resource_name: get(OAUTH_RESOURCE_NAME_ENV),
            resource_documentation: get(OAUTH_RESOURCE_DOCUMENTATION_ENV),
            skip_issuer_check: get(OAUTH_SKIP_ISSUER_CHECK_ENV).is_some_and(|v| parse_flag(&v)),
            insecure_skip_verify: get(OAUTH_INSECURE_ENV).is_some_and(|v| parse_flag(&v)),
            cache_ttl,
            invalid_settings,
        }
    }

    /// Check the configuration for required fields and consistency.
    ///
    /// Always succeeds when authentication is disabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        let mut errs = self.invalid_settings.clone();

        if self.issuer.is_empty() {
            errs.push("issuer is required when OAuth is enabled".to_string());
        } else if Url::parse(&self.issuer).is_err() {
            errs.push("issuer must be a valid URL".to_string());
        }

        if self.audience.is_empty() {
            errs.push("audience is required when OAuth is enabled".to_string());
        }

        if self.resource_server_url.is_empty() {
            errs.push("resource_server_url is required when OAuth is enabled".to_string());
        } else if Url::parse(&self.resource_server_url).is_err() {
            errs.push("resource_server_url must be a valid URL".to_string());
        }

        if let Some(endpoint) = &self.introspection_endpoint {
            if self.client_id.is_empty() || self.client_secret.is_empty() {
                errs.push(
                    "client_id and client_secret are required when using introspection"
                        .to_string(),
                );
            }
            if Url::parse(endpoint).is_err() {
                errs.push("introspection_endpoint must be a valid URL".to_string());
            }
        }

        if errs.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errs))
        }
    }

    /// Whether tokens are verified by remote introspection rather than OIDC.
    pub fn uses_introspection(&self) -> bool {
        self.introspection_endpoint.is_some()
    }

    /// Cache TTL with the zero value normalized to the default.
    pub fn effective_cache_ttl(&self) -> Duration {
        if self.cache_ttl.is_zero() {
            DEFAULT_CACHE_TTL
        } else {
            self.cache_ttl
        }
    }
}

/// Parse the comma-separated external scope list.
///
/// Entries are trimmed and empty entries dropped.
pub fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
