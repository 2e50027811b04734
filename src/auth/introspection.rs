// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth 2.0 Token Introspection (RFC 7662).
//!
//! The authorization server is the source of truth: no local signature
//! check is performed, `active` is the trust signal.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::claims::{normalize_audience, parse_scope, TokenInfo};
use super::config::OAuthConfig;
use super::error::VerifyError;
use super::verifier::{check_token_info, http_client, TokenVerifier};

/// Introspection response members mapped onto [`TokenInfo`].
///
/// Every member is optional and an explicit `null` reads as absent.
/// Anything else the server returns is kept in `extra`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IntrospectionResponse {
    active: Option<bool>,
    scope: Option<String>,
    client_id: Option<String>,
    exp: Option<i64>,
    iat: Option<i64>,
    sub: Option<String>,
    aud: Option<Value>,
    iss: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Validates tokens by asking the authorization server.
pub struct IntrospectionVerifier {
    config: OAuthConfig,
    endpoint: String,
    client: reqwest::Client,
}

impl IntrospectionVerifier {
    pub fn new(config: OAuthConfig) -> Result<Self, VerifyError> {
        let endpoint = config.introspection_endpoint.clone().ok_or_else(|| {
            VerifyError::HttpClient("introspection endpoint not configured".to_string())
        })?;
        let client = http_client(&config)?;
        Ok(Self {
            config,
            endpoint,
            client,
        })
    }

    async fn introspect(&self, token: &str) -> Result<IntrospectionResponse, VerifyError> {
        let form = [
            ("token", token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(VerifyError::IntrospectionStatus(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| VerifyError::IntrospectionResponse(e.to_string()))
    }
}

#[async_trait]
impl TokenVerifier for IntrospectionVerifier {
    async fn verify(&self, token: &str) -> Result<TokenInfo, VerifyError> {
        let ir = self.introspect(token).await?;

        if !ir.active.unwrap_or_default() {
            return Err(VerifyError::Inactive);
        }

        let audience = normalize_audience(ir.aud.as_ref()).map_err(|_| {
            VerifyError::IntrospectionResponse(format!(
                "unexpected type for audience claim: {}",
                json_type(ir.aud.as_ref())
            ))
        })?;

        let info = TokenInfo {
            subject: ir.sub.unwrap_or_default(),
            client_id: ir.client_id.unwrap_or_default(),
            scopes: parse_scope(ir.scope.as_deref().unwrap_or_default()),
            audience,
            expires_at: ir.exp.unwrap_or_default(),
            issued_at: ir.iat.unwrap_or_default(),
            issuer: ir.iss.unwrap_or_default(),
            extra: ir.extra,
        };

        check_token_info(&info, &self.config)?;
        Ok(info)
    }
}

fn json_type(value: Option<&Value>) -> &'static str {
    match value {
        None | Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}
