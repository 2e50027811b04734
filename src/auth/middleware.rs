// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token middleware for Axum (RFC 6750).
//!
//! ## Usage
//!
//! ```rust,ignore
//! let auth = BearerAuth::new(verifier, &config.resource_server_url);
//!
//! let app = Router::new()
//!     .route("/tools", get(list_tools))
//!     .layer(from_fn_with_state(RequiredScopes::new(["mcp:tools"]), require_scopes))
//!     .layer(from_fn_with_state(auth, bearer_auth));
//! ```
//!
//! On success the verified [`TokenInfo`] is inserted into the request
//! extensions, where [`Authenticated`](super::extractor::Authenticated) and
//! [`require_scopes`] pick it up.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::claims::TokenInfo;
use super::error::AuthError;
use super::metadata::{metadata_url, METADATA_PATH};
use super::verifier::TokenVerifier;

const BEARER_PREFIX: &str = "Bearer ";

/// State of the [`bearer_auth`] middleware.
#[derive(Clone)]
pub struct BearerAuth {
    verifier: Arc<dyn TokenVerifier>,
    metadata_url: Arc<str>,
}

impl BearerAuth {
    /// `resource_server_url` is the base the metadata URL is derived from.
    pub fn new(verifier: Arc<dyn TokenVerifier>, resource_server_url: &str) -> Self {
        Self {
            verifier,
            metadata_url: metadata_url(resource_server_url).into(),
        }
    }

    pub fn metadata_url(&self) -> &str {
        &self.metadata_url
    }
}

/// Extract the bearer token from the `Authorization` header.
///
/// An absent header yields `Ok(None)`. A header without the case-sensitive
/// `Bearer ` scheme, or one carrying only whitespace, is an error.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<String>, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .ok_or(AuthError::InvalidRequest(
            "authorization header must use Bearer scheme",
        ))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidRequest("bearer token is empty"));
    }

    Ok(Some(token.to_string()))
}

/// Authenticate the request or answer with a 401 challenge.
pub async fn bearer_auth(
    State(auth): State<BearerAuth>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == METADATA_PATH {
        return next.run(request).await;
    }

    let token = match extract_bearer_token(request.headers()) {
        Ok(Some(token)) => token,
        Ok(None) => {
            tracing::debug!(path = %request.uri().path(), "request without bearer token");
            return AuthError::MissingToken.into_challenge(&auth.metadata_url);
        }
        Err(e) => {
            tracing::debug!(error = %e, "malformed authorization header");
            return e.into_challenge(&auth.metadata_url);
        }
    };

    match auth.verifier.verify(&token).await {
        Ok(info) => {
            tracing::debug!(
                subject = %info.subject,
                client_id = %info.client_id,
                scopes = ?info.scopes,
                "token verified"
            );
            request.extensions_mut().insert(info);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "token verification failed");
            AuthError::InvalidToken(e).into_challenge(&auth.metadata_url)
        }
    }
}

/// State of the [`require_scopes`] middleware.
#[derive(Clone, Debug)]
pub struct RequiredScopes(Arc<[String]>);

impl RequiredScopes {
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(scopes.into_iter().map(Into::into).collect())
    }

    pub fn scopes(&self) -> &[String] {
        &self.0
    }
}

/// Require every listed scope on an already-authenticated request.
///
/// Must run inside [`bearer_auth`]. Without a [`TokenInfo`] the request is
/// answered with 401, with missing scopes 403.
pub async fn require_scopes(
    State(required): State<RequiredScopes>,
    request: Request,
    next: Next,
) -> Response {
    let Some(info) = request.extensions().get::<TokenInfo>() else {
        return AuthError::AuthenticationRequired.into_response();
    };

    if !info.has_all_scopes(required.scopes()) {
        tracing::debug!(
            subject = %info.subject,
            has = ?info.scopes,
            requires = ?required.scopes(),
            "insufficient scope"
        );
        return AuthError::InsufficientScope.into_response();
    }

    next.run(request).await
}
