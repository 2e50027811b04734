// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! [`VerifyError`] is what a verifier returns; it carries the precise cause
//! for logs. [`AuthError`] is the request-level outcome the middleware turns
//! into an RFC 6750 response, exposing only the generic error code.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failure to verify an access token.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// OIDC provider discovery failed. Sticky for the verifier's lifetime.
    #[error("failed to create OIDC provider: {0}")]
    Discovery(String),

    #[error("failed to fetch JWKS: {0}")]
    JwksFetch(String),

    #[error("no matching key found in JWKS")]
    NoMatchingKey,

    #[error("unsupported key in JWKS: {0}")]
    UnsupportedKey(String),

    /// Signature, expiry, not-before or issuer check failed.
    #[error("token verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("failed to parse token claims: {0}")]
    Claims(String),

    #[error("token audience does not match expected audience: got {got:?}, want {want}")]
    AudienceMismatch { got: Vec<String>, want: String },

    #[error("token missing required scopes: has {has:?}, requires {requires:?}")]
    MissingScopes {
        has: Vec<String>,
        requires: Vec<String>,
    },

    #[error("token is not active")]
    Inactive,

    #[error("introspection request failed: {0}")]
    IntrospectionRequest(#[from] reqwest::Error),

    #[error("introspection returned status {0}")]
    IntrospectionStatus(u16),

    #[error("failed to parse introspection response: {0}")]
    IntrospectionResponse(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Request-level authentication outcome.
#[derive(Debug)]
pub enum AuthError {
    /// No `Authorization` header, or an empty bearer token.
    MissingToken,
    /// `Authorization` header present but not a usable bearer credential.
    InvalidRequest(&'static str),
    /// The verifier rejected the token.
    InvalidToken(VerifyError),
    /// A scope check ran without an authenticated identity.
    AuthenticationRequired,
    /// Authenticated, but the token lacks a required scope.
    InsufficientScope,
}

#[derive(Serialize)]
struct AuthErrorBody<'a> {
    error: &'a str,
    error_description: &'a str,
}

impl AuthError {
    /// RFC 6750 error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken | AuthError::InvalidRequest(_) => "invalid_request",
            AuthError::InvalidToken(_) | AuthError::AuthenticationRequired => "invalid_token",
            AuthError::InsufficientScope => "insufficient_scope",
        }
    }

    /// Client-facing description. Never reveals which verification check failed.
    pub fn description(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Bearer token required",
            AuthError::InvalidRequest(reason) => *reason,
            AuthError::InvalidToken(_) => "Token verification failed",
            AuthError::AuthenticationRequired => "Authentication required",
            AuthError::InsufficientScope => "Insufficient scope",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InsufficientScope => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Build the `WWW-Authenticate` challenge (RFC 6750 §3, RFC 9728 §5.1).
    pub fn www_authenticate(&self, metadata_url: &str) -> String {
        format!(
            r#"Bearer realm="mcp", resource_metadata="{metadata_url}", error="{}", error_description="{}""#,
            self.error_code(),
            self.description()
        )
    }

    /// The 401 response the bearer middleware sends: challenge header plus
    /// a JSON error body.
    pub fn into_challenge(self, metadata_url: &str) -> Response {
        let challenge = self.www_authenticate(metadata_url);
        let body = Json(AuthErrorBody {
            error: self.error_code(),
            error_description: self.description(),
        });
        let mut response = (StatusCode::UNAUTHORIZED, body).into_response();
        match HeaderValue::from_str(&challenge) {
            Ok(value) => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
            Err(e) => tracing::warn!(error = %e, "WWW-Authenticate value is not a valid header"),
        }
        response
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken(e) => write!(f, "{}: {e}", self.description()),
            _ => f.write_str(self.description()),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::InvalidToken(e) => Some(e),
            _ => None,
        }
    }
}

/// Plain-text response, as used by the scope-check layer.
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status_code(), self.description()).into_response()
    }
}
