// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token authentication for an MCP resource server.
//!
//! ## Auth Flow
//!
//! 1. Client obtains an access token from the authorization server
//! 2. Client sends `Authorization: Bearer <token>`
//! 3. Resource server:
//!    - Verifies the token, either locally against the issuer's JWKS
//!      (OIDC discovery) or remotely via RFC 7662 introspection
//!    - Checks audience and required scopes
//!    - Attaches the resulting [`TokenInfo`] to the request
//! 4. Unauthenticated requests get a 401 whose `WWW-Authenticate` header
//!    points at the RFC 9728 metadata document
//!
//! ## Security
//!
//! - Successful verifications are cached, never past the token's `exp`
//! - Failed verifications are never cached
//! - Clients only see the generic error code, causes go to debug logs
//! - Clock skew tolerance is 60 seconds

pub mod cache;
pub mod claims;
pub mod config;
pub mod error;
pub mod extractor;
pub mod introspection;
pub mod jwks;
pub mod metadata;
pub mod middleware;
pub mod oidc;
pub mod verifier;

pub use cache::CachingVerifier;
pub use claims::TokenInfo;
pub use config::{ConfigError, OAuthConfig};
pub use error::{AuthError, VerifyError};
pub use extractor::Authenticated;
pub use introspection::IntrospectionVerifier;
pub use jwks::JwksManager;
pub use metadata::{metadata_url, ProtectedResourceMetadata, METADATA_PATH};
pub use middleware::{bearer_auth, require_scopes, BearerAuth, RequiredScopes};
pub use oidc::OidcVerifier;
pub use verifier::{build_verifier, TokenVerifier};
