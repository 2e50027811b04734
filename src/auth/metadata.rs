// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth 2.0 Protected Resource Metadata (RFC 9728).
//!
//! Served unauthenticated at [`METADATA_PATH`] so clients can discover which
//! authorization server to obtain a token from. The bearer challenge points
//! here through its `resource_metadata` parameter.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::config::OAuthConfig;

/// Well-known path of the metadata document.
pub const METADATA_PATH: &str = "/.well-known/oauth-protected-resource";

/// Scope advertised when no required scopes are configured.
pub const DEFAULT_SCOPE: &str = "mcp:tools";

const CACHE_CONTROL: &str = "public, max-age=3600";

/// RFC 9728 §2 metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProtectedResourceMetadata {
    /// Resource server identifier URL.
    pub resource: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorization_servers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes_supported: Vec<String>,

    /// Only the `Authorization` header is supported.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bearer_methods_supported: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_documentation: Option<String>,
}

impl ProtectedResourceMetadata {
    pub fn from_config(config: &OAuthConfig) -> Self {
        let scopes_supported = if config.required_scopes.is_empty() {
            vec![DEFAULT_SCOPE.to_string()]
        } else {
            config.required_scopes.clone()
        };

        Self {
            resource: config.resource_server_url.clone(),
            authorization_servers: vec![config.issuer.clone()],
            scopes_supported,
            bearer_methods_supported: vec!["header".to_string()],
            resource_name: config.resource_name.clone(),
            resource_documentation: config.resource_documentation.clone(),
        }
    }
}

/// Absolute URL of the metadata document for a resource server base URL.
pub fn metadata_url(base_url: &str) -> String {
    format!("{}{METADATA_PATH}", base_url.trim_end_matches('/'))
}

/// Protected resource metadata handler.
///
/// Mounted with `any` so that non-GET methods get a 405 carrying `Allow: GET`.
#[utoipa::path(
    get,
    path = "/.well-known/oauth-protected-resource",
    tag = "OAuth",
    responses(
        (status = 200, description = "Protected resource metadata", body = ProtectedResourceMetadata),
        (status = 405, description = "Only GET is allowed")
    )
)]
pub async fn protected_resource_metadata(
    method: Method,
    State(metadata): State<Arc<ProtectedResourceMetadata>>,
) -> Response {
    if method != Method::GET {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, HeaderValue::from_static("GET"))],
        )
            .into_response();
    }

    (
        [(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL))],
        Json(metadata.as_ref()),
    )
        .into_response()
}
