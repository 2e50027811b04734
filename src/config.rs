// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `MCP_OAUTH_ENABLED` | Enable bearer token authentication | `false` |
//! | `MCP_OAUTH_ISSUER` | OAuth2/OIDC issuer URL | Required when enabled |
//! | `MCP_OAUTH_AUDIENCE` | Expected token audience | Resource URL, else `http://localhost:{PORT}` |
//! | `MCP_OAUTH_CLIENT_ID` | Client ID for token introspection | Optional |
//! | `MCP_OAUTH_CLIENT_SECRET` | Client secret for token introspection | Optional |
//! | `MCP_OAUTH_SCOPES` | Required scopes, comma-separated | Empty |
//! | `MCP_OAUTH_INTROSPECTION_ENDPOINT` | RFC 7662 endpoint (selects introspection) | Unset |
//! | `MCP_OAUTH_RESOURCE_URL` | Public URL of this resource server | Audience |
//! | `MCP_OAUTH_RESOURCE_NAME` | Human-readable resource name | Unset |
//! | `MCP_OAUTH_RESOURCE_DOCUMENTATION` | Developer documentation URL | Unset |
//! | `MCP_OAUTH_SKIP_ISSUER_CHECK` | Skip `iss` validation (development only) | `false` |
//! | `MCP_OAUTH_INSECURE` | Skip TLS certificate checks (development only) | `false` |
//! | `MCP_OAUTH_CACHE_TTL_SECS` | Verified-token cache TTL in whole seconds | `300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

/// Environment variable name for the server bind host.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 8080;

pub const OAUTH_ENABLED_ENV: &str = "MCP_OAUTH_ENABLED";
pub const OAUTH_ISSUER_ENV: &str = "MCP_OAUTH_ISSUER";
pub const OAUTH_AUDIENCE_ENV: &str = "MCP_OAUTH_AUDIENCE";
pub const OAUTH_CLIENT_ID_ENV: &str = "MCP_OAUTH_CLIENT_ID";
pub const OAUTH_CLIENT_SECRET_ENV: &str = "MCP_OAUTH_CLIENT_SECRET";
pub const OAUTH_SCOPES_ENV: &str = "MCP_OAUTH_SCOPES";
pub const OAUTH_INTROSPECTION_ENDPOINT_ENV: &str = "MCP_OAUTH_INTROSPECTION_ENDPOINT";
pub const OAUTH_RESOURCE_URL_ENV: &str = "MCP_OAUTH_RESOURCE_URL";
pub const OAUTH_RESOURCE_NAME_ENV: &str = "MCP_OAUTH_RESOURCE_NAME";
pub const OAUTH_RESOURCE_DOCUMENTATION_ENV: &str = "MCP_OAUTH_RESOURCE_DOCUMENTATION";
pub const OAUTH_SKIP_ISSUER_CHECK_ENV: &str = "MCP_OAUTH_SKIP_ISSUER_CHECK";
pub const OAUTH_INSECURE_ENV: &str = "MCP_OAUTH_INSECURE";
pub const OAUTH_CACHE_TTL_ENV: &str = "MCP_OAUTH_CACHE_TTL_SECS";

/// Environment variable selecting the log output format.
///
/// `json` enables structured JSON lines; anything else uses the pretty
/// human-readable formatter.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter when none is set.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Parse a boolean toggle from its environment representation.
///
/// Accepts `1`, `true`, `yes` and `on` (case-insensitive); everything else is
/// `false`.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
