// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::Authenticated;

/// Tools exposed to callers holding the `mcp:tools` scope.
const TOOLS: &[(&str, &str)] = &[("whoami", "Describe the identity of the calling token")];

#[derive(Debug, Serialize, ToSchema)]
pub struct Tool {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToolsResponse {
    /// Subject the listing was produced for, empty when anonymous.
    pub subject: String,
    pub tools: Vec<Tool>,
}

/// List the available tools.
#[utoipa::path(
    get,
    path = "/v1/tools",
    tag = "Tools",
    security(("bearer" = ["mcp:tools"])),
    responses(
        (status = 200, description = "Tool catalogue", body = ToolsResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Token lacks the mcp:tools scope")
    )
)]
pub async fn list_tools(auth: Option<Authenticated>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        subject: auth.map(|Authenticated(info)| info.subject).unwrap_or_default(),
        tools: TOOLS
            .iter()
            .map(|(name, description)| Tool {
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect(),
    })
}
