// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware::from_fn_with_state,
    routing::{any, get},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        bearer_auth,
        metadata::{self, ProtectedResourceMetadata, METADATA_PATH},
        require_scopes, RequiredScopes, TokenInfo,
    },
    state::AppState,
};

pub mod health;
pub mod identity;
pub mod tools;

/// Scope required by the tool routes.
pub const TOOLS_SCOPE: &str = "mcp:tools";

pub fn router(state: AppState) -> Router {
    let v1_routes = match state.bearer_auth() {
        Some(auth) => Router::new()
            .route("/whoami", get(identity::whoami))
            .route(
                "/tools",
                get(tools::list_tools).layer(from_fn_with_state(
                    RequiredScopes::new([TOOLS_SCOPE]),
                    require_scopes,
                )),
            )
            .layer(from_fn_with_state(auth, bearer_auth)),
        None => {
            tracing::warn!("OAuth is disabled, /v1 routes are unauthenticated");
            Router::new()
                .route("/whoami", get(identity::whoami))
                .route("/tools", get(tools::list_tools))
        }
    };

    Router::new()
        .nest("/v1", v1_routes)
        .route(METADATA_PATH, any(metadata::protected_resource_metadata))
        .route("/health", get(health::health))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        metadata::protected_resource_metadata,
        health::health,
        identity::whoami,
        tools::list_tools
    ),
    components(
        schemas(
            ProtectedResourceMetadata,
            TokenInfo,
            health::HealthResponse,
            tools::Tool,
            tools::ToolsResponse
        )
    ),
    tags(
        (name = "OAuth", description = "Protected resource metadata (RFC 9728)"),
        (name = "Health", description = "Liveness"),
        (name = "Identity", description = "Caller identity"),
        (name = "Tools", description = "Tool catalogue")
    )
)]
pub struct ApiDoc;
