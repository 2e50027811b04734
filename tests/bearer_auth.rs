// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end tests of the HTTP surface: bearer middleware, scope layer and
//! metadata endpoint, with mock authorization servers behind both
//! verification strategies.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mcp_resource_auth::{
    api::router,
    auth::{OAuthConfig, METADATA_PATH},
    state::AppState,
};

const AUDIENCE: &str = "https://mcp.example.com";
const METADATA_URL: &str = "https://mcp.example.com/.well-known/oauth-protected-resource";

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn sign(claims: &Value) -> String {
    let key = EncodingKey::from_ec_pem(include_bytes!("fixtures/ec_private.pem")).unwrap();
    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some("test-key-1".to_string());
    jsonwebtoken::encode(&header, claims, &key).unwrap()
}

/// Mock OIDC provider: discovery document plus JWKS.
async fn oidc_provider() -> MockServer {
    let server = MockServer::start().await;
    let jwk: Value =
        serde_json::from_str(include_str!("fixtures/ec_public.jwk.json")).unwrap();
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": server.uri(),
            "jwks_uri": format!("{}/jwks", server.uri()),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [jwk] })))
        .mount(&server)
        .await;
    server
}

/// Mock introspection endpoint answering every request with `body`.
async fn introspection_server(body: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/introspect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

fn oidc_config(issuer: &str) -> OAuthConfig {
    OAuthConfig {
        enabled: true,
        issuer: issuer.to_string(),
        audience: AUDIENCE.to_string(),
        resource_server_url: AUDIENCE.to_string(),
        ..Default::default()
    }
}

fn introspection_config(server: &MockServer) -> OAuthConfig {
    OAuthConfig {
        introspection_endpoint: Some(format!("{}/introspect", server.uri())),
        client_id: "mcp-server".to_string(),
        client_secret: "s3cret".to_string(),
        ..oidc_config("https://auth.example.com")
    }
}

fn app(config: OAuthConfig) -> Router {
    config.validate().unwrap();
    router(AppState::new(config).unwrap())
}

async fn get(app: Router, uri: &str, token: Option<&str>) -> Response {
    let mut request = Request::get(uri);
    if let Some(value) = token {
        request = request.header(header::AUTHORIZATION, value);
    }
    app.oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn challenge(response: &Response) -> String {
    response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .expect("WWW-Authenticate header")
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn missing_header_gets_invalid_request_challenge() {
    let provider = oidc_provider().await;
    let response = get(app(oidc_config(&provider.uri())), "/v1/whoami", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let value = challenge(&response);
    assert!(value.starts_with("Bearer "));
    assert!(value.contains(r#"realm="mcp""#));
    assert!(value.contains(&format!(r#"resource_metadata="{METADATA_URL}""#)));
    assert!(value.contains(r#"error="invalid_request""#));

    let body = json_body(response).await;
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn non_bearer_scheme_gets_invalid_request() {
    let provider = oidc_provider().await;
    let response = get(app(oidc_config(&provider.uri())), "/v1/whoami", Some("Token xyz")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(challenge(&response).contains(r#"error="invalid_request""#));
}

#[tokio::test]
async fn expired_jwt_gets_invalid_token() {
    let provider = oidc_provider().await;
    let token = sign(&json!({
        "iss": provider.uri(),
        "sub": "user_123",
        "aud": AUDIENCE,
        "iat": now() - 7200,
        "exp": now() - 3600,
    }));

    let response = get(
        app(oidc_config(&provider.uri())),
        "/v1/whoami",
        Some(&format!("Bearer {token}")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(challenge(&response).contains(r#"error="invalid_token""#));
    let body = json_body(response).await;
    assert_eq!(body["error_description"], "Token verification failed");
}

#[tokio::test]
async fn valid_jwt_reaches_handler_with_scopes() {
    let provider = oidc_provider().await;
    let token = sign(&json!({
        "iss": provider.uri(),
        "sub": "user_123",
        "aud": [AUDIENCE],
        "azp": "cli",
        "scope": "mcp:tools extra:scope",
        "iat": now(),
        "exp": now() + 3600,
    }));

    let response = get(
        app(oidc_config(&provider.uri())),
        "/v1/whoami",
        Some(&format!("Bearer {token}")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["subject"], "user_123");
    assert_eq!(body["client_id"], "cli");
    assert_eq!(body["scopes"], json!(["extra:scope", "mcp:tools"]));
}

#[tokio::test]
async fn inactive_introspection_gets_invalid_token() {
    let server = introspection_server(json!({ "active": false })).await;
    let response = get(
        app(introspection_config(&server)),
        "/v1/whoami",
        Some("Bearer opaque"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(challenge(&response).contains(r#"error="invalid_token""#));
}

#[tokio::test]
async fn introspected_token_reaches_handler() {
    let server = introspection_server(json!({
        "active": true,
        "sub": "svc",
        "client_id": "batch",
        "scope": "mcp:tools extra:scope",
        "aud": AUDIENCE,
        "exp": now() + 600,
    }))
    .await;

    let response = get(
        app(introspection_config(&server)),
        "/v1/tools",
        Some("Bearer opaque"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["subject"], "svc");
}

#[tokio::test]
async fn tools_route_requires_scope() {
    let server = introspection_server(json!({
        "active": true,
        "sub": "svc",
        "scope": "extra:scope",
        "aud": AUDIENCE,
        "exp": now() + 600,
    }))
    .await;

    let app = app(introspection_config(&server));

    let response = get(app.clone(), "/v1/whoami", Some("Bearer opaque")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(app, "/v1/tools", Some("Bearer opaque")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Insufficient scope");
}

#[tokio::test]
async fn repeated_requests_hit_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/introspect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "active": true,
            "sub": "svc",
            "scope": "mcp:tools",
            "aud": AUDIENCE,
            "exp": now() + 600,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app(introspection_config(&server));
    for _ in 0..3 {
        let response = get(app.clone(), "/v1/whoami", Some("Bearer opaque")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn metadata_is_public() {
    let provider = oidc_provider().await;
    let response = get(app(oidc_config(&provider.uri())), METADATA_PATH, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=3600"
    );
    let body = json_body(response).await;
    assert_eq!(body["resource"], AUDIENCE);
    assert_eq!(body["authorization_servers"], json!([provider.uri()]));
    assert_eq!(body["scopes_supported"], json!(["mcp:tools"]));
    assert_eq!(body["bearer_methods_supported"], json!(["header"]));
}

#[tokio::test]
async fn metadata_rejects_other_methods() {
    let provider = oidc_provider().await;
    let response = app(oidc_config(&provider.uri()))
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri(METADATA_PATH)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers().get(header::ALLOW).unwrap(), "GET");
}

#[tokio::test]
async fn health_is_public_and_reports_strategy() {
    let server = introspection_server(json!({ "active": false })).await;
    let response = get(app(introspection_config(&server)), "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["auth"], "introspection");
}

#[tokio::test]
async fn disabled_auth_serves_routes_without_layer() {
    let app = router(AppState::default());

    let response = get(app.clone(), "/health", None).await;
    assert_eq!(json_body(response).await["auth"], "disabled");

    let response = get(app.clone(), "/v1/whoami", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["subject"], "");

    // No scope layer either.
    let response = get(app, "/v1/tools", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["tools"][0]["name"], "whoami");
}
