// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the verified token identity.
//!
//! Use the `Authenticated` extractor in handlers behind [`bearer_auth`]:
//!
//! ```rust,ignore
//! async fn my_handler(Authenticated(info): Authenticated) -> impl IntoResponse {
//!     // info is TokenInfo
//! }
//! ```
//!
//! [`bearer_auth`]: super::middleware::bearer_auth

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};

use super::{AuthError, TokenInfo};

/// The [`TokenInfo`] stored by the bearer middleware.
///
/// Rejects with 401 "Authentication required" when the route is not behind
/// the middleware or the middleware did not run.
#[derive(Debug, Clone)]
pub struct Authenticated(pub TokenInfo);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TokenInfo>()
            .cloned()
            .map(Authenticated)
            .ok_or(AuthError::AuthenticationRequired)
    }
}

/// `Option<Authenticated>` yields `None` instead of rejecting, for routes
/// that are also served with authentication disabled.
impl<S> OptionalFromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<TokenInfo>().cloned().map(Authenticated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn reads_token_info_from_extensions() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        parts.extensions.insert(TokenInfo {
            subject: "user_123".to_string(),
            ..Default::default()
        });

        let Authenticated(info) =
            <Authenticated as FromRequestParts<()>>::from_request_parts(&mut parts, &())
                .await
                .unwrap();
        assert_eq!(info.subject, "user_123");
    }

    #[tokio::test]
    async fn rejects_unauthenticated_request() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let rejection = <Authenticated as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn optional_extractor_yields_none_without_identity() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        let extracted =
            <Authenticated as OptionalFromRequestParts<()>>::from_request_parts(&mut parts, &())
                .await
                .unwrap();
        assert!(extracted.is_none());
    }
}
