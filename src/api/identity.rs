// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;

use crate::auth::{Authenticated, TokenInfo};

/// Return the identity carried by the caller's access token.
///
/// With authentication disabled the caller is anonymous and an empty
/// identity is returned.
#[utoipa::path(
    get,
    path = "/v1/whoami",
    tag = "Identity",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Verified token identity", body = TokenInfo),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub async fn whoami(auth: Option<Authenticated>) -> Json<TokenInfo> {
    Json(auth.map(|Authenticated(info)| info).unwrap_or_default())
}
