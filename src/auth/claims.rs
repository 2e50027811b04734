// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified token identity and claim normalization.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// `aud` as it appears on the wire: a single string or an array of strings.
///
/// Any other JSON shape fails deserialization rather than being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Collapse into the set representation used by [`TokenInfo`].
    pub fn into_set(self) -> BTreeSet<String> {
        match self {
            Audience::Single(aud) => BTreeSet::from([aud]),
            Audience::Multiple(auds) => auds.into_iter().collect(),
        }
    }
}

/// Normalize an optional raw `aud` value.
///
/// Absent or `null` yields an empty set.
pub fn normalize_audience(raw: Option<&Value>) -> Result<BTreeSet<String>, serde_json::Error> {
    match raw {
        None | Some(Value::Null) => Ok(BTreeSet::new()),
        Some(value) => Audience::deserialize(value).map(Audience::into_set),
    }
}

/// Split a space-delimited OAuth `scope` string.
pub fn parse_scope(scope: &str) -> BTreeSet<String> {
    scope
        .split(' ')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Identity extracted from a verified access token.
///
/// Produced by every verifier; attached to the request extensions by the
/// bearer middleware.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TokenInfo {
    /// `sub` claim (typically the user ID).
    pub subject: String,

    /// Client that obtained the token (`azp` or `client_id`).
    pub client_id: String,

    /// Granted scopes. Case-sensitive.
    pub scopes: BTreeSet<String>,

    /// Intended audiences.
    pub audience: BTreeSet<String>,

    /// Expiry as Unix seconds, 0 when unknown.
    pub expires_at: i64,

    /// Issue time as Unix seconds, 0 when unknown.
    pub issued_at: i64,

    pub issuer: String,

    /// Remaining claims, untyped.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub extra: Map<String, Value>,
}

impl TokenInfo {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// True when every scope in `scopes` is granted.
    pub fn has_all_scopes<S: AsRef<str>>(&self, scopes: &[S]) -> bool {
        scopes.iter().all(|s| self.has_scope(s.as_ref()))
    }

    /// Audience membership, ignoring a single trailing slash on either side.
    pub fn has_audience(&self, audience: &str) -> bool {
        let wanted = trim_slash(audience);
        self.audience.iter().any(|aud| trim_slash(aud) == wanted)
    }

    /// Whether `expires_at` is known and already in the past.
    pub fn is_expired(&self) -> bool {
        self.expires_at > 0 && self.expires_at <= chrono::Utc::now().timestamp()
    }
}

fn trim_slash(s: &str) -> &str {
    s.strip_suffix('/').unwrap_or(s)
}
