// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{
    build_verifier, BearerAuth, OAuthConfig, ProtectedResourceMetadata, TokenVerifier,
    VerifyError,
};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<OAuthConfig>,
    pub metadata: Arc<ProtectedResourceMetadata>,
    /// `None` when OAuth is disabled.
    #[from_ref(skip)]
    pub verifier: Option<Arc<dyn TokenVerifier>>,
}

impl AppState {
    /// Build state from a validated config.
    pub fn new(config: OAuthConfig) -> Result<Self, VerifyError> {
        let verifier = if config.enabled {
            Some(build_verifier(&config)?)
        } else {
            None
        };
        Ok(Self::with_verifier(config, verifier))
    }

    /// Build state around an existing verifier.
    pub fn with_verifier(config: OAuthConfig, verifier: Option<Arc<dyn TokenVerifier>>) -> Self {
        Self {
            metadata: Arc::new(ProtectedResourceMetadata::from_config(&config)),
            config: Arc::new(config),
            verifier,
        }
    }

    /// Middleware state for the bearer layer, if authentication is on.
    pub fn bearer_auth(&self) -> Option<BearerAuth> {
        self.verifier
            .as_ref()
            .map(|v| BearerAuth::new(Arc::clone(v), &self.config.resource_server_url))
    }

    /// Name of the active verification strategy.
    pub fn auth_mode(&self) -> &'static str {
        match (&self.verifier, self.config.uses_introspection()) {
            (None, _) => "disabled",
            (Some(_), true) => "introspection",
            (Some(_), false) => "oidc",
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_verifier(OAuthConfig::default(), None)
    }
}
