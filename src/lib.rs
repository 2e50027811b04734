// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! MCP Resource Auth - Bearer token authentication for MCP servers
//!
//! This crate protects an HTTP-exposed MCP server by validating OAuth 2.0 /
//! OIDC access tokens on every request.
//!
//! ## Modules
//!
//! - `api` - HTTP routes (Axum)
//! - `auth` - Token verification, middleware and RFC 9728 metadata
//! - `config` - Environment variable names and defaults
//! - `state` - Shared application state

pub mod api;
pub mod auth;
pub mod config;
pub mod state;
