// ABOUTME: HTTP route modules and top-level router assembly
// ABOUTME: The chat turn stream plus health; auth arrives pre-validated from the edge
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! HTTP surface for the agent core
//!
//! The platform's dashboard and widget edge call these routes with an
//! already-authenticated `{user_id, plan}` pair; session and cookie handling
//! live outside this crate.

/// Chat turn streaming endpoint
pub mod chat;
/// Liveness endpoint
pub mod health;

use axum::Router;
use std::sync::Arc;

use crate::resources::ServerResources;

/// Assemble the full router
#[must_use]
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(chat::ChatRoutes::routes(Arc::clone(&resources)))
        .merge(health::routes(resources))
}
