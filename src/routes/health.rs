// ABOUTME: Liveness endpoint reporting storage backend and version
// ABOUTME: Kept cheap; no provider round-trips on the hot health path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::resources::ServerResources;

/// Health routes
#[must_use]
pub fn routes(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .with_state(resources)
}

async fn health(State(resources): State<Arc<ServerResources>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": resources.config.storage_kind(),
        "tracking": {
            "dropped": resources.tracker.dropped_count(),
            "failed": resources.tracker.failed_count(),
        },
    }))
}
