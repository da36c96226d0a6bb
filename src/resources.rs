// ABOUTME: Centralized resource container for dependency injection across routes
// ABOUTME: Builds storage, ledger, registry, and tracker once and shares them via Arc
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Server Resources
//!
//! One container holds every expensive shared object: the storage backend,
//! the credits ledger, the tool registry (with its collaborator handles), and
//! the usage tracker. Routes receive `Arc<ServerResources>` as axum state.

use std::sync::Arc;

use crate::config::{ServerConfig, ToolCostTable};
use crate::credits::CreditsLedger;
use crate::external::Collaborators;
use crate::storage::Storage;
use crate::tools::handlers::ToolDeps;
use crate::tools::{ToolRegistry, UsageTracker};

/// Shared server resources
pub struct ServerResources {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Storage backend
    pub storage: Arc<dyn Storage>,
    /// Credits ledger
    pub ledger: Arc<CreditsLedger>,
    /// Tool registry with the full catalog
    pub tools: Arc<ToolRegistry>,
    /// Usage tracking queue handle
    pub tracker: UsageTracker,
}

impl ServerResources {
    /// Wire up all shared resources
    ///
    /// Must run inside a tokio runtime (the tracker spawns its worker task).
    #[must_use]
    pub fn new(
        config: Arc<ServerConfig>,
        storage: Arc<dyn Storage>,
        collaborators: Collaborators,
        costs: ToolCostTable,
    ) -> Self {
        let ledger = Arc::new(CreditsLedger::new(Arc::clone(&storage)));
        let tracker = UsageTracker::spawn(Arc::clone(&storage));

        let deps = Arc::new(ToolDeps {
            storage: Arc::clone(&storage),
            ledger: Arc::clone(&ledger),
            tracker: tracker.clone(),
            costs: Arc::new(costs),
            collaborators,
        });
        let tools = Arc::new(ToolRegistry::new(deps));

        Self {
            config,
            storage,
            ledger,
            tools,
            tracker,
        }
    }
}
