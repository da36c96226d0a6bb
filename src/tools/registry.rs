// ABOUTME: Per-turn tool gating by plan access level, integration state, and persona
// ABOUTME: Recomputed every turn; integration state can change between requests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Tool Registry
//!
//! Holds the full tool catalog (built once with its dependencies) and filters
//! it into a per-turn [`ToolSet`]. The filter runs on every turn and is never
//! cached beyond one request: integration connection state can change between
//! turns, and a tool for a disconnected integration must not be offered.
//!
//! Gating rules:
//! - FREE and ANONYMOUS: read-only context search only
//! - STARTER: core tenant tools, no premium integrations
//! - PRO / ENTERPRISE / TRIAL: full catalog filtered by connected integrations
//! - platform assistant: tenant-scoped tools excluded, platform-only tools
//!   exclusively available

use std::sync::Arc;
use tracing::debug;

use super::handlers::{self, ToolDeps};
use super::{AgentTool, ToolAccess, ToolContext, ToolResponse};
use crate::llm::{FunctionCall, Tool};
use crate::models::IntegrationMap;
use crate::plans::Plan;

/// The full tool catalog plus per-turn filtering
pub struct ToolRegistry {
    catalog: Vec<Arc<dyn AgentTool>>,
}

impl ToolRegistry {
    /// Build the registry with its handler dependencies
    #[must_use]
    pub fn new(deps: Arc<ToolDeps>) -> Self {
        Self {
            catalog: handlers::catalog(deps),
        }
    }

    /// Compute the tool set for one turn
    #[must_use]
    pub fn for_turn(
        &self,
        plan: Plan,
        integrations: &IntegrationMap,
        is_platform_assistant: bool,
    ) -> ToolSet {
        let access = ToolAccess::for_plan(plan);

        let tools: Vec<Arc<dyn AgentTool>> = self
            .catalog
            .iter()
            .filter(|tool| {
                if access < tool.minimum_access() {
                    return false;
                }
                if is_platform_assistant {
                    if tool.tenant_only() {
                        return false;
                    }
                } else if tool.platform_only() {
                    return false;
                }
                if let Some(required) = tool.required_integration() {
                    if !integrations.is_connected(required) {
                        return false;
                    }
                }
                true
            })
            .map(Arc::clone)
            .collect();

        debug!(
            plan = %plan,
            platform_assistant = is_platform_assistant,
            tool_count = tools.len(),
            "Computed tool set for turn"
        );

        ToolSet { tools }
    }
}

/// The concrete set of callable tools for one turn
#[derive(Clone)]
pub struct ToolSet {
    tools: Vec<Arc<dyn AgentTool>>,
}

impl ToolSet {
    /// Empty set (FREE plan, or tests)
    #[must_use]
    pub const fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    /// Whether no tools are callable this turn
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Number of callable tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Names of the callable tools
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Look up a tool by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn AgentTool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Declarations to attach to the LLM request
    #[must_use]
    pub fn declarations(&self) -> Tool {
        Tool {
            function_declarations: self.tools.iter().map(|t| t.declaration()).collect(),
        }
    }

    /// Dispatch one model-requested call to its handler
    ///
    /// Unknown tool names and handler failures both come back as failed
    /// `ToolResponse`s for the model to relay; nothing propagates as an error.
    pub async fn dispatch(&self, call: &FunctionCall, ctx: &ToolContext) -> ToolResponse {
        match self.get(&call.name) {
            Some(tool) => tool.call(call.args.clone(), ctx).await,
            None => ToolResponse::fail(format!(
                "Tool '{}' is not available in this conversation",
                call.name
            )),
        }
    }
}
