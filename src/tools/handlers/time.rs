// ABOUTME: Current-time tool for booking and scheduling conversations
// ABOUTME: Tenant-only; excluded from the platform assistant's tool set
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{require_tenant, track, ToolDeps};
use crate::tools::{AgentTool, ToolAccess, ToolContext, ToolResponse};

/// Reports the current UTC time, optionally shifted by a fixed offset
pub struct GetCurrentTimeTool {
    deps: Arc<ToolDeps>,
}

impl GetCurrentTimeTool {
    /// Build the tool
    #[must_use]
    pub fn new(deps: Arc<ToolDeps>) -> Self {
        Self { deps }
    }

    fn execute(input: &Value, ctx: &ToolContext) -> ToolResponse {
        if let Err(fail) = require_tenant(ctx, "get_current_time") {
            return fail;
        }

        let offset_hours = input
            .get("utc_offset_hours")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            .clamp(-12, 14);

        let now = Utc::now() + chrono::Duration::hours(offset_hours);
        ToolResponse::ok_with_data(
            format!("The current time is {}", now.format("%Y-%m-%d %H:%M")),
            json!({
                "iso": now.to_rfc3339(),
                "utc_offset_hours": offset_hours,
            }),
        )
    }
}

#[async_trait]
impl AgentTool for GetCurrentTimeTool {
    fn name(&self) -> &'static str {
        "get_current_time"
    }

    fn description(&self) -> &'static str {
        "Get the current date and time, optionally in the business's UTC offset"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "utc_offset_hours": { "type": "integer", "description": "Offset from UTC" }
            }
        })
    }

    fn minimum_access(&self) -> ToolAccess {
        ToolAccess::Core
    }

    fn tenant_only(&self) -> bool {
        true
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> ToolResponse {
        let response = Self::execute(&input, ctx);
        track(&self.deps, ctx, self.name(), &response, Value::Null);
        response
    }
}
