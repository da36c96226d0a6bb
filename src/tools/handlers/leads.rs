// ABOUTME: Lead capture tool: saves visitor contact details for the tenant
// ABOUTME: Tenant-only; rejects platform-assistant calls before any side effect
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::{require_tenant, track, ToolDeps};
use crate::models::Lead;
use crate::tools::{require_str, AgentTool, ToolAccess, ToolContext, ToolResponse};

/// Saves a visitor's contact details as a lead for the chatbot owner
pub struct SaveLeadTool {
    deps: Arc<ToolDeps>,
}

impl SaveLeadTool {
    /// Build the tool
    #[must_use]
    pub fn new(deps: Arc<ToolDeps>) -> Self {
        Self { deps }
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> ToolResponse {
        // Tenant guard first: no spend and no record without a chatbot
        let chatbot_id = match require_tenant(ctx, "save_lead") {
            Ok(id) => id,
            Err(fail) => return fail,
        };

        let name = match require_str(input, "name") {
            Ok(v) => v,
            Err(fail) => return fail,
        };
        let email = match require_str(input, "email") {
            Ok(v) => v,
            Err(fail) => return fail,
        };
        if !email.contains('@') {
            return ToolResponse::fail("That email address does not look valid");
        }

        let lead = Lead {
            id: Uuid::new_v4(),
            chatbot_id,
            name: name.to_owned(),
            email: email.to_owned(),
            phone: input
                .get("phone")
                .and_then(Value::as_str)
                .map(str::to_owned),
            notes: input
                .get("notes")
                .and_then(Value::as_str)
                .map(str::to_owned),
            created_at: Utc::now(),
        };

        if let Err(e) = self.deps.storage.insert_lead(&lead).await {
            warn!(chatbot_id = %chatbot_id, "Failed to save lead: {e}");
            return ToolResponse::fail("The contact details could not be saved. Please try again.");
        }

        ToolResponse::ok_with_data(
            format!("Saved contact details for {name}"),
            json!({ "lead_id": lead.id }),
        )
    }
}

#[async_trait]
impl AgentTool for SaveLeadTool {
    fn name(&self) -> &'static str {
        "save_lead"
    }

    fn description(&self) -> &'static str {
        "Save the visitor's contact details (name, email, optional phone and notes) so the \
         business can follow up"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "email": { "type": "string" },
                "phone": { "type": "string" },
                "notes": { "type": "string" }
            },
            "required": ["name", "email"]
        })
    }

    fn minimum_access(&self) -> ToolAccess {
        ToolAccess::Core
    }

    fn tenant_only(&self) -> bool {
        true
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> ToolResponse {
        let response = self.execute(&input, ctx).await;
        track(&self.deps, ctx, self.name(), &response, Value::Null);
        response
    }
}
