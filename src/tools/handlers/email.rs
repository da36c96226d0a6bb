// ABOUTME: Outbound email tool gated on the tenant's connected email integration
// ABOUTME: Tenant-only; the collaborator call runs under its own timeout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{require_tenant, track, with_timeout, ToolDeps};
use crate::models::IntegrationKind;
use crate::tools::{require_str, AgentTool, ToolContext, ToolResponse};

/// Sends an email on behalf of the business
pub struct SendEmailTool {
    deps: Arc<ToolDeps>,
}

impl SendEmailTool {
    /// Build the tool
    #[must_use]
    pub fn new(deps: Arc<ToolDeps>) -> Self {
        Self { deps }
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> ToolResponse {
        if let Err(fail) = require_tenant(ctx, "send_email") {
            return fail;
        }

        let to = match require_str(input, "to") {
            Ok(v) => v,
            Err(fail) => return fail,
        };
        let subject = match require_str(input, "subject") {
            Ok(v) => v,
            Err(fail) => return fail,
        };
        let body = match require_str(input, "body") {
            Ok(v) => v,
            Err(fail) => return fail,
        };
        if !to.contains('@') {
            return ToolResponse::fail("That recipient address does not look valid");
        }

        match with_timeout(
            "email",
            self.deps.collaborators.email.send(to, subject, body),
        )
        .await
        {
            Ok(()) => ToolResponse::ok(format!("Email sent to {to}")),
            Err(fail) => fail,
        }
    }
}

#[async_trait]
impl AgentTool for SendEmailTool {
    fn name(&self) -> &'static str {
        "send_email"
    }

    fn description(&self) -> &'static str {
        "Send an email to the given address on behalf of the business"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to": { "type": "string" },
                "subject": { "type": "string" },
                "body": { "type": "string", "description": "HTML or plain-text body" }
            },
            "required": ["to", "subject", "body"]
        })
    }

    fn required_integration(&self) -> Option<IntegrationKind> {
        Some(IntegrationKind::Email)
    }

    fn tenant_only(&self) -> bool {
        true
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> ToolResponse {
        let response = self.execute(&input, ctx).await;
        track(
            &self.deps,
            ctx,
            self.name(),
            &response,
            json!({ "to": input.get("to") }),
        );
        response
    }
}
