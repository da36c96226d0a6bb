// ABOUTME: Reminder scheduling tool backed by the external job scheduler
// ABOUTME: Idempotent per conversation and reminder text; a duplicate schedule is a no-op
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{require_tenant, track, with_timeout, ToolDeps};
use crate::tools::{require_str, AgentTool, ToolContext, ToolResponse};

/// Schedules a follow-up reminder through the background job scheduler
pub struct ScheduleReminderTool {
    deps: Arc<ToolDeps>,
}

impl ScheduleReminderTool {
    /// Build the tool
    #[must_use]
    pub fn new(deps: Arc<ToolDeps>) -> Self {
        Self { deps }
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> ToolResponse {
        let chatbot_id = match require_tenant(ctx, "schedule_reminder") {
            Ok(id) => id,
            Err(fail) => return fail,
        };
        let message = match require_str(input, "message") {
            Ok(v) => v,
            Err(fail) => return fail,
        };
        let run_at_raw = match require_str(input, "run_at") {
            Ok(v) => v,
            Err(fail) => return fail,
        };

        let Ok(run_at) = DateTime::parse_from_rfc3339(run_at_raw) else {
            return ToolResponse::fail("The reminder time must be an RFC 3339 timestamp");
        };
        let run_at = run_at.with_timezone(&Utc);
        if run_at < Utc::now() {
            return ToolResponse::fail("The reminder time is in the past");
        }

        // Keyed so that re-running the same turn cannot double-schedule
        let idempotency_key = format!("reminder:{}:{}:{run_at_raw}", ctx.conversation_scope(), message);

        match with_timeout(
            "scheduler",
            self.deps.collaborators.scheduler.schedule(
                "send_reminder",
                json!({
                    "chatbot_id": chatbot_id,
                    "user_id": ctx.user_id,
                    "message": message,
                }),
                run_at,
                &idempotency_key,
            ),
        )
        .await
        {
            Ok(job_id) => ToolResponse::ok_with_data(
                format!("Reminder scheduled for {}", run_at.format("%Y-%m-%d %H:%M")),
                json!({ "job_id": job_id }),
            ),
            Err(fail) => fail,
        }
    }
}

#[async_trait]
impl AgentTool for ScheduleReminderTool {
    fn name(&self) -> &'static str {
        "schedule_reminder"
    }

    fn description(&self) -> &'static str {
        "Schedule a follow-up reminder to be delivered at a future time"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": { "type": "string" },
                "run_at": { "type": "string", "description": "RFC 3339 delivery time" }
            },
            "required": ["message", "run_at"]
        })
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
