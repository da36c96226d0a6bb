// ABOUTME: Calendar booking tool gated on the tenant's connected calendar integration
// ABOUTME: Validates the requested slot before calling the booking collaborator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{require_tenant, track, with_timeout, ToolDeps};
use crate::models::IntegrationKind;
use crate::tools::{require_str, AgentTool, ToolContext, ToolResponse};

/// Default meeting length when the model does not specify one
const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Books a calendar event for the business
pub struct CreateCalendarEventTool {
    deps: Arc<ToolDeps>,
}

impl CreateCalendarEventTool {
    /// Build the tool
    #[must_use]
    pub fn new(deps: Arc<ToolDeps>) -> Self {
        Self { deps }
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> ToolResponse {
        if let Err(fail) = require_tenant(ctx, "create_calendar_event") {
            return fail;
        }

        let title = match require_str(input, "title") {
            Ok(v) => v,
            Err(fail) => return fail,
        };
        let start_raw = match require_str(input, "start") {
            Ok(v) => v,
            Err(fail) => return fail,
        };
        let attendee = match require_str(input, "attendee_email") {
            Ok(v) => v,
            Err(fail) => return fail,
        };

        let Ok(start) = DateTime::parse_from_rfc3339(start_raw) else {
            return ToolResponse::fail("The start time must be an RFC 3339 timestamp");
        };
        let start = start.with_timezone(&Utc);
        if start < Utc::now() {
            return ToolResponse::fail("The requested time slot is in the past");
        }

        let duration = input
            .get("duration_minutes")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_DURATION_MINUTES, |d| d.min(480) as u32);

        match with_timeout(
            "calendar",
            self.deps
                .collaborators
                .calendar
                .create_event(title, start, duration, attendee),
        )
        .await
        {
            Ok(event_id) => ToolResponse::ok_with_data(
                format!("Booked '{title}' for {}", start.format("%Y-%m-%d %H:%M")),
                json!({ "event_id": event_id }),
            ),
            Err(fail) => fail,
        }
    }
}

#[async_trait]
impl AgentTool for CreateCalendarEventTool {
    fn name(&self) -> &'static str {
        "create_calendar_event"
    }

    fn description(&self) -> &'static str {
        "Book an appointment on the business calendar and invite the visitor"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "start": { "type": "string", "description": "RFC 3339 start time" },
                "duration_minutes": { "type": "integer" },
                "attendee_email": { "type": "string" }
            },
            "required": ["title", "start", "attendee_email"]
        })
    }

    fn required_integration(&self) -> Option<IntegrationKind> {
        Some(IntegrationKind::Calendar)
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
