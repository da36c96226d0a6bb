// ABOUTME: Tool invocation contract: per-turn context, response shape, and the AgentTool trait
// ABOUTME: Handlers own their side effects: credit spend, usage logging, record creation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Tool Invocation Contract
//!
//! Every tool handler implements [`AgentTool`]: a pure async function of
//! `(typed input, ToolContext) -> ToolResponse` plus gating metadata the
//! registry filters on. Side effects are the handler's responsibility, not
//! the runner's:
//!
//! - credit spends are synchronous and complete (or fail visibly) before the
//!   handler reports success
//! - usage records are logged on both success and failure paths through the
//!   tracking queue, which never throws and never blocks the turn
//! - a `ToolContext` with `chatbot_id == None` means the platform assistant
//!   is calling; tenant-only operations must reject that explicitly

/// Tool handler implementations
pub mod handlers;
/// Per-turn tool gating
pub mod registry;
/// Usage-record tracking queue
pub mod tracking;

pub use registry::{ToolRegistry, ToolSet};
pub use tracking::UsageTracker;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::llm::FunctionDeclaration;
use crate::models::{IntegrationKind, IntegrationMap, ToolUsageRecord};
use crate::plans::Plan;

/// Longest message/response slice persisted in a usage record
const USAGE_TRUNCATE_CHARS: usize = 500;

// ============================================================================
// Tool Context
// ============================================================================

/// Ephemeral per-turn context passed by reference into every tool handler
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Calling user
    pub user_id: Uuid,
    /// Resolved plan
    pub plan: Plan,
    /// Chatbot the turn runs under; `None` signals the platform assistant
    pub chatbot_id: Option<Uuid>,
    /// The user's raw message text
    pub message: String,
    /// Conversation identifier, when the caller has one
    pub conversation_id: Option<String>,
    /// Connected third-party integrations for the tenant
    pub integrations: IntegrationMap,
}

impl ToolContext {
    /// Whether this turn belongs to the tenant-less platform assistant
    #[must_use]
    pub const fn is_platform_assistant(&self) -> bool {
        self.chatbot_id.is_none()
    }

    /// Scope key for per-conversation rate limits
    ///
    /// Falls back to a user-scoped key when the caller has no conversation.
    #[must_use]
    pub fn conversation_scope(&self) -> String {
        self.conversation_id
            .clone()
            .unwrap_or_else(|| format!("user-{}", self.user_id))
    }
}

// ============================================================================
// Tool Response
// ============================================================================

/// Result of one tool invocation, relayed to the model as the tool's output
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolResponse {
    /// Whether the tool did what it was asked
    pub success: bool,
    /// Human-readable outcome, written for the model to relay
    pub message: String,
    /// Structured payload for successful calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResponse {
    /// Successful response with a message only
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// Successful response with a payload
    pub fn ok_with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Failed response; the message is what the model tells the user
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

// ============================================================================
// Access Levels
// ============================================================================

/// Coarse tool access level granted by a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ToolAccess {
    /// Read-only context search only (FREE, ANONYMOUS)
    ReadOnly,
    /// Core tenant tools without premium integrations (STARTER)
    Core,
    /// Full catalog, filtered by connected integrations (PRO, ENTERPRISE, TRIAL)
    Full,
}

impl ToolAccess {
    /// Access level for a plan
    #[must_use]
    pub const fn for_plan(plan: Plan) -> Self {
        match plan {
            Plan::Free | Plan::Anonymous => Self::ReadOnly,
            Plan::Starter => Self::Core,
            Plan::Pro | Plan::Enterprise | Plan::Trial => Self::Full,
        }
    }
}

// ============================================================================
// AgentTool Trait
// ============================================================================

/// The contract every tool handler implements
#[async_trait]
pub trait AgentTool: Send + Sync {
    /// Stable tool name exposed to the model
    fn name(&self) -> &'static str;

    /// What the tool does, for the model
    fn description(&self) -> &'static str;

    /// JSON schema of the tool's input
    fn parameters(&self) -> Value;

    /// Minimum plan access level required
    fn minimum_access(&self) -> ToolAccess {
        ToolAccess::Full
    }

    /// Integration that must be connected for this tool to be offered
    fn required_integration(&self) -> Option<IntegrationKind> {
        None
    }

    /// Tenant-scoped tools are meaningless without a chatbot and are excluded
    /// from the platform assistant's set
    fn tenant_only(&self) -> bool {
        false
    }

    /// Platform-only tools are exclusively available to the platform assistant
    fn platform_only(&self) -> bool {
        false
    }

    /// Execute the tool
    ///
    /// Never propagates errors: every failure becomes a
    /// `ToolResponse { success: false }` so the model can inform the user.
    async fn call(&self, input: Value, ctx: &ToolContext) -> ToolResponse;

    /// Declaration sent to the LLM for this tool
    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            parameters: Some(self.parameters()),
        }
    }
}

// ============================================================================
// Shared handler helpers
// ============================================================================

/// Build a usage record for an invocation outcome
#[must_use]
pub fn usage_record(
    ctx: &ToolContext,
    tool_name: &str,
    response: &ToolResponse,
    metadata: Value,
) -> ToolUsageRecord {
    ToolUsageRecord {
        id: Uuid::new_v4(),
        chatbot_id: ctx.chatbot_id.unwrap_or(Uuid::nil()),
        conversation_id: ctx.conversation_scope(),
        tool_name: tool_name.to_owned(),
        success: response.success,
        error: if response.success {
            None
        } else {
            Some(response.message.clone())
        },
        user_message: truncate(&ctx.message),
        response: truncate(&response.message),
        metadata,
        created_at: Utc::now(),
    }
}

/// Extract a required string field from tool input, failing fast when missing
///
/// # Errors
///
/// Returns the failure `ToolResponse` to relay when the field is absent or blank.
pub fn require_str<'a>(input: &'a Value, field: &str) -> Result<&'a str, ToolResponse> {
    input
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolResponse::fail(format!("Missing required field '{field}'")))
}

fn truncate(text: &str) -> String {
    text.chars().take(USAGE_TRUNCATE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_ordering() {
        assert!(ToolAccess::ReadOnly < ToolAccess::Core);
        assert!(ToolAccess::Core < ToolAccess::Full);
        assert_eq!(ToolAccess::for_plan(Plan::Anonymous), ToolAccess::ReadOnly);
        assert_eq!(ToolAccess::for_plan(Plan::Trial), ToolAccess::Full);
    }

    #[test]
    fn test_require_str_rejects_blank() {
        let input = serde_json::json!({"email": "   "});
        assert!(require_str(&input, "email").is_err());
        assert!(require_str(&input, "missing").is_err());

        let input = serde_json::json!({"email": "a@b.co"});
        assert_eq!(require_str(&input, "email").ok(), Some("a@b.co"));
    }
}
