// ABOUTME: Tool handler implementations and their shared dependency bundle
// ABOUTME: Common helpers for credit charging, collaborator timeouts, and usage tracking
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Tool Handlers
//!
//! One module per capability group. Every handler follows the same shape:
//! validate input and fail fast, guard tenant-only operations, charge credits
//! synchronously before the paid work, call the collaborator under its own
//! timeout, and log a usage record on both outcomes through the tracking
//! queue.

/// Calendar booking
pub mod calendar;
/// Knowledge-base context search
pub mod context_search;
/// Document ingestion and parsing
pub mod documents;
/// Outbound email
pub mod email;
/// Lead capture
pub mod leads;
/// Payment links (tenant products and platform plans)
pub mod payments;
/// Reminder scheduling
pub mod scheduling;
/// Current-time lookup
pub mod time;
/// External web search
pub mod web_search;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use super::{usage_record, AgentTool, ToolContext, ToolResponse, UsageTracker};
use crate::config::ToolCostTable;
use crate::credits::CreditsLedger;
use crate::errors::{AppResult, ErrorCode};
use crate::external::Collaborators;
use crate::plans::Plan;
use crate::storage::Storage;

/// Wall-clock budget for one third-party collaborator call
///
/// Independent of the outer LLM timeout; a slow third party must not hang the
/// whole turn.
pub(crate) const COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything a handler needs, shared across the catalog
pub struct ToolDeps {
    /// Persistent storage
    pub storage: Arc<dyn Storage>,
    /// Credit metering
    pub ledger: Arc<CreditsLedger>,
    /// Usage audit queue
    pub tracker: UsageTracker,
    /// External credit cost table
    pub costs: Arc<ToolCostTable>,
    /// External collaborator handles
    pub collaborators: Collaborators,
}

/// Build the full tool catalog
#[must_use]
pub fn catalog(deps: Arc<ToolDeps>) -> Vec<Arc<dyn AgentTool>> {
    vec![
        Arc::new(context_search::QueryKnowledgeBaseTool::new(Arc::clone(&deps))),
        Arc::new(leads::SaveLeadTool::new(Arc::clone(&deps))),
        Arc::new(time::GetCurrentTimeTool::new(Arc::clone(&deps))),
        Arc::new(web_search::WebSearchTool::new(Arc::clone(&deps))),
        Arc::new(email::SendEmailTool::new(Arc::clone(&deps))),
        Arc::new(calendar::CreateCalendarEventTool::new(Arc::clone(&deps))),
        Arc::new(payments::CreatePaymentLinkTool::new(Arc::clone(&deps))),
        Arc::new(payments::GeneratePlanPaymentLinkTool::new(Arc::clone(&deps))),
        Arc::new(documents::IngestDocumentTool::new(Arc::clone(&deps))),
        Arc::new(documents::ParseDocumentTool::new(Arc::clone(&deps))),
        Arc::new(scheduling::ScheduleReminderTool::new(deps)),
    ]
}

/// Charge credits before the paid operation
///
/// Anonymous widget turns are not metered at this layer (their plan quota is
/// zero); every other plan pays synchronously, and a failed charge means the
/// operation must not run.
///
/// # Errors
///
/// Returns the failure `ToolResponse` to relay when the charge fails.
pub(crate) async fn charge(
    deps: &ToolDeps,
    ctx: &ToolContext,
    amount: u32,
) -> Result<(), ToolResponse> {
    if amount == 0 || ctx.plan == Plan::Anonymous {
        return Ok(());
    }
    match deps.ledger.spend(ctx.user_id, ctx.plan, amount).await {
        Ok(_) => Ok(()),
        Err(e) if e.code == ErrorCode::InsufficientCredits => Err(ToolResponse::fail(format!(
            "{}. Top up credits or wait for the monthly reset.",
            e.message
        ))),
        Err(e) => {
            warn!(user_id = %ctx.user_id, "Credit charge failed: {e}");
            Err(ToolResponse::fail(
                "Credits could not be charged, so the action was not performed. Please try again.",
            ))
        }
    }
}

/// Run a collaborator call under its own timeout
///
/// # Errors
///
/// Returns the failure `ToolResponse` to relay on timeout or collaborator error.
pub(crate) async fn with_timeout<T>(
    service: &str,
    future: impl Future<Output = AppResult<T>> + Send,
) -> Result<T, ToolResponse> {
    match tokio::time::timeout(COLLABORATOR_TIMEOUT, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!("{service} call failed: {e}");
            Err(ToolResponse::fail(e.message))
        }
        Err(_) => Err(ToolResponse::fail(format!(
            "The {service} service took too long to respond. Please try again."
        ))),
    }
}

/// Guard for tenant-only tools: the platform assistant has no chatbot
///
/// # Errors
///
/// Returns the failure `ToolResponse` to relay when no tenant chatbot is present.
pub(crate) fn require_tenant(ctx: &ToolContext, tool: &str) -> Result<Uuid, ToolResponse> {
    ctx.chatbot_id.ok_or_else(|| {
        ToolResponse::fail(format!(
            "The {tool} tool only works inside a tenant chatbot conversation"
        ))
    })
}

/// Log one invocation outcome through the tracking queue
pub(crate) fn track(
    deps: &ToolDeps,
    ctx: &ToolContext,
    name: &str,
    response: &ToolResponse,
    metadata: serde_json::Value,
) {
    deps.tracker.record(usage_record(ctx, name, response, metadata));
}
