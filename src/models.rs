// ABOUTME: Core domain models for the Ghosty platform: chatbots, credit accounts, usage records
// ABOUTME: Serde-serializable structures shared between storage backends and the agent core
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Domain Models
//!
//! Tenant-owned chatbot definitions, the per-user credit account, the
//! append-only tool usage audit row, captured leads, and the third-party
//! integration map. Plan reference data lives in [`crate::plans`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ============================================================================
// Chatbot Definition
// ============================================================================

/// Where a context item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    /// Pasted or typed directly in the dashboard
    Manual,
    /// Uploaded document
    Document,
    /// Crawled website page
    Website,
    /// Answered FAQ pair
    Faq,
}

/// One ordered knowledge snippet attached to a chatbot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    /// Display title
    pub title: String,
    /// Raw text content
    pub content: String,
    /// Content size in KB, as measured at upload time
    pub size_kb: u32,
    /// Source type
    pub source: ContextSource,
}

/// Tenant-owned chatbot configuration
///
/// Created and edited through the dashboard; read-only to the agent core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotDefinition {
    /// Chatbot ID
    pub id: Uuid,
    /// Owning user (tenant)
    pub user_id: Uuid,
    /// Display name
    pub name: String,
    /// URL slug for the public widget
    pub slug: String,
    /// Free-text base instructions
    pub instructions: String,
    /// Tenant-authored extra instructions appended to the system prompt
    pub custom_instructions: String,
    /// Personality tag (e.g. "friendly", "formal")
    pub personality: String,
    /// Requested AI model
    pub model: String,
    /// Requested sampling temperature
    pub temperature: f32,
    /// Requested max tokens per reply, if the tenant set one
    pub max_tokens: Option<u32>,
    /// Widget welcome message
    pub welcome_message: String,
    /// Widget goodbye message
    pub goodbye_message: String,
    /// Widget accent color (hex)
    pub accent_color: String,
    /// Ordered knowledge base; earlier items win under truncation
    pub context_items: Vec<ContextItem>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ChatbotDefinition {
    /// Synthetic definition for the tenant-less platform assistant, "Ghosty"
    ///
    /// Ghosty answers questions about the platform itself and has its own
    /// tool allow/deny list; it is not backed by a dashboard record.
    #[must_use]
    pub fn platform_assistant() -> Self {
        Self {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            name: "Ghosty".to_owned(),
            slug: "ghosty".to_owned(),
            instructions: "You are Ghosty, the built-in assistant for the Ghosty platform. \
                           Help users understand plans, credits, chatbot setup, and billing."
                .to_owned(),
            custom_instructions: String::new(),
            personality: "helpful".to_owned(),
            model: "gpt-4o".to_owned(),
            temperature: 0.7,
            max_tokens: None,
            welcome_message: "Hi! I'm Ghosty. Ask me anything about the platform.".to_owned(),
            goodbye_message: "Happy building!".to_owned(),
            accent_color: "#6d5ef4".to_owned(),
            context_items: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Credit Account
// ============================================================================

/// Per-user credit state: a non-expiring purchased pool plus a monthly quota
///
/// Mutated only by the credits ledger. The `version` column backs the
/// optimistic compare-and-swap that serializes concurrent spends against the
/// same account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccount {
    /// Account owner
    pub user_id: Uuid,
    /// Purchased credits; never expire, only move via purchase or spend
    pub purchased_credits: u32,
    /// Credits consumed from the monthly quota this calendar month
    pub monthly_credits_used: u32,
    /// When the monthly pool was last reset
    pub credits_reset_at: Option<DateTime<Utc>>,
    /// Monotonic audit counter of all successful spends
    pub lifetime_credits_used: u64,
    /// Optimistic-lock version, bumped on every committed write
    pub version: i64,
}

impl CreditAccount {
    /// Fresh account for a new user
    #[must_use]
    pub const fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            purchased_credits: 0,
            monthly_credits_used: 0,
            credits_reset_at: None,
            lifetime_credits_used: 0,
            version: 0,
        }
    }
}

// ============================================================================
// Tool Usage Audit
// ============================================================================

/// Append-only audit row written by every tool handler on success and failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolUsageRecord {
    /// Record ID
    pub id: Uuid,
    /// Chatbot the turn ran under; nil for the platform assistant
    pub chatbot_id: Uuid,
    /// Conversation scope key used for per-conversation rate limits
    pub conversation_id: String,
    /// Tool name
    pub tool_name: String,
    /// Whether the invocation succeeded
    pub success: bool,
    /// Error message when it failed
    pub error: Option<String>,
    /// Truncated user message
    pub user_message: String,
    /// Truncated tool response
    pub response: String,
    /// Handler-specific metadata blob
    pub metadata: serde_json::Value,
    /// When the invocation happened
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Leads
// ============================================================================

/// A visitor contact captured by the save-lead tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    /// Lead ID
    pub id: Uuid,
    /// Chatbot that captured the lead
    pub chatbot_id: Uuid,
    /// Visitor name
    pub name: String,
    /// Visitor email
    pub email: String,
    /// Visitor phone, if offered
    pub phone: Option<String>,
    /// Free-text notes from the conversation
    pub notes: Option<String>,
    /// Capture timestamp
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Integrations
// ============================================================================

/// Third-party integration kinds a tenant can connect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationKind {
    /// Outbound email
    Email,
    /// Calendar booking
    Calendar,
    /// Payment links
    Payments,
    /// CRM sync
    Crm,
}

impl IntegrationKind {
    /// Parse an integration key from an API payload
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "email" => Some(Self::Email),
            "calendar" => Some(Self::Calendar),
            "payments" | "stripe" => Some(Self::Payments),
            "crm" => Some(Self::Crm),
            _ => None,
        }
    }
}

/// Which integrations are currently connected for the tenant
///
/// Connection state can change between turns, so this map is rebuilt per
/// request and never cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrationMap {
    connected: HashMap<IntegrationKind, bool>,
}

impl IntegrationMap {
    /// Empty map: nothing connected
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw API payload keys, ignoring unknown integration names
    #[must_use]
    pub fn from_flags(flags: &HashMap<String, bool>) -> Self {
        let mut connected = HashMap::new();
        for (key, value) in flags {
            if let Some(kind) = IntegrationKind::parse(key) {
                connected.insert(kind, *value);
            }
        }
        Self { connected }
    }

    /// Mark an integration connected (test/dev helper)
    pub fn connect(&mut self, kind: IntegrationKind) {
        self.connected.insert(kind, true);
    }

    /// Whether the given integration is connected
    #[must_use]
    pub fn is_connected(&self, kind: IntegrationKind) -> bool {
        self.connected.get(&kind).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integration_map_from_flags() {
        let mut flags = HashMap::new();
        flags.insert("email".to_owned(), true);
        flags.insert("stripe".to_owned(), true);
        flags.insert("smoke-signals".to_owned(), true);

        let map = IntegrationMap::from_flags(&flags);
        assert!(map.is_connected(IntegrationKind::Email));
        assert!(map.is_connected(IntegrationKind::Payments));
        assert!(!map.is_connected(IntegrationKind::Calendar));
    }

    #[test]
    fn test_platform_assistant_has_no_tenant() {
        let ghosty = ChatbotDefinition::platform_assistant();
        assert_eq!(ghosty.id, Uuid::nil());
        assert_eq!(ghosty.name, "Ghosty");
    }
}
