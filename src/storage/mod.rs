// ABOUTME: Storage abstraction with pluggable backends selected by database URL
// ABOUTME: Persists chatbots, versioned credit accounts, usage records, and leads
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Storage Abstraction Layer
//!
//! One `Storage` trait, two backends: in-memory (tests, development) and
//! SQLite via sqlx. The factory picks a backend from the database URL.
//!
//! Credit accounts carry a version column. `store_credit_account_if_version`
//! is the compare-and-swap primitive the credits ledger builds its retry loop
//! on; both backends implement it atomically.

/// In-memory backend
pub mod memory;
/// SQLite backend
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::{ChatbotDefinition, CreditAccount, Lead, ToolUsageRecord};

/// Storage provider contract
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch a chatbot definition
    async fn chatbot(&self, id: Uuid) -> AppResult<Option<ChatbotDefinition>>;

    /// Create or replace a chatbot definition (dashboard writes; dev seeding)
    async fn upsert_chatbot(&self, chatbot: &ChatbotDefinition) -> AppResult<()>;

    /// Fetch the user's credit account, creating a zeroed one if absent
    async fn credit_account(&self, user_id: Uuid) -> AppResult<CreditAccount>;

    /// Store a credit account only if the stored version still matches
    ///
    /// Returns `false` on a version conflict; the caller retries its whole
    /// read-compute-write cycle.
    async fn store_credit_account_if_version(
        &self,
        account: &CreditAccount,
        expected_version: i64,
    ) -> AppResult<bool>;

    /// Append a tool usage record
    async fn insert_usage_record(&self, record: &ToolUsageRecord) -> AppResult<()>;

    /// Count invocations of one tool in one conversation since a timestamp
    async fn count_tool_usage_since(
        &self,
        conversation_id: &str,
        tool_name: &str,
        since: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Delete usage records older than the cutoff; returns rows removed
    ///
    /// Called by the scheduled retention-cleanup job, never from a turn.
    async fn delete_usage_records_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;

    /// Append a captured lead
    async fn insert_lead(&self, lead: &Lead) -> AppResult<()>;

    /// Leads captured by one chatbot, newest first
    async fn leads_for_chatbot(&self, chatbot_id: Uuid) -> AppResult<Vec<Lead>>;
}

/// Connect a storage backend from a database URL
///
/// `memory:` (or anything unrecognized) yields the in-memory backend;
/// `sqlite:<path>` yields SQLite.
///
/// # Errors
///
/// Returns a database error when the SQLite pool cannot be opened or migrated.
pub async fn connect(database_url: &str) -> AppResult<Arc<dyn Storage>> {
    if database_url.starts_with("sqlite") {
        Ok(Arc::new(SqliteStorage::connect(database_url).await?))
    } else {
        Ok(Arc::new(MemoryStorage::new()))
    }
}
