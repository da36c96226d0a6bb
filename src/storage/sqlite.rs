// ABOUTME: SQLite storage backend using sqlx with runtime-bound queries
// ABOUTME: Credit-account CAS is a conditional UPDATE guarded by the version column
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use super::Storage;
use crate::errors::{AppError, AppResult};
use crate::models::{ChatbotDefinition, CreditAccount, Lead, ToolUsageRecord};

/// Schema statements run at connect time
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS chatbots (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        definition TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS credit_accounts (
        user_id TEXT PRIMARY KEY,
        purchased_credits INTEGER NOT NULL,
        monthly_credits_used INTEGER NOT NULL,
        credits_reset_at TEXT,
        lifetime_credits_used INTEGER NOT NULL,
        version INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tool_usage (
        id TEXT PRIMARY KEY,
        chatbot_id TEXT NOT NULL,
        conversation_id TEXT NOT NULL,
        tool_name TEXT NOT NULL,
        success INTEGER NOT NULL,
        error TEXT,
        user_message TEXT NOT NULL,
        response TEXT NOT NULL,
        metadata TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_tool_usage_conversation
        ON tool_usage (conversation_id, tool_name, created_at)",
    "CREATE TABLE IF NOT EXISTS leads (
        id TEXT PRIMARY KEY,
        chatbot_id TEXT NOT NULL,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT,
        notes TEXT,
        created_at TEXT NOT NULL
    )",
];

/// SQLite storage backend
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if missing) the database at the given URL
    ///
    /// # Errors
    ///
    /// Returns a database error when the pool cannot be opened or the schema
    /// cannot be applied.
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::database(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        Ok(Self { pool })
    }

    fn parse_uuid(value: &str, column: &str) -> AppResult<Uuid> {
        Uuid::parse_str(value)
            .map_err(|e| AppError::database(format!("Corrupt {column} in storage: {e}")))
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn chatbot(&self, id: Uuid) -> AppResult<Option<ChatbotDefinition>> {
        let row = sqlx::query("SELECT definition FROM chatbots WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let definition: String = row.try_get("definition")?;
                let chatbot = serde_json::from_str(&definition).map_err(|e| {
                    AppError::database(format!("Corrupt chatbot definition: {e}"))
                })?;
                Ok(Some(chatbot))
            }
            None => Ok(None),
        }
    }

    async fn upsert_chatbot(&self, chatbot: &ChatbotDefinition) -> AppResult<()> {
        let definition = serde_json::to_string(chatbot)
            .map_err(|e| AppError::database(format!("Failed to encode chatbot: {e}")))?;

        sqlx::query(
            "INSERT INTO chatbots (id, user_id, definition, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET definition = excluded.definition",
        )
        .bind(chatbot.id.to_string())
        .bind(chatbot.user_id.to_string())
        .bind(definition)
        .bind(chatbot.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn credit_account(&self, user_id: Uuid) -> AppResult<CreditAccount> {
        sqlx::query(
            "INSERT OR IGNORE INTO credit_accounts
             (user_id, purchased_credits, monthly_credits_used, credits_reset_at,
              lifetime_credits_used, version)
             VALUES (?, 0, 0, NULL, 0, 0)",
        )
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT purchased_credits, monthly_credits_used, credits_reset_at,
                    lifetime_credits_used, version
             FROM credit_accounts WHERE user_id = ?",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        let reset_at: Option<String> = row.try_get("credits_reset_at")?;
        let credits_reset_at = match reset_at {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| AppError::database(format!("Corrupt reset timestamp: {e}")))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        let purchased: i64 = row.try_get("purchased_credits")?;
        let monthly_used: i64 = row.try_get("monthly_credits_used")?;
        let lifetime: i64 = row.try_get("lifetime_credits_used")?;

        Ok(CreditAccount {
            user_id,
            purchased_credits: u32::try_from(purchased).unwrap_or(0),
            monthly_credits_used: u32::try_from(monthly_used).unwrap_or(0),
            credits_reset_at,
            lifetime_credits_used: u64::try_from(lifetime).unwrap_or(0),
            version: row.try_get("version")?,
        })
    }

    async fn store_credit_account_if_version(
        &self,
        account: &CreditAccount,
        expected_version: i64,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE credit_accounts
             SET purchased_credits = ?, monthly_credits_used = ?, credits_reset_at = ?,
                 lifetime_credits_used = ?, version = ?
             WHERE user_id = ? AND version = ?",
        )
        .bind(i64::from(account.purchased_credits))
        .bind(i64::from(account.monthly_credits_used))
        .bind(account.credits_reset_at.map(|t| t.to_rfc3339()))
        .bind(i64::try_from(account.lifetime_credits_used).unwrap_or(i64::MAX))
        .bind(account.version)
        .bind(account.user_id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_usage_record(&self, record: &ToolUsageRecord) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO tool_usage
             (id, chatbot_id, conversation_id, tool_name, success, error,
              user_message, response, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(record.chatbot_id.to_string())
        .bind(&record.conversation_id)
        .bind(&record.tool_name)
        .bind(i64::from(record.success))
        .bind(record.error.as_deref())
        .bind(&record.user_message)
        .bind(&record.response)
        .bind(record.metadata.to_string())
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_tool_usage_since(
        &self,
        conversation_id: &str,
        tool_name: &str,
        since: DateTime<Utc>,
    ) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tool_usage
             WHERE conversation_id = ? AND tool_name = ? AND created_at >= ?",
        )
        .bind(conversation_id)
        .bind(tool_name)
        .bind(since.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn delete_usage_records_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM tool_usage WHERE created_at < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_lead(&self, lead: &Lead) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO leads (id, chatbot_id, name, email, phone, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(lead.id.to_string())
        .bind(lead.chatbot_id.to_string())
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(lead.phone.as_deref())
        .bind(lead.notes.as_deref())
        .bind(lead.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn leads_for_chatbot(&self, chatbot_id: Uuid) -> AppResult<Vec<Lead>> {
        let rows = sqlx::query(
            "SELECT id, chatbot_id, name, email, phone, notes, created_at
             FROM leads WHERE chatbot_id = ? ORDER BY created_at DESC",
        )
        .bind(chatbot_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut leads = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let chatbot: String = row.try_get("chatbot_id")?;
            let created_at: String = row.try_get("created_at")?;
            leads.push(Lead {
                id: Self::parse_uuid(&id, "lead id")?,
                chatbot_id: Self::parse_uuid(&chatbot, "chatbot id")?,
                name: row.try_get("name")?,
                email: row.try_get("email")?,
                phone: row.try_get("phone")?,
                notes: row.try_get("notes")?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| AppError::database(format!("Corrupt lead timestamp: {e}")))?
                    .with_timezone(&Utc),
            });
        }
        Ok(leads)
    }
}
