// ABOUTME: In-memory storage backend over concurrent maps for tests and development
// ABOUTME: Credit-account CAS is atomic through the map's entry lock
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::Storage;
use crate::errors::{AppError, AppResult};
use crate::models::{ChatbotDefinition, CreditAccount, Lead, ToolUsageRecord};

/// In-memory storage backend
///
/// Usage records live behind one mutex because the workload is append plus
/// occasional scans; accounts use the sharded map so concurrent CAS attempts
/// against different users never contend.
#[derive(Default)]
pub struct MemoryStorage {
    chatbots: DashMap<Uuid, ChatbotDefinition>,
    accounts: DashMap<Uuid, CreditAccount>,
    usage: Mutex<Vec<ToolUsageRecord>>,
    leads: Mutex<Vec<Lead>>,
}

impl MemoryStorage {
    /// Empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn usage_guard(&self) -> AppResult<std::sync::MutexGuard<'_, Vec<ToolUsageRecord>>> {
        self.usage
            .lock()
            .map_err(|_| AppError::internal("usage store lock poisoned"))
    }

    fn leads_guard(&self) -> AppResult<std::sync::MutexGuard<'_, Vec<Lead>>> {
        self.leads
            .lock()
            .map_err(|_| AppError::internal("lead store lock poisoned"))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn chatbot(&self, id: Uuid) -> AppResult<Option<ChatbotDefinition>> {
        Ok(self.chatbots.get(&id).map(|c| c.clone()))
    }

    async fn upsert_chatbot(&self, chatbot: &ChatbotDefinition) -> AppResult<()> {
        self.chatbots.insert(chatbot.id, chatbot.clone());
        Ok(())
    }

    async fn credit_account(&self, user_id: Uuid) -> AppResult<CreditAccount> {
        let account = self
            .accounts
            .entry(user_id)
            .or_insert_with(|| CreditAccount::new(user_id));
        Ok(account.clone())
    }

    async fn store_credit_account_if_version(
        &self,
        account: &CreditAccount,
        expected_version: i64,
    ) -> AppResult<bool> {
        // The entry holds the shard lock for the whole compare-and-swap
        let mut entry = self
            .accounts
            .entry(account.user_id)
            .or_insert_with(|| CreditAccount::new(account.user_id));
        if entry.version == expected_version {
            *entry = account.clone();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn insert_usage_record(&self, record: &ToolUsageRecord) -> AppResult<()> {
        self.usage_guard()?.push(record.clone());
        Ok(())
    }

    async fn count_tool_usage_since(
        &self,
        conversation_id: &str,
        tool_name: &str,
        since: DateTime<Utc>,
    ) -> AppResult<u64> {
        let count = self
            .usage_guard()?
            .iter()
            .filter(|r| {
                r.conversation_id == conversation_id
                    && r.tool_name == tool_name
                    && r.created_at >= since
            })
            .count();
        Ok(count as u64)
    }

    async fn delete_usage_records_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut usage = self.usage_guard()?;
        let before = usage.len();
        usage.retain(|r| r.created_at >= cutoff);
        Ok((before - usage.len()) as u64)
    }

    async fn insert_lead(&self, lead: &Lead) -> AppResult<()> {
        self.leads_guard()?.push(lead.clone());
        Ok(())
    }

    async fn leads_for_chatbot(&self, chatbot_id: Uuid) -> AppResult<Vec<Lead>> {
        let mut leads: Vec<Lead> = self
            .leads_guard()?
            .iter()
            .filter(|l| l.chatbot_id == chatbot_id)
            .cloned()
            .collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cas_rejects_stale_version() {
        let storage = MemoryStorage::new();
        let user_id = Uuid::new_v4();
        let loaded = storage.credit_account(user_id).await.unwrap_or_else(|_| CreditAccount::new(user_id));

        let mut updated = loaded.clone();
        updated.purchased_credits = 10;
        updated.version = loaded.version + 1;
        assert!(storage
            .store_credit_account_if_version(&updated, loaded.version)
            .await
            .unwrap_or(false));

        // A second writer holding the old version must lose
        let mut stale = loaded;
        stale.purchased_credits = 99;
        stale.version += 1;
        assert!(!storage
            .store_credit_account_if_version(&stale, 0)
            .await
            .unwrap_or(true));
    }
}
