// ABOUTME: External collaborator interfaces: search, payments, email, calendar, scheduling
// ABOUTME: All consumed as opaque, fallible, independently rate-limited trait objects
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # External Collaborators
//!
//! The core treats every third-party capability as an injected trait object:
//! retrieval search, payment links, email, calendar booking, background job
//! scheduling, web search, and the shared caches. The in-memory
//! implementations here back tests and the development server; production
//! wires real clients behind the same traits.
//!
//! Two of these exist specifically to replace process-local state the
//! original design leaned on: [`SearchCache`] (tenant+query keyed, TTL) and
//! [`ExpiringBlobStore`] (put/get with TTL, swept on access rather than by a
//! background interval timer).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

// ============================================================================
// Context Search (RAG retrieval, consumed as a black box)
// ============================================================================

/// One retrieval hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Matched content
    pub content: String,
    /// Relevance score, higher is better
    pub score: f64,
    /// Source metadata
    pub metadata: Value,
}

/// Black-box retrieval over a tenant's knowledge base
#[async_trait]
pub trait ContextSearch: Send + Sync {
    /// Search the tenant's indexed content
    async fn search(&self, query: &str, tenant_id: Uuid, top_k: usize)
        -> AppResult<Vec<SearchHit>>;
}

/// Naive in-memory retrieval for tests and development
#[derive(Default)]
pub struct InMemoryContextSearch {
    documents: DashMap<Uuid, Vec<String>>,
}

impl InMemoryContextSearch {
    /// Empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a document for a tenant
    pub fn index(&self, tenant_id: Uuid, content: impl Into<String>) {
        self.documents.entry(tenant_id).or_default().push(content.into());
    }
}

#[async_trait]
impl ContextSearch for InMemoryContextSearch {
    async fn search(
        &self,
        query: &str,
        tenant_id: Uuid,
        top_k: usize,
    ) -> AppResult<Vec<SearchHit>> {
        let needle = query.to_lowercase();
        let hits = self
            .documents
            .get(&tenant_id)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.to_lowercase().contains(&needle))
                    .take(top_k)
                    .map(|d| SearchHit {
                        content: d.clone(),
                        score: 1.0,
                        metadata: Value::Null,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }
}

// ============================================================================
// Payment Links
// ============================================================================

/// Payment link creation (Stripe-shaped, consumed as a capability)
#[async_trait]
pub trait PaymentLinkService: Send + Sync {
    /// Create a hosted payment link and return its URL
    async fn create_link(
        &self,
        amount_minor_units: u64,
        description: &str,
        currency: &str,
    ) -> AppResult<String>;
}

/// Development payment links: deterministic fake URLs
#[derive(Default)]
pub struct InMemoryPaymentLinks;

#[async_trait]
impl PaymentLinkService for InMemoryPaymentLinks {
    async fn create_link(
        &self,
        amount_minor_units: u64,
        description: &str,
        currency: &str,
    ) -> AppResult<String> {
        if amount_minor_units == 0 {
            return Err(AppError::invalid_input("Payment amount must be positive"));
        }
        debug!("Creating dev payment link: {description}");
        Ok(format!(
            "https://pay.ghosty.dev/link/{}?amount={amount_minor_units}&currency={currency}",
            Uuid::new_v4()
        ))
    }
}

// ============================================================================
// Email
// ============================================================================

/// A sent email, recorded by the development implementation
#[derive(Debug, Clone)]
pub struct SentEmail {
    /// Recipient
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
}

/// Outbound email capability
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Send one email
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()>;
}

/// Records emails instead of sending them
#[derive(Default)]
pub struct RecordingEmailService {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingEmailService {
    /// Empty outbox
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emails recorded so far
    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailService for RecordingEmailService {
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        self.sent.lock().await.push(SentEmail {
            to: to.to_owned(),
            subject: subject.to_owned(),
            html: html.to_owned(),
        });
        Ok(())
    }
}

// ============================================================================
// Calendar
// ============================================================================

/// Calendar booking capability
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Create an event; returns the provider's event ID
    async fn create_event(
        &self,
        title: &str,
        start: DateTime<Utc>,
        duration_minutes: u32,
        attendee_email: &str,
    ) -> AppResult<String>;
}

/// In-memory calendar for tests and development
#[derive(Default)]
pub struct InMemoryCalendar {
    events: DashMap<String, (String, DateTime<Utc>)>,
}

impl InMemoryCalendar {
    /// Empty calendar
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of booked events
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl CalendarService for InMemoryCalendar {
    async fn create_event(
        &self,
        title: &str,
        start: DateTime<Utc>,
        _duration_minutes: u32,
        _attendee_email: &str,
    ) -> AppResult<String> {
        let event_id = Uuid::new_v4().to_string();
        self.events
            .insert(event_id.clone(), (title.to_owned(), start));
        Ok(event_id)
    }
}

// ============================================================================
// Job Scheduler
// ============================================================================

/// Schedule-work-run-later capability
///
/// Scheduling is idempotent per key: scheduling the same key twice returns
/// the original job ID instead of enqueueing a duplicate, so a reminder fired
/// twice never double-sends.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Schedule a task; returns the scheduled job ID
    async fn schedule(
        &self,
        task_type: &str,
        payload: Value,
        run_at: DateTime<Utc>,
        idempotency_key: &str,
    ) -> AppResult<String>;
}

/// In-memory scheduler that only tracks idempotency
#[derive(Default)]
pub struct InMemoryScheduler {
    jobs: DashMap<String, String>,
}

impl InMemoryScheduler {
    /// Empty scheduler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct scheduled jobs
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

#[async_trait]
impl JobScheduler for InMemoryScheduler {
    async fn schedule(
        &self,
        task_type: &str,
        _payload: Value,
        run_at: DateTime<Utc>,
        idempotency_key: &str,
    ) -> AppResult<String> {
        let entry = self
            .jobs
            .entry(idempotency_key.to_owned())
            .or_insert_with(|| {
                debug!("Scheduling {task_type} for {run_at}");
                Uuid::new_v4().to_string()
            });
        Ok(entry.value().clone())
    }
}

// ============================================================================
// Web Search
// ============================================================================

/// One web search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchResult {
    /// Page title
    pub title: String,
    /// Page URL
    pub url: String,
    /// Result snippet
    pub snippet: String,
}

/// External web search capability
#[async_trait]
pub trait WebSearchApi: Send + Sync {
    /// Run a search
    async fn search(&self, query: &str, max_results: usize) -> AppResult<Vec<WebSearchResult>>;
}

/// Canned web search for tests and development
#[derive(Default)]
pub struct StaticWebSearch;

#[async_trait]
impl WebSearchApi for StaticWebSearch {
    async fn search(&self, query: &str, max_results: usize) -> AppResult<Vec<WebSearchResult>> {
        Ok((0..max_results.min(3))
            .map(|i| WebSearchResult {
                title: format!("Result {} for {query}", i + 1),
                url: format!("https://example.com/{}", i + 1),
                snippet: format!("Snippet {} about {query}", i + 1),
            })
            .collect())
    }
}

// ============================================================================
// Search Cache
// ============================================================================

/// Externally-owned search cache, keyed by tenant + query with a TTL
///
/// Injected as a collaborator so multi-instance deployments can share cache
/// state (or explicitly opt out) instead of relying on process-local maps.
#[async_trait]
pub trait SearchCache: Send + Sync {
    /// Look up a cached value
    async fn get(&self, tenant_id: Uuid, query: &str) -> Option<Value>;
    /// Store a value with a TTL
    async fn put(&self, tenant_id: Uuid, query: &str, value: Value, ttl: Duration);
}

/// In-memory search cache with sweep-on-access expiry
#[derive(Default)]
pub struct InMemorySearchCache {
    entries: DashMap<String, (Value, DateTime<Utc>)>,
}

impl InMemorySearchCache {
    /// Empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(tenant_id: Uuid, query: &str) -> String {
        format!("{tenant_id}:{}", query.to_lowercase())
    }
}

#[async_trait]
impl SearchCache for InMemorySearchCache {
    async fn get(&self, tenant_id: Uuid, query: &str) -> Option<Value> {
        let key = Self::key(tenant_id, query);
        if let Some(entry) = self.entries.get(&key) {
            if entry.1 > Utc::now() {
                return Some(entry.0.clone());
            }
        }
        // Expired entries are removed on access, not by a background timer
        self.entries.remove(&key);
        None
    }

    async fn put(&self, tenant_id: Uuid, query: &str, value: Value, ttl: Duration) {
        let expires = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(5));
        self.entries
            .insert(Self::key(tenant_id, query), (value, expires));
    }
}

// ============================================================================
// Expiring Blob Store
// ============================================================================

/// Temporary blob storage with explicit TTL semantics
///
/// Replaces in-process maps with sweep intervals: expiry is part of the
/// interface, not a timer coupled to process lifetime.
#[async_trait]
pub trait ExpiringBlobStore: Send + Sync {
    /// Store a blob that expires after `ttl`
    async fn put(&self, key: &str, bytes: Vec<u8>, ttl: Duration) -> AppResult<()>;
    /// Fetch a blob if present and unexpired
    async fn get(&self, key: &str) -> Option<Vec<u8>>;
    /// Remove a blob
    async fn delete(&self, key: &str);
}

/// In-memory expiring blob store
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: DashMap<String, (Vec<u8>, DateTime<Utc>)>,
}

impl InMemoryBlobStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpiringBlobStore for InMemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, ttl: Duration) -> AppResult<()> {
        let expires = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        self.blobs.insert(key.to_owned(), (bytes, expires));
        Ok(())
    }

    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(entry) = self.blobs.get(key) {
            if entry.1 > Utc::now() {
                return Some(entry.0.clone());
            }
        }
        self.blobs.remove(key);
        None
    }

    async fn delete(&self, key: &str) {
        self.blobs.remove(key);
    }
}

/// Bundle of in-memory collaborators for tests and the development server
#[must_use]
pub fn in_memory_collaborators() -> Collaborators {
    Collaborators {
        context_search: Arc::new(InMemoryContextSearch::new()),
        payments: Arc::new(InMemoryPaymentLinks),
        email: Arc::new(RecordingEmailService::new()),
        calendar: Arc::new(InMemoryCalendar::new()),
        scheduler: Arc::new(InMemoryScheduler::new()),
        web_search: Arc::new(StaticWebSearch),
        search_cache: Arc::new(InMemorySearchCache::new()),
        blob_store: Arc::new(InMemoryBlobStore::new()),
    }
}

/// The full set of collaborator handles the tool layer needs
#[derive(Clone)]
pub struct Collaborators {
    /// Knowledge-base retrieval
    pub context_search: Arc<dyn ContextSearch>,
    /// Payment links
    pub payments: Arc<dyn PaymentLinkService>,
    /// Outbound email
    pub email: Arc<dyn EmailService>,
    /// Calendar booking
    pub calendar: Arc<dyn CalendarService>,
    /// Background job scheduling
    pub scheduler: Arc<dyn JobScheduler>,
    /// Web search
    pub web_search: Arc<dyn WebSearchApi>,
    /// Shared search cache
    pub search_cache: Arc<dyn SearchCache>,
    /// Temporary blob storage
    pub blob_store: Arc<dyn ExpiringBlobStore>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scheduler_is_idempotent_per_key() {
        let scheduler = InMemoryScheduler::new();
        let first = scheduler
            .schedule("reminder", Value::Null, Utc::now(), "turn-1")
            .await
            .unwrap_or_default();
        let second = scheduler
            .schedule("reminder", Value::Null, Utc::now(), "turn-1")
            .await
            .unwrap_or_default();
        assert_eq!(first, second);
        assert_eq!(scheduler.job_count(), 1);
    }

    #[tokio::test]
    async fn test_search_cache_expires() {
        let cache = InMemorySearchCache::new();
        let tenant = Uuid::new_v4();
        cache
            .put(tenant, "hours", Value::from("9-5"), Duration::from_secs(0))
            .await;
        assert!(cache.get(tenant, "hours").await.is_none());

        cache
            .put(tenant, "hours", Value::from("9-5"), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get(tenant, "hours").await, Some(Value::from("9-5")));
    }
}
