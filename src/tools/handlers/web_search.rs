// ABOUTME: External web search tool with a per-conversation daily quota
// ABOUTME: Results are cached per tenant+query through the injected search cache
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use super::{charge, track, with_timeout, ToolDeps};
use crate::tools::{require_str, AgentTool, ToolAccess, ToolContext, ToolResponse};

/// Searches allowed per conversation per UTC day
const DAILY_SEARCH_LIMIT: u64 = 10;

/// Results requested from the search API
const MAX_RESULTS: usize = 5;

/// Cache lifetime for one query's results
const CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Searches the web for information outside the knowledge base
pub struct WebSearchTool {
    deps: Arc<ToolDeps>,
}

impl WebSearchTool {
    /// Build the tool
    #[must_use]
    pub fn new(deps: Arc<ToolDeps>) -> Self {
        Self { deps }
    }

    /// Daily quota check against persisted usage records
    async fn over_daily_limit(&self, ctx: &ToolContext) -> bool {
        let midnight = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map_or_else(Utc::now, |t| t.and_utc());

        match self
            .deps
            .storage
            .count_tool_usage_since(&ctx.conversation_scope(), "web_search", midnight)
            .await
        {
            Ok(count) => count >= DAILY_SEARCH_LIMIT,
            Err(e) => {
                // Quota cannot be verified; let the search through rather than
                // failing the turn on an audit-store hiccup
                warn!("Web search quota check failed: {e}");
                false
            }
        }
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> ToolResponse {
        let query = match require_str(input, "query") {
            Ok(q) => q,
            Err(fail) => return fail,
        };

        if self.over_daily_limit(ctx).await {
            return ToolResponse::fail(format!(
                "The daily limit of {DAILY_SEARCH_LIMIT} web searches for this conversation has \
                 been reached. Try again tomorrow."
            ));
        }

        let tenant_id = ctx.chatbot_id.unwrap_or(Uuid::nil());
        let cache = &self.deps.collaborators.search_cache;
        if let Some(cached) = cache.get(tenant_id, query).await {
            return ToolResponse::ok_with_data("Found cached search results", cached);
        }

        if let Err(fail) = charge(&self.deps, ctx, self.deps.costs.web_search).await {
            return fail;
        }

        let results = match with_timeout(
            "web search",
            self.deps.collaborators.web_search.search(query, MAX_RESULTS),
        )
        .await
        {
            Ok(results) => results,
            Err(fail) => return fail,
        };

        let payload = json!({
            "results": results
                .iter()
                .map(|r| json!({ "title": r.title, "url": r.url, "snippet": r.snippet }))
                .collect::<Vec<_>>()
        });
        cache.put(tenant_id, query, payload.clone(), CACHE_TTL).await;

        ToolResponse::ok_with_data(
            format!("Found {} web results", results.len()),
            payload,
        )
    }
}

#[async_trait]
impl AgentTool for WebSearchTool {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> &'static str {
        "Search the public web for current information not covered by the knowledge base"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" }
            },
            "required": ["query"]
        })
    }

    fn minimum_access(&self) -> ToolAccess {
        ToolAccess::Core
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> ToolResponse {
        let response = self.execute(&input, ctx).await;
        track(
            &self.deps,
            ctx,
            self.name(),
            &response,
            json!({ "query": input.get("query") }),
        );
        response
    }
}
