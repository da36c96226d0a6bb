// ABOUTME: Read-only knowledge-base search tool, the one tool every plan receives
// ABOUTME: Charges the context-query cost and relays retrieval hits to the model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{charge, track, with_timeout, ToolDeps};
use crate::tools::{require_str, AgentTool, ToolAccess, ToolContext, ToolResponse};

/// How many hits to request from retrieval
const TOP_K: usize = 5;

/// Searches the chatbot's indexed knowledge base
pub struct QueryKnowledgeBaseTool {
    deps: Arc<ToolDeps>,
}

impl QueryKnowledgeBaseTool {
    /// Build the tool
    #[must_use]
    pub fn new(deps: Arc<ToolDeps>) -> Self {
        Self { deps }
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> ToolResponse {
        let query = match require_str(input, "query") {
            Ok(q) => q,
            Err(fail) => return fail,
        };

        if let Err(fail) = charge(&self.deps, ctx, self.deps.costs.context_query).await {
            return fail;
        }

        // The platform assistant searches platform docs indexed under the nil tenant
        let tenant_id = ctx.chatbot_id.unwrap_or(uuid::Uuid::nil());
        let hits = match with_timeout(
            "search",
            self.deps
                .collaborators
                .context_search
                .search(query, tenant_id, TOP_K),
        )
        .await
        {
            Ok(hits) => hits,
            Err(fail) => return fail,
        };

        if hits.is_empty() {
            return ToolResponse::ok_with_data(
                "No matching content found in the knowledge base",
                json!({ "hits": [] }),
            );
        }

        let payload: Vec<Value> = hits
            .iter()
            .map(|h| json!({ "content": h.content, "score": h.score }))
            .collect();
        ToolResponse::ok_with_data(
            format!("Found {} relevant knowledge base entries", hits.len()),
            json!({ "hits": payload }),
        )
    }
}

#[async_trait]
impl AgentTool for QueryKnowledgeBaseTool {
    fn name(&self) -> &'static str {
        "query_knowledge_base"
    }

    fn description(&self) -> &'static str {
        "Search the chatbot's knowledge base for content relevant to the user's question"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "What to search for" }
            },
            "required": ["query"]
        })
    }

    fn minimum_access(&self) -> ToolAccess {
        ToolAccess::ReadOnly
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
