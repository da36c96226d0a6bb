// ABOUTME: Document ingestion and parsing tools with tiered page-based pricing
// ABOUTME: Extracted content is parked in the expiring blob store for the dashboard to collect
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{charge, require_tenant, track, with_timeout, ToolDeps};
use crate::config::DocumentParseMode;
use crate::tools::{require_str, AgentTool, ToolContext, ToolResponse};

/// Parked content survives this long for the dashboard to pick up
const BLOB_TTL: Duration = Duration::from_secs(60 * 60);

/// Largest accepted document
const MAX_PAGES: u32 = 500;

/// Queues a document's content for ingestion into the knowledge base
pub struct IngestDocumentTool {
    deps: Arc<ToolDeps>,
}

impl IngestDocumentTool {
    /// Build the tool
    #[must_use]
    pub fn new(deps: Arc<ToolDeps>) -> Self {
        Self { deps }
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> ToolResponse {
        let chatbot_id = match require_tenant(ctx, "ingest_document") {
            Ok(id) => id,
            Err(fail) => return fail,
        };
        let title = match require_str(input, "title") {
            Ok(v) => v,
            Err(fail) => return fail,
        };
        let content = match require_str(input, "content") {
            Ok(v) => v,
            Err(fail) => return fail,
        };

        if let Err(fail) = charge(&self.deps, ctx, self.deps.costs.document_ingest).await {
            return fail;
        }

        let blob_key = format!("ingest/{chatbot_id}/{}", Uuid::new_v4());
        match with_timeout(
            "storage",
            self.deps.collaborators.blob_store.put(
                &blob_key,
                content.as_bytes().to_vec(),
                BLOB_TTL,
            ),
        )
        .await
        {
            Ok(()) => ToolResponse::ok_with_data(
                format!("'{title}' is queued for ingestion into the knowledge base"),
                json!({ "blob_key": blob_key }),
            ),
            Err(fail) => fail,
        }
    }
}

#[async_trait]
impl AgentTool for IngestDocumentTool {
    fn name(&self) -> &'static str {
        "ingest_document"
    }

    fn description(&self) -> &'static str {
        "Queue pasted document content for ingestion into the chatbot's knowledge base"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "content": { "type": "string" }
            },
            "required": ["title", "content"]
        })
    }

    fn tenant_only(&self) -> bool {
        true
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> ToolResponse {
        let response = self.execute(&input, ctx).await;
        track(
            &self.deps,
            ctx,
            self.name(),
            &response,
            json!({ "title": input.get("title") }),
        );
        response
    }
}

/// Parses an uploaded document, priced by page count and mode
pub struct ParseDocumentTool {
    deps: Arc<ToolDeps>,
}

impl ParseDocumentTool {
    /// Build the tool
    #[must_use]
    pub fn new(deps: Arc<ToolDeps>) -> Self {
        Self { deps }
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> ToolResponse {
        let chatbot_id = match require_tenant(ctx, "parse_document") {
            Ok(id) => id,
            Err(fail) => return fail,
        };
        let blob_key = match require_str(input, "blob_key") {
            Ok(v) => v,
            Err(fail) => return fail,
        };
        let Some(pages) = input.get("pages").and_then(Value::as_u64) else {
            return ToolResponse::fail("Missing required field 'pages'");
        };
        let pages = pages as u32;
        if pages == 0 || pages > MAX_PAGES {
            return ToolResponse::fail(format!(
                "Page count must be between 1 and {MAX_PAGES}"
            ));
        }

        let mode = match input.get("mode").and_then(Value::as_str) {
            Some("ocr") => DocumentParseMode::Ocr,
            None | Some("standard") => DocumentParseMode::Standard,
            Some(other) => {
                return ToolResponse::fail(format!("Unknown parse mode '{other}'"));
            }
        };

        let cost = self.deps.costs.document_parse_cost(mode, pages);
        if let Err(fail) = charge(&self.deps, ctx, cost).await {
            return fail;
        }

        let blobs = &self.deps.collaborators.blob_store;
        let Some(raw) = blobs.get(blob_key).await else {
            return ToolResponse::fail(
                "The uploaded document has expired. Please upload it again.",
            );
        };

        // Parsing proper is delegated upstream; here the text is normalized
        // and parked for the dashboard import flow
        let text = String::from_utf8_lossy(&raw).into_owned();
        let parsed_key = format!("parsed/{chatbot_id}/{}", Uuid::new_v4());
        if let Err(fail) = with_timeout(
            "storage",
            blobs.put(&parsed_key, text.into_bytes(), BLOB_TTL),
        )
        .await
        {
            return fail;
        }

        ToolResponse::ok_with_data(
            format!("Parsed {pages} pages ({cost} credits)"),
            json!({ "parsed_key": parsed_key, "pages": pages, "credits_charged": cost }),
        )
    }
}

#[async_trait]
impl AgentTool for ParseDocumentTool {
    fn name(&self) -> &'static str {
        "parse_document"
    }

    fn description(&self) -> &'static str {
        "Parse a previously uploaded document into text; cost scales with page count"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "blob_key": { "type": "string", "description": "Key returned at upload time" },
                "pages": { "type": "integer" },
                "mode": { "type": "string", "enum": ["standard", "ocr"] }
            },
            "required": ["blob_key", "pages"]
        })
    }

    fn tenant_only(&self) -> bool {
        true
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> ToolResponse {
        let response = self.execute(&input, ctx).await;
        track(
            &self.deps,
            ctx,
            self.name(),
            &response,
            json!({ "pages": input.get("pages"), "mode": input.get("mode") }),
        );
        response
    }
}
