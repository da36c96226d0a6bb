// ABOUTME: Shared test fixtures: in-memory harness, chatbot builders, scripted LLM provider
// ABOUTME: Used by the integration tests; no network and no real provider keys
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use ghosty_server::config::ToolCostTable;
use ghosty_server::credits::CreditsLedger;
use ghosty_server::errors::AppError;
use ghosty_server::external::{
    in_memory_collaborators, Collaborators, ContextSearch, InMemoryContextSearch,
};
use ghosty_server::llm::{
    ChatRequest, ChatResponse, ChatResponseWithTools, ChatStream, FunctionCall, LlmCapabilities,
    LlmProvider, StreamChunk, Tool,
};
use ghosty_server::models::{ChatbotDefinition, ContextItem, ContextSource, IntegrationMap};
use ghosty_server::plans::Plan;
use ghosty_server::storage::{MemoryStorage, Storage};
use ghosty_server::tools::handlers::ToolDeps;
use ghosty_server::tools::{ToolContext, ToolRegistry, UsageTracker};

/// Everything the integration tests need, wired over in-memory backends
pub struct TestHarness {
    pub storage: Arc<dyn Storage>,
    pub ledger: Arc<CreditsLedger>,
    pub tracker: UsageTracker,
    pub registry: ToolRegistry,
    pub collaborators: Collaborators,
    pub deps: Arc<ToolDeps>,
    /// Concrete handle for seeding the retrieval index
    pub context_search: Arc<InMemoryContextSearch>,
}

/// Build a harness; must run inside a tokio runtime
pub fn harness() -> TestHarness {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let ledger = Arc::new(CreditsLedger::new(Arc::clone(&storage)));
    let tracker = UsageTracker::spawn(Arc::clone(&storage));
    let context_search = Arc::new(InMemoryContextSearch::new());
    let mut collaborators = in_memory_collaborators();
    collaborators.context_search = Arc::clone(&context_search) as Arc<dyn ContextSearch>;

    let deps = Arc::new(ToolDeps {
        storage: Arc::clone(&storage),
        ledger: Arc::clone(&ledger),
        tracker: tracker.clone(),
        costs: Arc::new(ToolCostTable::default()),
        collaborators: collaborators.clone(),
    });
    let registry = ToolRegistry::new(Arc::clone(&deps));

    TestHarness {
        storage,
        ledger,
        tracker,
        registry,
        collaborators,
        deps,
        context_search,
    }
}

/// A tenant chatbot with sensible defaults
pub fn tenant_chatbot(user_id: Uuid) -> ChatbotDefinition {
    ChatbotDefinition {
        id: Uuid::new_v4(),
        user_id,
        name: "Support Bot".to_owned(),
        slug: "support-bot".to_owned(),
        instructions: "Answer questions about Acme products.".to_owned(),
        custom_instructions: String::new(),
        personality: "friendly".to_owned(),
        model: "gpt-4o-mini".to_owned(),
        temperature: 0.7,
        max_tokens: None,
        welcome_message: "Welcome!".to_owned(),
        goodbye_message: "Bye!".to_owned(),
        accent_color: "#222222".to_owned(),
        context_items: Vec::new(),
        created_at: Utc::now(),
    }
}

/// A context item of the given size
pub fn context_item(title: &str, size_kb: u32) -> ContextItem {
    ContextItem {
        title: title.to_owned(),
        content: format!("content of {title}"),
        size_kb,
        source: ContextSource::Document,
    }
}

/// A tool context for a tenant turn
pub fn tenant_ctx(user_id: Uuid, chatbot_id: Uuid, plan: Plan) -> ToolContext {
    ToolContext {
        user_id,
        plan,
        chatbot_id: Some(chatbot_id),
        message: "hello".to_owned(),
        conversation_id: Some("conv-1".to_owned()),
        integrations: IntegrationMap::new(),
    }
}

/// A tool context for a platform-assistant turn
pub fn platform_ctx(user_id: Uuid, plan: Plan) -> ToolContext {
    ToolContext {
        user_id,
        plan,
        chatbot_id: None,
        message: "hello".to_owned(),
        conversation_id: Some("conv-ghosty".to_owned()),
        integrations: IntegrationMap::new(),
    }
}

/// One scripted step for the provider
pub enum ScriptStep {
    /// Return a text-only response
    Text(&'static str),
    /// Return tool calls (with optional accompanying text)
    Calls(Option<&'static str>, Vec<FunctionCall>),
    /// Fail with the given error
    Fail(AppError),
}

/// LLM provider that replays a script; streaming yields `stream_chunks`
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<ScriptStep>>,
    stream_chunks: Vec<&'static str>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            stream_chunks: Vec::new(),
        }
    }

    pub fn streaming(chunks: Vec<&'static str>) -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            stream_chunks: chunks,
        }
    }

    async fn next_step(&self) -> ScriptStep {
        self.steps
            .lock()
            .await
            .pop_front()
            .unwrap_or(ScriptStep::Text("fallback"))
    }
}

pub fn call(name: &str, args: serde_json::Value) -> FunctionCall {
    FunctionCall {
        name: name.to_owned(),
        args,
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::full_featured()
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse, AppError> {
        match self.next_step().await {
            ScriptStep::Text(text) => Ok(ChatResponse {
                content: text.to_owned(),
                model: "scripted-model".to_owned(),
                usage: None,
                finish_reason: Some("stop".to_owned()),
            }),
            ScriptStep::Calls(..) => Err(AppError::internal("script expected text")),
            ScriptStep::Fail(e) => Err(e),
        }
    }

    async fn complete_with_tools(
        &self,
        _request: &ChatRequest,
        _tools: Option<Vec<Tool>>,
    ) -> Result<ChatResponseWithTools, AppError> {
        match self.next_step().await {
            ScriptStep::Text(text) => Ok(ChatResponseWithTools {
                content: Some(text.to_owned()),
                function_calls: None,
                model: "scripted-model".to_owned(),
                usage: None,
                finish_reason: Some("stop".to_owned()),
            }),
            ScriptStep::Calls(text, calls) => Ok(ChatResponseWithTools {
                content: text.map(str::to_owned),
                function_calls: Some(calls),
                model: "scripted-model".to_owned(),
                usage: None,
                finish_reason: Some("tool_calls".to_owned()),
            }),
            ScriptStep::Fail(e) => Err(e),
        }
    }

    async fn complete_stream(&self, _request: &ChatRequest) -> Result<ChatStream, AppError> {
        let chunks: Vec<Result<StreamChunk, AppError>> = self
            .stream_chunks
            .iter()
            .map(|text| {
                Ok(StreamChunk {
                    delta: (*text).to_owned(),
                    is_final: false,
                    finish_reason: None,
                })
            })
            .collect();
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(true)
    }
}
