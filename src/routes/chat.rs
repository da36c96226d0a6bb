// ABOUTME: Chat turn route: resolves config, gates tools, runs the agent, streams SSE
// ABOUTME: Relays runner events as data: lines, then metadata, then the done sentinel
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! Chat turn streaming endpoint
//!
//! `POST /api/chat/turn` drives one agent turn and streams newline-delimited
//! JSON objects as server-sent events. The event sequence is the runner's
//! (`chunk`, `tool-start`, `error`, `done`), followed by one `metadata` event
//! carrying `toolsUsed`, the model name, and a session identifier, and closed
//! by the bare `{"type":"done"}` sentinel.
//!
//! FREE-plan callers are denied before any configuration is resolved or any
//! LLM client is built; that is the one hard-stop in the pipeline.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::info;
use uuid::Uuid;

use crate::agent::{ensure_agent_access, resolve, AgentEvent, AgentWorkflowRunner};
use crate::errors::AppError;
use crate::llm::{ChatMessage, ChatProvider, LlmProvider, ModelFamily};
use crate::models::{ChatbotDefinition, IntegrationMap};
use crate::plans::Plan;
use crate::resources::ServerResources;
use crate::tools::ToolContext;

/// One prior message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// "user", "assistant", or "system"
    pub role: String,
    /// Message text
    pub content: String,
}

/// Request body for one chat turn
#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    /// Authenticated caller (for widget turns, the chatbot owner)
    pub user_id: Uuid,
    /// Caller's plan string; "anonymous" for public widget turns
    pub plan: String,
    /// Chatbot to run; `null` selects the platform assistant
    #[serde(default)]
    pub chatbot_id: Option<Uuid>,
    /// The user's message
    pub message: String,
    /// Conversation identifier for transcript and rate-limit scoping
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Prior turns, oldest first
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
    /// Connected third-party integrations for the tenant
    #[serde(default)]
    pub integrations: HashMap<String, bool>,
}

/// Chat routes handler
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chat/turn", post(Self::run_turn))
            .with_state(resources)
    }

    /// Run one agent turn and stream its events
    async fn run_turn(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<TurnRequest>,
    ) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
        let plan = Plan::parse(&request.plan).unwrap_or(Plan::Anonymous);
        ensure_agent_access(plan)?;

        if request.message.trim().is_empty() {
            return Err(AppError::invalid_input("The message must not be empty"));
        }

        // Load the chatbot, or synthesize the platform assistant
        let chatbot = match request.chatbot_id {
            Some(chatbot_id) => resources
                .storage
                .chatbot(chatbot_id)
                .await?
                .ok_or_else(|| AppError::not_found("Chatbot"))?,
            None => ChatbotDefinition::platform_assistant(),
        };

        let config = resolve(&chatbot, &request.plan);
        info!(
            chatbot = %chatbot.id,
            model = %config.model,
            warnings = config.validation_warnings.len(),
            "Resolved turn configuration"
        );

        // Tool availability is recomputed on every turn; integration state
        // can change between requests
        let integrations = IntegrationMap::from_flags(&request.integrations);
        let tools = resources
            .tools
            .for_turn(plan, &integrations, request.chatbot_id.is_none());

        let endpoint = match config.model_family {
            ModelFamily::OpenAi => &resources.config.openai,
            ModelFamily::Gemini => &resources.config.gemini,
        };
        let provider: Arc<dyn LlmProvider> = Arc::new(ChatProvider::for_family(
            config.model_family,
            endpoint,
            config.model.clone(),
        )?);

        let model_name = config.model.clone();
        let runner = AgentWorkflowRunner::new(provider, config, tools).with_limits(
            Duration::from_secs(resources.config.llm_timeout_secs),
            resources.config.llm_max_retries,
        );

        let ctx = ToolContext {
            user_id: request.user_id,
            plan,
            chatbot_id: request.chatbot_id,
            message: request.message.clone(),
            conversation_id: request.conversation_id.clone(),
            integrations,
        };
        let history = build_history(&request.history);

        let session_id = Uuid::new_v4();
        let stream = async_stream::stream! {
            let mut tools_used: Vec<String> = Vec::new();
            let mut agent_stream = Box::pin(runner.run(ctx, history));

            while let Some(event) = agent_stream.next().await {
                if let AgentEvent::Done { tools_used: used, .. } = &event {
                    tools_used.clone_from(used);
                }
                let payload = serde_json::to_string(&event)
                    .unwrap_or_else(|_| "{\"type\":\"error\",\"message\":\"encoding failed\"}".to_owned());
                yield Ok(Event::default().data(payload));
            }

            // Trailing metadata, then the bare sentinel that closes the stream
            let metadata = json!({
                "type": "metadata",
                "toolsUsed": tools_used,
                "model": model_name,
                "sessionId": session_id,
            });
            yield Ok(Event::default().data(metadata.to_string()));
            yield Ok(Event::default().data("{\"type\":\"done\"}"));
        };

        Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
    }
}

fn build_history(history: &[HistoryMessage]) -> Vec<ChatMessage> {
    history
        .iter()
        .filter_map(|msg| match msg.role.as_str() {
            "user" => Some(ChatMessage::user(&msg.content)),
            "assistant" => Some(ChatMessage::assistant(&msg.content)),
            "system" => Some(ChatMessage::system(&msg.content)),
            _ => None,
        })
        .collect()
}
