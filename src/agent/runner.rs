// ABOUTME: Streaming agent workflow runner: one LLM tool-calling loop per chat turn
// ABOUTME: Emits a typed event sequence and always terminates with done or error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Agent Workflow Runner
//!
//! Drives one streaming agent loop per turn and yields typed events:
//! `tool-start`, `chunk`, `error`, `done`. Tool-start reports invocation, not
//! outcome; a failed tool still counted as invoked, and its failure message
//! is relayed to the model as the tool's result so the model can tell the
//! user.
//!
//! Guarantees:
//! - every provider call runs under a wall-clock timeout with bounded retries
//! - any uncaught failure becomes exactly one terminal `error` event with a
//!   user-safe message; internals are server-logged only
//! - when at least one tool executed but zero content chunks streamed, one
//!   generic acknowledgement chunk is synthesized so the caller never
//!   receives an empty transcript after tool use
//! - the stream always terminates with `done` or `error`

use async_stream::stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::{Stream, StreamExt};
use tracing::{error, info, warn};

use super::ResolvedConfig;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::llm::{prompts, ChatMessage, ChatRequest, ChatResponseWithTools, LlmProvider, Tool};
use crate::tools::{ToolContext, ToolSet};

/// Maximum tool-calling iterations before forcing a text response
const MAX_TOOL_ITERATIONS: usize = 10;

/// Default wall-clock budget for one provider call
const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(45);

/// Default bounded retry count for transient provider failures
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Acknowledgement chunk synthesized when tools ran but nothing streamed
const TOOL_ONLY_ACKNOWLEDGEMENT: &str = "Done! Is there anything else I can help you with?";

/// One typed event in the turn's stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentEvent {
    /// A tool invocation started (reports invocation, not outcome)
    #[serde(rename_all = "camelCase")]
    ToolStart {
        /// Name of the invoked tool
        tool_name: String,
    },
    /// A piece of assistant text
    Chunk {
        /// Text delta
        text: String,
    },
    /// Terminal failure; no further events follow
    Error {
        /// User-safe message
        message: String,
    },
    /// Terminal success; no further events follow
    #[serde(rename_all = "camelCase")]
    Done {
        /// Tools invoked this turn, in order
        tools_used: Vec<String>,
        /// Number of tool invocations
        tool_count: u32,
    },
}

/// Per-turn workflow runner
///
/// Constructed from the resolved config and the turn's tool set, consumed by
/// [`AgentWorkflowRunner::run`].
pub struct AgentWorkflowRunner {
    provider: Arc<dyn LlmProvider>,
    config: ResolvedConfig,
    tools: ToolSet,
    llm_timeout: Duration,
    max_retries: u32,
}

impl AgentWorkflowRunner {
    /// Build a runner with default timeout and retry limits
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: ResolvedConfig, tools: ToolSet) -> Self {
        Self {
            provider,
            config,
            tools,
            llm_timeout: DEFAULT_LLM_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the provider-call timeout and retry budget
    #[must_use]
    pub const fn with_limits(mut self, llm_timeout: Duration, max_retries: u32) -> Self {
        self.llm_timeout = llm_timeout;
        self.max_retries = max_retries;
        self
    }

    /// Run the turn, yielding the event stream
    ///
    /// `history` is the prior conversation as role/content pairs; the user's
    /// new message comes from `ctx.message`.
    pub fn run(
        self,
        ctx: ToolContext,
        history: Vec<ChatMessage>,
    ) -> impl Stream<Item = AgentEvent> + Send {
        stream! {
            let mut tools_used: Vec<String> = Vec::new();
            let mut tool_count: u32 = 0;
            let mut chunks_emitted: u32 = 0;

            let mut messages = self.build_messages(&ctx, history);

            if self.tools.is_empty() && !self.provider.capabilities().supports_streaming() {
                // Degenerate provider: one-shot completion, emitted as a single chunk
                match self.complete_once(&messages).await {
                    Ok(text) => {
                        if !text.is_empty() {
                            chunks_emitted += 1;
                            yield AgentEvent::Chunk { text };
                        }
                    }
                    Err(e) => {
                        error!("LLM completion failed: {e}");
                        yield AgentEvent::Error { message: user_safe_message(&e) };
                        return;
                    }
                }
            } else if self.tools.is_empty() {
                // No tools this turn: stream the reply directly
                match self.open_stream(&messages).await {
                    Ok(mut llm_stream) => {
                        while let Some(chunk_result) = llm_stream.next().await {
                            match chunk_result {
                                Ok(chunk) => {
                                    if !chunk.delta.is_empty() {
                                        chunks_emitted += 1;
                                        yield AgentEvent::Chunk { text: chunk.delta };
                                    }
                                }
                                Err(e) => {
                                    error!("Streaming failed mid-turn: {e}");
                                    yield AgentEvent::Error { message: user_safe_message(&e) };
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("Failed to open LLM stream: {e}");
                        yield AgentEvent::Error { message: user_safe_message(&e) };
                        return;
                    }
                }
            } else {
                let declarations = self.tools.declarations();

                for iteration in 0..MAX_TOOL_ITERATIONS {
                    let response = match self.call_with_retry(&messages, &declarations).await {
                        Ok(response) => response,
                        Err(e) => {
                            error!(iteration, "LLM call failed: {e}");
                            yield AgentEvent::Error { message: user_safe_message(&e) };
                            return;
                        }
                    };

                    let calls = response.function_calls.clone().unwrap_or_default();
                    if calls.is_empty() {
                        if let Some(text) = non_empty(response.content) {
                            chunks_emitted += 1;
                            yield AgentEvent::Chunk { text };
                        }
                        break;
                    }

                    info!(iteration, count = calls.len(), "Executing tool calls");

                    // Interim assistant text accompanies the calls
                    if let Some(text) = non_empty(response.content) {
                        chunks_emitted += 1;
                        messages.push(ChatMessage::assistant(&text));
                        yield AgentEvent::Chunk { text };
                    }

                    for call in &calls {
                        tool_count += 1;
                        tools_used.push(call.name.clone());
                        yield AgentEvent::ToolStart { tool_name: call.name.clone() };

                        let result = self.tools.dispatch(call, &ctx).await;
                        let result_json = serde_json::to_string(&result)
                            .unwrap_or_else(|_| "{}".to_owned());
                        messages.push(ChatMessage::user(format!(
                            "[Tool Result for {}]: {result_json}",
                            call.name
                        )));
                    }
                }
            }

            // A turn that only ran tools still needs a visible reply
            if tool_count > 0 && chunks_emitted == 0 {
                yield AgentEvent::Chunk { text: TOOL_ONLY_ACKNOWLEDGEMENT.to_owned() };
            }

            yield AgentEvent::Done { tools_used, tool_count };
        }
    }

    fn build_messages(&self, ctx: &ToolContext, history: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(prompts::build_system_prompt(&self.config)));
        messages.extend(history);
        messages.push(ChatMessage::user(&ctx.message));
        messages
    }

    fn base_request(&self, messages: &[ChatMessage]) -> ChatRequest {
        ChatRequest::new(messages.to_vec())
            .with_model(&self.config.model)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
    }

    async fn complete_once(&self, messages: &[ChatMessage]) -> AppResult<String> {
        let request = self.base_request(messages);
        let response = tokio::time::timeout(self.llm_timeout, self.provider.complete(&request))
            .await
            .map_err(|_| AppError::external_timeout("llm"))??;
        Ok(response.content)
    }

    async fn open_stream(
        &self,
        messages: &[ChatMessage],
    ) -> AppResult<crate::llm::ChatStream> {
        let request = self.base_request(messages).with_streaming();
        tokio::time::timeout(self.llm_timeout, self.provider.complete_stream(&request))
            .await
            .map_err(|_| AppError::external_timeout("llm"))?
    }

    /// One provider call under the wall-clock timeout, retried on transient
    /// failures up to the bounded retry count
    async fn call_with_retry(
        &self,
        messages: &[ChatMessage],
        declarations: &Tool,
    ) -> AppResult<ChatResponseWithTools> {
        let request = self.base_request(messages);
        let mut last_error: Option<AppError> = None;

        for attempt in 0..=self.max_retries {
            let call = self
                .provider
                .complete_with_tools(&request, Some(vec![declarations.clone()]));

            match tokio::time::timeout(self.llm_timeout, call).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) if is_transient(&e) && attempt < self.max_retries => {
                    warn!(attempt, "Transient LLM failure, retrying: {e}");
                    last_error = Some(e);
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!(attempt, "LLM call exceeded {:?}", self.llm_timeout);
                    last_error = Some(AppError::external_timeout("llm"));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::internal("LLM retries exhausted")))
    }
}

/// Whether an error is worth one more attempt
fn is_transient(error: &AppError) -> bool {
    matches!(
        error.code,
        ErrorCode::ExternalServiceError | ErrorCode::ExternalRateLimited | ErrorCode::ExternalTimeout
    )
}

/// Map an internal error to the single user-safe line the stream may carry
fn user_safe_message(error: &AppError) -> String {
    match error.code {
        ErrorCode::ExternalRateLimited => {
            "The AI service is busy right now. Please try again in a moment.".to_owned()
        }
        ErrorCode::ExternalTimeout => {
            "The assistant took too long to respond. Please try again.".to_owned()
        }
        _ => "Something went wrong while generating a response. Please try again.".to_owned(),
    }
}

fn non_empty(content: Option<String>) -> Option<String> {
    content.filter(|text| !text.is_empty())
}
