// ABOUTME: Unified chat provider selector keyed by an explicit model-family tag
// ABOUTME: Families are resolved once at configuration time, never re-parsed per call
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Chat Provider Selector
//!
//! [`ModelFamily`] is the explicit tagged union of supported providers. The
//! config resolver tags every [`crate::agent::ResolvedConfig`] with a family
//! exactly once; the rest of the system dispatches on the tag and never
//! inspects model-name strings again.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    ChatRequest, ChatResponse, ChatResponseWithTools, ChatStream, LlmCapabilities, LlmProvider,
    OpenAiCompatibleConfig, OpenAiCompatibleProvider, Tool,
};
use crate::config::environment::LlmEndpoint;
use crate::errors::AppError;

/// Supported LLM provider families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// `OpenAI` chat models (gpt-*)
    OpenAi,
    /// Google Gemini models (gemini-*), served via the `OpenAI`-compatible surface
    Gemini,
}

impl ModelFamily {
    /// Classify a model name into its provider family
    ///
    /// This runs once, inside config resolution. Unknown names default to the
    /// `OpenAI` family, matching the catalog's default models.
    #[must_use]
    pub fn from_model(model: &str) -> Self {
        if model.starts_with("gemini") {
            Self::Gemini
        } else {
            Self::OpenAi
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => f.write_str("openai"),
            Self::Gemini => f.write_str("gemini"),
        }
    }
}

/// Unified chat provider over the configured endpoints
///
/// Both variants are backed by the generic `OpenAI`-compatible client with
/// family-specific endpoint configuration.
pub enum ChatProvider {
    /// `OpenAI` endpoint
    OpenAi(OpenAiCompatibleProvider),
    /// Gemini endpoint
    Gemini(OpenAiCompatibleProvider),
}

impl ChatProvider {
    /// Build the provider for a resolved model family
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn for_family(
        family: ModelFamily,
        endpoint: &LlmEndpoint,
        default_model: String,
    ) -> Result<Self, AppError> {
        let config = OpenAiCompatibleConfig {
            base_url: endpoint.base_url.clone(),
            api_key: endpoint.api_key.clone(),
            default_model,
            provider_name: match family {
                ModelFamily::OpenAi => "openai",
                ModelFamily::Gemini => "gemini",
            },
            capabilities: LlmCapabilities::full_featured(),
        };
        let provider = OpenAiCompatibleProvider::new(config)?;
        Ok(match family {
            ModelFamily::OpenAi => Self::OpenAi(provider),
            ModelFamily::Gemini => Self::Gemini(provider),
        })
    }

    /// Get the provider family
    #[must_use]
    pub const fn family(&self) -> ModelFamily {
        match self {
            Self::OpenAi(_) => ModelFamily::OpenAi,
            Self::Gemini(_) => ModelFamily::Gemini,
        }
    }
}

impl fmt::Debug for ChatProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi(_) => f.debug_tuple("ChatProvider::OpenAi").finish(),
            Self::Gemini(_) => f.debug_tuple("ChatProvider::Gemini").finish(),
        }
    }
}

#[async_trait]
impl LlmProvider for ChatProvider {
    fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(p) | Self::Gemini(p) => p.name(),
        }
    }

    fn capabilities(&self) -> LlmCapabilities {
        match self {
            Self::OpenAi(p) | Self::Gemini(p) => p.capabilities(),
        }
    }

    fn default_model(&self) -> &str {
        match self {
            Self::OpenAi(p) | Self::Gemini(p) => p.default_model(),
        }
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        match self {
            Self::OpenAi(p) | Self::Gemini(p) => p.complete(request).await,
        }
    }

    async fn complete_with_tools(
        &self,
        request: &ChatRequest,
        tools: Option<Vec<Tool>>,
    ) -> Result<ChatResponseWithTools, AppError> {
        match self {
            Self::OpenAi(p) | Self::Gemini(p) => p.complete_with_tools(request, tools).await,
        }
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        match self {
            Self::OpenAi(p) | Self::Gemini(p) => p.complete_stream(request).await,
        }
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        match self {
            Self::OpenAi(p) | Self::Gemini(p) => p.health_check().await,
        }
    }
}
