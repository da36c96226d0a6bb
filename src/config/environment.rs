// ABOUTME: Environment-driven server configuration for ports, storage, and LLM endpoints
// ABOUTME: Reads GHOSTY_* variables with development-friendly defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Server Configuration
//!
//! Environment-only configuration. Every knob has a development default so a
//! bare `ghosty-server` starts against in-memory storage with no provider
//! keys; production deployments set the `GHOSTY_*` variables explicitly.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::info;

use crate::errors::{AppError, AppResult};

/// Default HTTP port
const DEFAULT_HTTP_PORT: u16 = 8081;

/// Default wall-clock timeout for one LLM provider call, in seconds
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 45;

/// Default bounded retry count for transient provider failures
const DEFAULT_LLM_MAX_RETRIES: u32 = 2;

/// Endpoint configuration for one model family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmEndpoint {
    /// Base URL of the chat-completions API
    pub base_url: String,
    /// API key; empty means unauthenticated (local endpoints)
    pub api_key: Option<String>,
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind port
    pub http_port: u16,
    /// Storage URL; `memory:` or `sqlite:<path>`
    pub database_url: String,
    /// OpenAI-family endpoint
    pub openai: LlmEndpoint,
    /// Gemini-family endpoint (OpenAI-compatible surface)
    pub gemini: LlmEndpoint,
    /// Wall-clock timeout for one provider call, seconds
    pub llm_timeout_secs: u64,
    /// Bounded retry count for transient provider failures
    pub llm_max_retries: u32,
    /// Log format: "pretty" or "json"
    pub log_format: String,
}

impl ServerConfig {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a numeric variable fails to parse.
    pub fn from_env() -> AppResult<Self> {
        let http_port = parse_env("GHOSTY_HTTP_PORT", DEFAULT_HTTP_PORT)?;
        let database_url =
            env::var("GHOSTY_DATABASE_URL").unwrap_or_else(|_| "memory:".to_owned());

        let openai = LlmEndpoint {
            base_url: env::var("GHOSTY_OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_owned()),
            api_key: env::var("GHOSTY_OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
        };
        let gemini = LlmEndpoint {
            base_url: env::var("GHOSTY_GEMINI_BASE_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta/openai".to_owned()
            }),
            api_key: env::var("GHOSTY_GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
        };

        let config = Self {
            http_port,
            database_url,
            openai,
            gemini,
            llm_timeout_secs: parse_env("GHOSTY_LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS)?,
            llm_max_retries: parse_env("GHOSTY_LLM_MAX_RETRIES", DEFAULT_LLM_MAX_RETRIES)?,
            log_format: env::var("GHOSTY_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_owned()),
        };

        info!(
            "Server configuration loaded: port={}, storage={}",
            config.http_port,
            config.storage_kind()
        );

        Ok(config)
    }

    /// Coarse storage backend label for logs
    #[must_use]
    pub fn storage_kind(&self) -> &'static str {
        if self.database_url.starts_with("sqlite") {
            "sqlite"
        } else {
            "memory"
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            database_url: "memory:".to_owned(),
            openai: LlmEndpoint {
                base_url: "https://api.openai.com/v1".to_owned(),
                api_key: None,
            },
            gemini: LlmEndpoint {
                base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_owned(),
                api_key: None,
            },
            llm_timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            llm_max_retries: DEFAULT_LLM_MAX_RETRIES,
            log_format: "pretty".to_owned(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> AppResult<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::config(format!("{key} has an invalid value: {raw}"))),
        Err(_) => Ok(default),
    }
}
