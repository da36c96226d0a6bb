// ABOUTME: Main library entry point for the Ghosty chatbot platform core
// ABOUTME: Agent execution, plan gating, tool dispatch, and credit metering
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

#![deny(unsafe_code)]

//! # Ghosty Server
//!
//! The agent execution and credit metering core of the Ghosty chatbot
//! platform. Each tenant owns one or more chatbots backed by an LLM agent;
//! this crate resolves a safe, plan-compliant execution configuration for
//! every chat turn, gates which tools the agent may call, drives the
//! streaming tool-calling loop, and meters consumption against a two-pool
//! credit ledger.
//!
//! ## Architecture
//!
//! - **Plans**: static per-tier limits (models, tokens, context, credits)
//! - **Agent**: config resolver, model validator, and the workflow runner
//! - **Tools**: the invocation contract, per-turn gating, and handlers
//! - **Credits**: atomic two-pool spend with purchased-first ordering
//! - **LLM**: provider SPI with streaming and tool calling
//! - **Storage**: pluggable persistence (in-memory, SQLite)
//! - **External**: collaborator traits for search, payments, email, calendar,
//!   scheduling, and shared caches
//!
//! ## Example
//!
//! ```rust,no_run
//! use ghosty_server::agent::resolve;
//! use ghosty_server::models::ChatbotDefinition;
//!
//! let chatbot = ChatbotDefinition::platform_assistant();
//! let config = resolve(&chatbot, "pro");
//! assert!(config.temperature <= 1.5);
//! ```

/// Agent execution core: config resolution, validation, workflow runner
pub mod agent;

/// Configuration management: environment settings and the tool cost table
pub mod config;

/// Two-pool credit ledger with atomic spend and rollback
pub mod credits;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// External collaborator interfaces and in-memory reference implementations
pub mod external;

/// LLM provider abstraction layer
pub mod llm;

/// Logging configuration and structured logging setup
pub mod logging;

/// Core domain models
pub mod models;

/// Subscription plan catalog
pub mod plans;

/// Shared server resource container
pub mod resources;

/// HTTP routes
pub mod routes;

/// Storage abstraction layer with pluggable backends
pub mod storage;

/// Tool invocation contract, registry, and handlers
pub mod tools;
