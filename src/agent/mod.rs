// ABOUTME: Agent execution core: config resolution, model validation, workflow runner
// ABOUTME: Everything needed to turn one chat message into a safe, metered, streamed reply
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Agent Execution Core
//!
//! Per-turn pipeline: [`resolver::resolve`] produces an immutable
//! [`ResolvedConfig`] with every safety clamp applied, the tool registry
//! produces the turn's tool set, and [`runner::AgentWorkflowRunner`] drives
//! the streaming tool-calling loop.
//!
//! Authorization is the one early exit: [`ensure_agent_access`] must run
//! before any LLM call is made. Everything else degrades instead of failing.

/// Config resolution with safety clamps
pub mod resolver;
/// Streaming workflow runner
pub mod runner;
/// Plan-based model validation
pub mod validator;

pub use resolver::{resolve, ResolvedConfig};
pub use runner::{AgentEvent, AgentWorkflowRunner};
pub use validator::{validate, ModelValidation};

use crate::errors::{AppError, AppResult};
use crate::plans::Plan;

/// Hard authorization gate: FREE has zero agent access
///
/// This is the one error category that must stop the turn before any LLM call
/// is made. The resolver itself never fails; callers run this first.
///
/// # Errors
///
/// Returns `PLAN_ACCESS_DENIED` with an upgrade message for the FREE plan.
pub fn ensure_agent_access(plan: Plan) -> AppResult<()> {
    if plan.has_agent_access() {
        Ok(())
    } else {
        Err(AppError::plan_denied(
            "AI chat is not included in the free plan. Upgrade to Starter or higher to enable it.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_is_denied_before_any_llm_call() {
        assert!(ensure_agent_access(Plan::Free).is_err());
        assert!(ensure_agent_access(Plan::Starter).is_ok());
        assert!(ensure_agent_access(Plan::Anonymous).is_ok());
    }
}
