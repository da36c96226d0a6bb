// ABOUTME: Per-turn configuration resolver applying plan limits and safety clamps
// ABOUTME: Always succeeds; every correction is recorded as an advisory warning
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Config Resolver
//!
//! Turns a tenant's chatbot record plus the caller's plan into one immutable
//! [`ResolvedConfig`]. The resolver never fails and never throws its warnings:
//! a degraded-but-available response beats a hard error at this layer.
//!
//! The anonymous path skips plan lookups but still runs the temperature and
//! token safety clamps. Public widgets are the last line of defense against
//! hallucination-inducing settings, so that path must never be skipped.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::validator;
use crate::llm::ModelFamily;
use crate::models::{ChatbotDefinition, ContextItem};
use crate::plans::{
    is_safety_sensitive_model, Plan, PlanLimits, ANONYMOUS_CONTEXT_CEILING_KB,
    ANONYMOUS_MAX_TOKENS,
};

/// Upper temperature bound; values above force exactly 1.0
const TEMPERATURE_CEILING: f32 = 1.5;

/// Fallback instructions when the tenant left the field empty
const DEFAULT_INSTRUCTIONS: &str =
    "You are a helpful assistant for this business. Answer questions using the provided \
     knowledge base and be honest when you do not know something.";

/// Fallback welcome message
const DEFAULT_WELCOME: &str = "Hi! How can I help you today?";

/// Fallback goodbye message
const DEFAULT_GOODBYE: &str = "Thanks for chatting!";

/// Fallback personality tag
const DEFAULT_PERSONALITY: &str = "friendly";

/// Final, safety-clamped execution parameters for one chat turn
///
/// Derived and immutable; created once per turn. `validation_warnings` is
/// advisory metadata describing every clamp that was applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Final model
    pub model: String,
    /// Provider family for the final model, resolved exactly once
    pub model_family: ModelFamily,
    /// Final sampling temperature, within `[0, 1.5]`
    pub temperature: f32,
    /// Final token ceiling
    pub max_tokens: u32,
    /// Final base instructions
    pub instructions: String,
    /// Final tenant custom instructions
    pub custom_instructions: String,
    /// Final personality tag
    pub personality: String,
    /// Final welcome message
    pub welcome_message: String,
    /// Final goodbye message
    pub goodbye_message: String,
    /// Size-capped context set (prefix of the chatbot's ordered list)
    pub context_items: Vec<ContextItem>,
    /// Plan limits snapshot for downstream logging
    pub plan_limits: PlanLimits,
    /// Human-readable description of every clamp that was applied
    pub validation_warnings: Vec<String>,
}

/// Resolve the execution configuration for one turn
///
/// `caller_plan` is the raw plan string from the authenticated request.
/// Unrecognized plans log a warning and fall back to the anonymous path
/// rather than failing the request.
#[must_use]
pub fn resolve(chatbot: &ChatbotDefinition, caller_plan: &str) -> ResolvedConfig {
    match Plan::parse(caller_plan) {
        Some(Plan::Anonymous) => resolve_anonymous(chatbot),
        Some(plan) => resolve_for_plan(chatbot, plan),
        None => {
            warn!(
                chatbot_id = %chatbot.id,
                plan = caller_plan,
                "Unrecognized plan; falling back to anonymous safety clamps"
            );
            resolve_anonymous(chatbot)
        }
    }
}

/// Anonymous path: no plan lookups, same safety clamps
fn resolve_anonymous(chatbot: &ChatbotDefinition) -> ResolvedConfig {
    let mut warnings = Vec::new();

    let temperature = clamp_temperature(&chatbot.model, chatbot.temperature, &mut warnings);
    let max_tokens = clamp_max_tokens(
        chatbot.max_tokens,
        ANONYMOUS_MAX_TOKENS,
        "widget ceiling",
        &mut warnings,
    );

    // Permissive placeholder limits, kept only for downstream logging symmetry
    let plan_limits = PlanLimits {
        max_tokens_per_query: ANONYMOUS_MAX_TOKENS,
        max_context_size_kb: ANONYMOUS_CONTEXT_CEILING_KB,
        available_models: vec![chatbot.model.clone()],
        default_model: chatbot.model.clone(),
        monthly_credit_quota: 0,
    };

    finish(
        chatbot,
        chatbot.model.clone(),
        temperature,
        max_tokens,
        chatbot.context_items.clone(),
        plan_limits,
        warnings,
    )
}

/// Recognized-plan path: model validation, clamps, and context truncation
fn resolve_for_plan(chatbot: &ChatbotDefinition, plan: Plan) -> ResolvedConfig {
    let mut warnings = Vec::new();
    let limits = plan.limits();

    let validation = validator::validate(plan, &chatbot.model);
    let model = if validation.is_valid {
        chatbot.model.clone()
    } else {
        match validation.corrected_model {
            Some(corrected) => {
                warnings.push(format!(
                    "Model '{}' is not available on the {plan} plan; using '{corrected}'",
                    chatbot.model
                ));
                corrected
            }
            // FREE reaches the resolver only when the caller skipped the
            // access gate; degrade to the catalog default rather than fail
            None => {
                warnings.push(format!(
                    "The {plan} plan has no model access; using '{}'",
                    limits.default_model
                ));
                limits.default_model.clone()
            }
        }
    };

    let temperature = clamp_temperature(&model, chatbot.temperature, &mut warnings);
    let max_tokens = clamp_max_tokens(
        chatbot.max_tokens,
        limits.max_tokens_per_query,
        "plan ceiling",
        &mut warnings,
    );
    let context_items = truncate_context(
        &chatbot.context_items,
        limits.max_context_size_kb,
        &mut warnings,
    );

    finish(
        chatbot,
        model,
        temperature,
        max_tokens,
        context_items,
        limits,
        warnings,
    )
}

/// Shared finishing step: string fallbacks and struct assembly
fn finish(
    chatbot: &ChatbotDefinition,
    model: String,
    temperature: f32,
    max_tokens: u32,
    context_items: Vec<ContextItem>,
    plan_limits: PlanLimits,
    validation_warnings: Vec<String>,
) -> ResolvedConfig {
    let model_family = ModelFamily::from_model(&model);
    ResolvedConfig {
        model,
        model_family,
        temperature,
        max_tokens,
        instructions: non_empty_or(&chatbot.instructions, DEFAULT_INSTRUCTIONS),
        custom_instructions: chatbot.custom_instructions.clone(),
        personality: non_empty_or(&chatbot.personality, DEFAULT_PERSONALITY),
        welcome_message: non_empty_or(&chatbot.welcome_message, DEFAULT_WELCOME),
        goodbye_message: non_empty_or(&chatbot.goodbye_message, DEFAULT_GOODBYE),
        context_items,
        plan_limits,
        validation_warnings,
    }
}

/// Temperature safety clamps, in order:
/// 1. values above the 1.5 ceiling force exactly 1.0 (hallucination safety)
/// 2. negative values clamp to 0.0
/// 3. the safety-sensitive models force exactly 1.0, overriding everything
fn clamp_temperature(model: &str, requested: f32, warnings: &mut Vec<String>) -> f32 {
    let mut temperature = requested;

    if temperature > TEMPERATURE_CEILING {
        warnings.push(format!(
            "Temperature {requested} exceeds the safe ceiling of {TEMPERATURE_CEILING}; reduced to 1.0"
        ));
        temperature = 1.0;
    } else if temperature < 0.0 {
        warnings.push(format!(
            "Temperature {requested} is below 0; raised to 0.0"
        ));
        temperature = 0.0;
    }

    if is_safety_sensitive_model(model) && (temperature - 1.0).abs() > f32::EPSILON {
        warnings.push(format!(
            "Model '{model}' requires temperature 1.0; overriding {temperature}"
        ));
        temperature = 1.0;
    }

    temperature
}

/// Token ceiling clamp: `min(requested ?? ceiling, ceiling)`
fn clamp_max_tokens(
    requested: Option<u32>,
    ceiling: u32,
    ceiling_label: &str,
    warnings: &mut Vec<String>,
) -> u32 {
    match requested {
        Some(tokens) if tokens > ceiling => {
            warnings.push(format!(
                "Max tokens reduced from {tokens} to {ceiling} ({ceiling_label})"
            ));
            ceiling
        }
        Some(tokens) => tokens,
        None => ceiling,
    }
}

/// Keep the longest prefix of the ordered context list that fits the ceiling
fn truncate_context(
    items: &[ContextItem],
    ceiling_kb: u32,
    warnings: &mut Vec<String>,
) -> Vec<ContextItem> {
    let total: u64 = items.iter().map(|i| u64::from(i.size_kb)).sum();
    if total <= u64::from(ceiling_kb) {
        return items.to_vec();
    }

    let mut kept = Vec::new();
    let mut accumulated: u64 = 0;
    for item in items {
        if accumulated + u64::from(item.size_kb) > u64::from(ceiling_kb) {
            break;
        }
        accumulated += u64::from(item.size_kb);
        kept.push(item.clone());
    }

    warnings.push(format!(
        "Context trimmed from {} to {} items to fit the {ceiling_kb} KB plan limit",
        items.len(),
        kept.len()
    ));
    kept
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_owned()
    } else {
        value.to_owned()
    }
}
