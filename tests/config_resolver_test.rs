// ABOUTME: Integration tests for per-turn config resolution and safety clamps
// ABOUTME: Covers temperature safety, token ceilings, context truncation, and degradation paths
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{context_item, tenant_chatbot};
use ghosty_server::agent::resolve;
use ghosty_server::llm::ModelFamily;
use uuid::Uuid;

// ============================================================================
// Temperature safety (P1)
// ============================================================================

#[test]
fn test_temperature_never_exceeds_ceiling() {
    for requested in [-1.0_f32, 0.0, 0.7, 1.0, 1.8, 5.0] {
        let mut chatbot = tenant_chatbot(Uuid::new_v4());
        chatbot.temperature = requested;

        for plan in ["starter", "pro", "enterprise", "trial", "anonymous"] {
            let config = resolve(&chatbot, plan);
            assert!(
                config.temperature <= 1.5,
                "temperature {requested} on plan {plan} resolved to {}",
                config.temperature
            );
            assert!(config.temperature >= 0.0);
        }
    }
}

#[test]
fn test_excessive_temperature_forces_exactly_one() {
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    chatbot.temperature = 1.8;

    let config = resolve(&chatbot, "pro");
    assert!((config.temperature - 1.0).abs() < f32::EPSILON);
    assert!(!config.validation_warnings.is_empty());
}

#[test]
fn test_safety_sensitive_models_pin_temperature_to_one() {
    for requested in [-1.0_f32, 0.0, 0.7, 1.0, 1.8, 5.0] {
        let mut chatbot = tenant_chatbot(Uuid::new_v4());
        chatbot.model = "gpt-5".to_owned();
        chatbot.temperature = requested;

        let config = resolve(&chatbot, "enterprise");
        assert!(
            (config.temperature - 1.0).abs() < f32::EPSILON,
            "gpt-5 with requested temperature {requested} resolved to {}",
            config.temperature
        );
    }

    // The pin applies on the anonymous path too
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    chatbot.model = "gpt-5-mini".to_owned();
    chatbot.temperature = 0.3;
    let config = resolve(&chatbot, "anonymous");
    assert!((config.temperature - 1.0).abs() < f32::EPSILON);
}

// Scenario B: anonymous with temperature 2.0 clamps to 1.0, not 1.5
#[test]
fn test_anonymous_high_temperature_clamps_to_one_with_warning() {
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    chatbot.temperature = 2.0;

    let config = resolve(&chatbot, "anonymous");
    assert!((config.temperature - 1.0).abs() < f32::EPSILON);
    assert!(config
        .validation_warnings
        .iter()
        .any(|w| w.contains("ceiling")));
}

// ============================================================================
// Token ceilings (P2)
// ============================================================================

#[test]
fn test_max_tokens_respects_plan_ceiling() {
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    chatbot.max_tokens = Some(1_000_000);

    for plan in ["starter", "pro", "enterprise", "trial"] {
        let config = resolve(&chatbot, plan);
        assert!(
            config.max_tokens <= config.plan_limits.max_tokens_per_query,
            "plan {plan}: {} > ceiling",
            config.max_tokens
        );
        assert!(config
            .validation_warnings
            .iter()
            .any(|w| w.contains("Max tokens")));
    }
}

#[test]
fn test_anonymous_max_tokens_capped_at_widget_ceiling() {
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    chatbot.max_tokens = Some(50_000);
    let config = resolve(&chatbot, "anonymous");
    assert!(config.max_tokens <= 1000);

    // Unset requests default to the ceiling
    chatbot.max_tokens = None;
    let config = resolve(&chatbot, "anonymous");
    assert_eq!(config.max_tokens, 1000);
}

#[test]
fn test_requested_tokens_below_ceiling_pass_through() {
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    chatbot.max_tokens = Some(500);
    let config = resolve(&chatbot, "pro");
    assert_eq!(config.max_tokens, 500);
    assert!(config.validation_warnings.is_empty());
}

// ============================================================================
// Context truncation (P3)
// ============================================================================

#[test]
fn test_oversized_context_keeps_longest_fitting_prefix() {
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    // Starter ceiling is 400 KB; items sum to 550
    chatbot.context_items = vec![
        context_item("a", 150),
        context_item("b", 150),
        context_item("c", 150),
        context_item("d", 100),
    ];

    let config = resolve(&chatbot, "starter");
    let titles: Vec<&str> = config.context_items.iter().map(|i| i.title.as_str()).collect();
    // 150+150 fits; adding "c" would exceed 400, and truncation stops at the
    // first item that does not fit (earlier items win)
    assert_eq!(titles, vec!["a", "b"]);
    assert!(config
        .validation_warnings
        .iter()
        .any(|w| w.contains("Context trimmed")));
}

#[test]
fn test_context_within_ceiling_is_untouched() {
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    chatbot.context_items = vec![context_item("a", 100), context_item("b", 100)];

    let config = resolve(&chatbot, "starter");
    assert_eq!(config.context_items.len(), 2);
}

#[test]
fn test_anonymous_context_is_never_truncated() {
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    chatbot.context_items = (0..20).map(|i| context_item(&format!("{i}"), 1000)).collect();

    let config = resolve(&chatbot, "anonymous");
    assert_eq!(config.context_items.len(), 20);
}

// ============================================================================
// Model correction (Scenario A) and degradation paths
// ============================================================================

#[test]
fn test_disallowed_model_corrects_to_plan_default_with_warning() {
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    chatbot.model = "gpt-5".to_owned();

    let config = resolve(&chatbot, "starter");
    assert_eq!(config.model, "gpt-4o-mini");
    let naming = config
        .validation_warnings
        .iter()
        .filter(|w| w.contains("gpt-5"))
        .count();
    assert_eq!(naming, 1, "exactly one warning names the requested model");
}

#[test]
fn test_unknown_plan_falls_back_to_anonymous_clamps() {
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    chatbot.max_tokens = Some(99_999);
    chatbot.temperature = 3.0;

    let config = resolve(&chatbot, "platinum-ultra");
    assert!(config.max_tokens <= 1000);
    assert!((config.temperature - 1.0).abs() < f32::EPSILON);
    // Model passes through untouched on the anonymous path
    assert_eq!(config.model, "gpt-4o-mini");
}

#[test]
fn test_anonymous_plan_limits_are_logging_placeholders() {
    let chatbot = tenant_chatbot(Uuid::new_v4());
    let config = resolve(&chatbot, "anonymous");
    assert_eq!(config.plan_limits.available_models, vec!["gpt-4o-mini"]);
    assert!(config.plan_limits.max_context_size_kb >= 1_000_000);
}

#[test]
fn test_empty_prompt_fields_get_safe_fallbacks() {
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    chatbot.instructions = String::new();
    chatbot.welcome_message = "  ".to_owned();
    chatbot.goodbye_message = String::new();
    chatbot.personality = String::new();

    let config = resolve(&chatbot, "pro");
    assert!(!config.instructions.trim().is_empty());
    assert!(!config.welcome_message.trim().is_empty());
    assert!(!config.goodbye_message.trim().is_empty());
    assert!(!config.personality.trim().is_empty());
}

#[test]
fn test_model_family_resolved_once_at_config_time() {
    let mut chatbot = tenant_chatbot(Uuid::new_v4());
    chatbot.model = "gemini-2.0-flash".to_owned();
    let config = resolve(&chatbot, "starter");
    assert_eq!(config.model_family, ModelFamily::Gemini);

    chatbot.model = "gpt-4o-mini".to_owned();
    let config = resolve(&chatbot, "starter");
    assert_eq!(config.model_family, ModelFamily::OpenAi);
}
