// ABOUTME: Integration tests for plan-based model validation
// ABOUTME: FREE always denies with no correction; other plans correct to their default
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use ghosty_server::agent::{ensure_agent_access, validate};
use ghosty_server::plans::Plan;

// P6: FREE denies every model string, including other plans' allow-list entries
#[test]
fn test_free_denies_every_model_with_no_correction() {
    let all_plan_models: Vec<String> = [Plan::Starter, Plan::Pro, Plan::Enterprise, Plan::Trial]
        .iter()
        .flat_map(|p| p.limits().available_models)
        .collect();

    for model in all_plan_models
        .iter()
        .map(String::as_str)
        .chain(["", "made-up", "gpt-99"])
    {
        let result = validate(Plan::Free, model);
        assert!(!result.is_valid, "FREE must deny '{model}'");
        assert!(
            result.corrected_model.is_none(),
            "FREE must not correct '{model}'"
        );
    }
}

#[test]
fn test_free_denial_is_a_hard_stop_not_a_silent_correction() {
    let denial = ensure_agent_access(Plan::Free);
    let error = denial.err().map(|e| e.message).unwrap_or_default();
    assert!(error.to_lowercase().contains("upgrade"));
}

#[test]
fn test_anonymous_validates_everything() {
    for model in ["gpt-5", "gemini-2.5-pro", "totally-unknown"] {
        assert!(validate(Plan::Anonymous, model).is_valid);
    }
}

#[test]
fn test_paid_plans_validate_their_own_lists() {
    for plan in [Plan::Starter, Plan::Pro, Plan::Enterprise, Plan::Trial] {
        let limits = plan.limits();
        for model in &limits.available_models {
            assert!(
                validate(plan, model).is_valid,
                "{plan} should allow {model}"
            );
        }

        let result = validate(plan, "model-that-does-not-exist");
        assert!(!result.is_valid);
        assert_eq!(result.corrected_model, Some(limits.default_model));
    }
}

#[test]
fn test_enterprise_only_models_are_corrected_for_lower_plans() {
    let result = validate(Plan::Pro, "gpt-5");
    assert!(!result.is_valid);
    assert_eq!(result.corrected_model.as_deref(), Some("gpt-4o"));

    let result = validate(Plan::Enterprise, "gpt-5");
    assert!(result.is_valid);
}
