// ABOUTME: Plan-based model validation with corrected defaults
// ABOUTME: FREE always denies; other plans correct disallowed models to the plan default
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Model Validator
//!
//! Checks a requested model against the caller's plan allow-list. FREE is the
//! special case: it returns invalid with no correction for every model string,
//! and the caller must surface that as a hard deny rather than a silent
//! substitution.

use serde::{Deserialize, Serialize};

use crate::plans::Plan;

/// Outcome of validating a requested model against a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelValidation {
    /// Whether the requested model may be used as-is
    pub is_valid: bool,
    /// Substitute model when the requested one is not allowed; `None` means
    /// there is nothing to correct to (FREE)
    pub corrected_model: Option<String>,
}

/// Validate a requested model against a plan's allow-list
///
/// - FREE: always `{ is_valid: false, corrected_model: None }`
/// - ANONYMOUS: always valid (no validation performed)
/// - Everything else: valid when the model is in the plan's list, otherwise
///   corrected to the plan's default model
#[must_use]
pub fn validate(plan: Plan, requested_model: &str) -> ModelValidation {
    match plan {
        Plan::Free => ModelValidation {
            is_valid: false,
            corrected_model: None,
        },
        Plan::Anonymous => ModelValidation {
            is_valid: true,
            corrected_model: None,
        },
        _ => {
            let limits = plan.limits();
            if limits
                .available_models
                .iter()
                .any(|m| m == requested_model)
            {
                ModelValidation {
                    is_valid: true,
                    corrected_model: None,
                }
            } else {
                ModelValidation {
                    is_valid: false,
                    corrected_model: Some(limits.default_model),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_denies_every_model() {
        for model in ["gpt-4o", "gpt-5", "gemini-2.5-pro", "made-up-model", ""] {
            let result = validate(Plan::Free, model);
            assert!(!result.is_valid);
            assert!(result.corrected_model.is_none());
        }
    }

    #[test]
    fn test_anonymous_skips_validation() {
        let result = validate(Plan::Anonymous, "anything-goes");
        assert!(result.is_valid);
    }

    #[test]
    fn test_disallowed_model_corrects_to_plan_default() {
        let result = validate(Plan::Starter, "gpt-5");
        assert!(!result.is_valid);
        assert_eq!(result.corrected_model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_allowed_model_passes() {
        let result = validate(Plan::Pro, "gpt-4o");
        assert!(result.is_valid);
        assert!(result.corrected_model.is_none());
    }
}
