// ABOUTME: Subscription plan catalog with per-tier execution limits and credit quotas
// ABOUTME: Static reference data; never mutated at runtime
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Plan Catalog
//!
//! Static table of per-plan limits: token ceilings, context-size ceilings,
//! model allow-lists, and monthly credit quotas. Pure data, no behavior beyond
//! lookups. The same limits apply to every authentication method.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Hard token ceiling for anonymous (public widget) callers
pub const ANONYMOUS_MAX_TOKENS: u32 = 1000;

/// Permissive context placeholder for anonymous callers, kept only for
/// downstream logging symmetry
pub const ANONYMOUS_CONTEXT_CEILING_KB: u32 = 1_000_000;

/// Models that must always run at temperature 1.0 exactly
pub const SAFETY_SENSITIVE_MODELS: &[&str] = &["gpt-5", "gpt-5-mini"];

/// Subscription tier determining model access, ceilings, and credit quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Free tier: no agent access
    Free,
    /// Entry paid tier
    Starter,
    /// Professional tier with integration-backed tools
    Pro,
    /// Enterprise tier with the full model list
    Enterprise,
    /// Time-limited trial with the Pro catalog and a small quota
    Trial,
    /// Unauthenticated public-widget caller; bypasses plan lookups
    Anonymous,
}

impl Display for Plan {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Per-plan execution limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Maximum tokens per single query
    pub max_tokens_per_query: u32,
    /// Total context size ceiling in KB
    pub max_context_size_kb: u32,
    /// Models this plan may use
    pub available_models: Vec<String>,
    /// Model substituted when the requested one is not allowed
    pub default_model: String,
    /// Monthly credit quota (resets each calendar month)
    pub monthly_credit_quota: u32,
}

impl Plan {
    /// Parse a plan string from an API payload
    ///
    /// Returns `None` for unrecognized plans; callers degrade to the
    /// anonymous path rather than failing the request.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "starter" => Some(Self::Starter),
            "pro" | "professional" => Some(Self::Pro),
            "enterprise" | "ent" => Some(Self::Enterprise),
            "trial" => Some(Self::Trial),
            "anonymous" | "anon" => Some(Self::Anonymous),
            _ => None,
        }
    }

    /// String form used in payloads and logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
            Self::Trial => "trial",
            Self::Anonymous => "anonymous",
        }
    }

    /// Whether this plan has any agent access at all
    #[must_use]
    pub const fn has_agent_access(&self) -> bool {
        !matches!(self, Self::Free)
    }

    /// Limits for this plan
    ///
    /// Anonymous limits are the widget-safety floor: a hard token ceiling and
    /// a permissive context placeholder (anonymous context is never truncated
    /// by plan size).
    #[must_use]
    pub fn limits(&self) -> PlanLimits {
        match self {
            Self::Free => PlanLimits {
                max_tokens_per_query: 0,
                max_context_size_kb: 0,
                available_models: Vec::new(),
                default_model: "gpt-4o-mini".to_owned(),
                monthly_credit_quota: 0,
            },
            Self::Starter => PlanLimits {
                max_tokens_per_query: 2000,
                max_context_size_kb: 400,
                available_models: to_owned_models(&["gpt-4o-mini", "gemini-2.0-flash"]),
                default_model: "gpt-4o-mini".to_owned(),
                monthly_credit_quota: 50,
            },
            Self::Pro => PlanLimits {
                max_tokens_per_query: 4000,
                max_context_size_kb: 2000,
                available_models: to_owned_models(&[
                    "gpt-4o-mini",
                    "gpt-4o",
                    "gpt-5-mini",
                    "gemini-2.0-flash",
                    "gemini-2.5-flash",
                ]),
                default_model: "gpt-4o".to_owned(),
                monthly_credit_quota: 500,
            },
            Self::Enterprise => PlanLimits {
                max_tokens_per_query: 8000,
                max_context_size_kb: 10_000,
                available_models: to_owned_models(&[
                    "gpt-4o-mini",
                    "gpt-4o",
                    "gpt-5-mini",
                    "gpt-5",
                    "gemini-2.0-flash",
                    "gemini-2.5-flash",
                    "gemini-2.5-pro",
                ]),
                default_model: "gpt-5".to_owned(),
                monthly_credit_quota: 5000,
            },
            Self::Trial => PlanLimits {
                max_tokens_per_query: 2000,
                max_context_size_kb: 400,
                available_models: to_owned_models(&[
                    "gpt-4o-mini",
                    "gpt-4o",
                    "gpt-5-mini",
                    "gemini-2.0-flash",
                    "gemini-2.5-flash",
                ]),
                default_model: "gpt-4o-mini".to_owned(),
                monthly_credit_quota: 100,
            },
            Self::Anonymous => PlanLimits {
                max_tokens_per_query: ANONYMOUS_MAX_TOKENS,
                max_context_size_kb: ANONYMOUS_CONTEXT_CEILING_KB,
                available_models: Vec::new(),
                default_model: "gpt-4o-mini".to_owned(),
                monthly_credit_quota: 0,
            },
        }
    }

    /// Monthly credit quota shorthand
    #[must_use]
    pub fn monthly_credit_quota(&self) -> u32 {
        self.limits().monthly_credit_quota
    }
}

/// Whether a model is one of the designated safety-sensitive models
#[must_use]
pub fn is_safety_sensitive_model(model: &str) -> bool {
    SAFETY_SENSITIVE_MODELS.contains(&model)
}

fn to_owned_models(models: &[&str]) -> Vec<String> {
    models.iter().map(|m| (*m).to_owned()).collect()
}
