// ABOUTME: Integration tests for per-turn tool gating
// ABOUTME: Plan access levels, integration filtering, and the platform assistant's lists
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::harness;
use ghosty_server::models::{IntegrationKind, IntegrationMap};
use ghosty_server::plans::Plan;

#[tokio::test]
async fn test_free_and_anonymous_get_read_only_search_only() {
    let h = harness();
    let integrations = IntegrationMap::new();

    for plan in [Plan::Free, Plan::Anonymous] {
        let set = h.registry.for_turn(plan, &integrations, false);
        assert_eq!(set.names(), vec!["query_knowledge_base"], "plan {plan}");
    }
}

#[tokio::test]
async fn test_starter_gets_core_tools_without_premium_integrations() {
    let h = harness();
    // Even with everything connected, Starter stays on the core set
    let mut integrations = IntegrationMap::new();
    integrations.connect(IntegrationKind::Email);
    integrations.connect(IntegrationKind::Calendar);
    integrations.connect(IntegrationKind::Payments);

    let set = h.registry.for_turn(Plan::Starter, &integrations, false);
    let names = set.names();
    assert!(names.contains(&"query_knowledge_base"));
    assert!(names.contains(&"save_lead"));
    assert!(names.contains(&"get_current_time"));
    assert!(names.contains(&"web_search"));
    assert!(!names.contains(&"send_email"));
    assert!(!names.contains(&"create_calendar_event"));
    assert!(!names.contains(&"create_payment_link"));
}

#[tokio::test]
async fn test_pro_catalog_is_filtered_by_connected_integrations() {
    let h = harness();

    // Nothing connected: no integration-backed tools offered
    let set = h
        .registry
        .for_turn(Plan::Pro, &IntegrationMap::new(), false);
    let names = set.names();
    assert!(!names.contains(&"send_email"));
    assert!(!names.contains(&"create_calendar_event"));
    assert!(!names.contains(&"create_payment_link"));
    assert!(names.contains(&"parse_document"));
    assert!(names.contains(&"schedule_reminder"));

    // Connecting email exposes exactly the email tool
    let mut integrations = IntegrationMap::new();
    integrations.connect(IntegrationKind::Email);
    let set = h.registry.for_turn(Plan::Pro, &integrations, false);
    let names = set.names();
    assert!(names.contains(&"send_email"));
    assert!(!names.contains(&"create_calendar_event"));
}

#[tokio::test]
async fn test_full_plans_with_all_integrations_see_the_tenant_catalog() {
    let h = harness();
    let mut integrations = IntegrationMap::new();
    integrations.connect(IntegrationKind::Email);
    integrations.connect(IntegrationKind::Calendar);
    integrations.connect(IntegrationKind::Payments);

    for plan in [Plan::Pro, Plan::Enterprise, Plan::Trial] {
        let set = h.registry.for_turn(plan, &integrations, false);
        let names = set.names();
        for expected in [
            "query_knowledge_base",
            "save_lead",
            "get_current_time",
            "web_search",
            "send_email",
            "create_calendar_event",
            "create_payment_link",
            "ingest_document",
            "parse_document",
            "schedule_reminder",
        ] {
            assert!(names.contains(&expected), "{plan} missing {expected}");
        }
        // Platform-only tools never appear on tenant turns
        assert!(!names.contains(&"generate_plan_payment_link"));
    }
}

#[tokio::test]
async fn test_platform_assistant_excludes_tenant_tools_and_gets_plan_links() {
    let h = harness();
    let set = h
        .registry
        .for_turn(Plan::Pro, &IntegrationMap::new(), true);
    let names = set.names();

    assert!(!names.contains(&"save_lead"));
    assert!(!names.contains(&"get_current_time"));
    assert!(names.contains(&"generate_plan_payment_link"));
    assert!(names.contains(&"query_knowledge_base"));
}

#[tokio::test]
async fn test_tool_set_is_recomputed_when_integration_state_changes() {
    let h = harness();

    let before = h
        .registry
        .for_turn(Plan::Pro, &IntegrationMap::new(), false);
    assert!(!before.names().contains(&"create_calendar_event"));

    // The "next turn" with calendar now connected must see the tool
    let mut integrations = IntegrationMap::new();
    integrations.connect(IntegrationKind::Calendar);
    let after = h.registry.for_turn(Plan::Pro, &integrations, false);
    assert!(after.names().contains(&"create_calendar_event"));
}
