// ABOUTME: Payment link tools: tenant product links and platform plan-upgrade links
// ABOUTME: The plan-upgrade variant is exclusively available to the platform assistant
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{require_tenant, track, with_timeout, ToolDeps};
use crate::models::IntegrationKind;
use crate::plans::Plan;
use crate::tools::{require_str, AgentTool, ToolAccess, ToolContext, ToolResponse};

/// Monthly plan prices in minor units (cents)
const STARTER_PRICE_CENTS: u64 = 1900;
const PRO_PRICE_CENTS: u64 = 4900;
const ENTERPRISE_PRICE_CENTS: u64 = 19900;

/// Creates a payment link for a tenant's own product or service
pub struct CreatePaymentLinkTool {
    deps: Arc<ToolDeps>,
}

impl CreatePaymentLinkTool {
    /// Build the tool
    #[must_use]
    pub fn new(deps: Arc<ToolDeps>) -> Self {
        Self { deps }
    }

    async fn execute(&self, input: &Value, ctx: &ToolContext) -> ToolResponse {
        if let Err(fail) = require_tenant(ctx, "create_payment_link") {
            return fail;
        }

        let description = match require_str(input, "description") {
            Ok(v) => v,
            Err(fail) => return fail,
        };
        let Some(amount) = input.get("amount_cents").and_then(Value::as_u64) else {
            return ToolResponse::fail("Missing required field 'amount_cents'");
        };
        if amount == 0 {
            return ToolResponse::fail("The payment amount must be greater than zero");
        }
        let currency = input
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or("usd");

        match with_timeout(
            "payments",
            self.deps
                .collaborators
                .payments
                .create_link(amount, description, currency),
        )
        .await
        {
            Ok(url) => ToolResponse::ok_with_data(
                format!("Payment link created for {description}"),
                json!({ "url": url }),
            ),
            Err(fail) => fail,
        }
    }
}

#[async_trait]
impl AgentTool for CreatePaymentLinkTool {
    fn name(&self) -> &'static str {
        "create_payment_link"
    }

    fn description(&self) -> &'static str {
        "Create a hosted payment link for the business's own product or service"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "description": { "type": "string" },
                "amount_cents": { "type": "integer", "description": "Amount in minor units" },
                "currency": { "type": "string", "description": "ISO currency code, default usd" }
            },
            "required": ["description", "amount_cents"]
        })
    }

    fn required_integration(&self) -> Option<IntegrationKind> {
        Some(IntegrationKind::Payments)
    }

    fn tenant_only(&self) -> bool {
        true
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> ToolResponse {
        let response = self.execute(&input, ctx).await;
        track(&self.deps, ctx, self.name(), &response, Value::Null);
        response
    }
}

/// Creates a plan-upgrade payment link; platform assistant only
pub struct GeneratePlanPaymentLinkTool {
    deps: Arc<ToolDeps>,
}

impl GeneratePlanPaymentLinkTool {
    /// Build the tool
    #[must_use]
    pub fn new(deps: Arc<ToolDeps>) -> Self {
        Self { deps }
    }

    const fn plan_price_cents(plan: Plan) -> Option<u64> {
        match plan {
            Plan::Starter => Some(STARTER_PRICE_CENTS),
            Plan::Pro => Some(PRO_PRICE_CENTS),
            Plan::Enterprise => Some(ENTERPRISE_PRICE_CENTS),
            Plan::Free | Plan::Trial | Plan::Anonymous => None,
        }
    }

    async fn execute(&self, input: &Value, _ctx: &ToolContext) -> ToolResponse {
        let plan_raw = match require_str(input, "plan") {
            Ok(v) => v,
            Err(fail) => return fail,
        };
        let Some(plan) = Plan::parse(plan_raw) else {
            return ToolResponse::fail(format!("'{plan_raw}' is not a purchasable plan"));
        };
        let Some(amount) = Self::plan_price_cents(plan) else {
            return ToolResponse::fail(format!("The {plan} plan cannot be purchased directly"));
        };

        match with_timeout(
            "payments",
            self.deps.collaborators.payments.create_link(
                amount,
                &format!("Ghosty {plan} plan, monthly"),
                "usd",
            ),
        )
        .await
        {
            Ok(url) => ToolResponse::ok_with_data(
                format!("Here is the checkout link for the {plan} plan"),
                json!({ "url": url, "plan": plan.as_str() }),
            ),
            Err(fail) => fail,
        }
    }
}

#[async_trait]
impl AgentTool for GeneratePlanPaymentLinkTool {
    fn name(&self) -> &'static str {
        "generate_plan_payment_link"
    }

    fn description(&self) -> &'static str {
        "Create a checkout link for upgrading to a paid Ghosty plan"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "plan": { "type": "string", "enum": ["starter", "pro", "enterprise"] }
            },
            "required": ["plan"]
        })
    }

    fn minimum_access(&self) -> ToolAccess {
        ToolAccess::Core
    }

    fn platform_only(&self) -> bool {
        true
    }

    async fn call(&self, input: Value, ctx: &ToolContext) -> ToolResponse {
        let response = self.execute(&input, ctx).await;
        track(
            &self.deps,
            ctx,
            self.name(),
            &response,
            json!({ "plan": input.get("plan") }),
        );
        response
    }
}
