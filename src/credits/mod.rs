// ABOUTME: Two-pool credit ledger with atomic spend, monthly reset, and rollback semantics
// ABOUTME: Serializes concurrent spends per account via optimistic CAS with bounded retry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

//! # Credits Ledger
//!
//! Every user holds two credit pools: purchased credits that never expire and
//! a monthly quota that resets when the calendar month rolls over. Spends are
//! **purchased-first**: non-expiring purchased credits absorb load before the
//! monthly quota is touched. Note that some product copy sells purchased
//! credits as "never expire", which would argue for monthly-first; this
//! function is the single place encoding the order, so flipping the policy is
//! a two-line change here.
//!
//! Concurrency: the per-user account is the only state shared across
//! concurrent turns, so every mutation runs a read-compute-CAS cycle with a
//! bounded retry. Two tabs spending at once serialize on the version column;
//! the loser re-reads and re-checks availability against fresh state. The
//! candidate state is additionally validated against the pool invariants
//! before commit, so a violated post-condition aborts with nothing written.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::CreditAccount;
use crate::plans::Plan;
use crate::storage::Storage;

/// Bounded retry count for version conflicts on one account
const MAX_CAS_ATTEMPTS: u32 = 5;

/// Point-in-time view of both pools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Purchased, non-expiring credits
    pub purchased: u32,
    /// Credits consumed from the monthly quota this month
    pub monthly_used: u32,
    /// The plan's monthly quota
    pub monthly_quota: u32,
    /// Remaining monthly credits
    pub monthly_remaining: u32,
    /// Total spendable right now
    pub total_available: u32,
}

/// Outcome of a successful spend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendReceipt {
    /// Credits drawn from the purchased pool
    pub from_purchased: u32,
    /// Credits drawn from the monthly quota
    pub from_monthly: u32,
    /// Balance after the spend
    pub balance: Balance,
}

/// The credits ledger; the only code allowed to mutate credit accounts
pub struct CreditsLedger {
    storage: Arc<dyn Storage>,
}

impl CreditsLedger {
    /// Create a ledger over the given storage
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Spend credits against the caller's plan quota
    ///
    /// # Errors
    ///
    /// Returns `INSUFFICIENT_CREDITS` (with shortfall and pool breakdown) when
    /// the amount exceeds availability; `LEDGER_INCONSISTENCY` when the
    /// computed state would violate a pool invariant; an internal error when
    /// contention exhausts the retry budget. On any error all three counters
    /// are left byte-for-byte unchanged.
    pub async fn spend(&self, user_id: Uuid, plan: Plan, amount: u32) -> AppResult<SpendReceipt> {
        self.spend_with_quota(user_id, plan.monthly_credit_quota(), amount)
            .await
    }

    /// Spend credits against an explicit monthly quota
    ///
    /// # Errors
    ///
    /// Same contract as [`CreditsLedger::spend`].
    pub async fn spend_with_quota(
        &self,
        user_id: Uuid,
        monthly_quota: u32,
        amount: u32,
    ) -> AppResult<SpendReceipt> {
        for _attempt in 0..MAX_CAS_ATTEMPTS {
            let loaded = self.storage.credit_account(user_id).await?;
            let account = refreshed(loaded.clone(), Utc::now());

            let monthly_remaining = monthly_quota.saturating_sub(account.monthly_credits_used);
            let available = account.purchased_credits + monthly_remaining;
            if amount > available {
                return Err(AppError::insufficient_credits(
                    amount,
                    available,
                    account.purchased_credits,
                    monthly_remaining,
                )
                .with_user_id(user_id));
            }

            // Purchased-first split (see the module doc for the policy note)
            let from_purchased = account.purchased_credits.min(amount);
            let from_monthly = amount - from_purchased;

            let updated = apply_spend(&account, from_purchased, from_monthly, amount);
            let Some(mut updated) = updated else {
                error!(
                    %user_id,
                    amount,
                    "Ledger post-condition violated; spend aborted with no mutation"
                );
                return Err(
                    AppError::ledger_inconsistency("Credit accounting failed; nothing was charged")
                        .with_user_id(user_id),
                );
            };

            // Belt-and-suspenders invariant guard before commit: the
            // availability check above should make this unreachable
            if updated.monthly_credits_used > monthly_quota {
                error!(
                    %user_id,
                    monthly_used = updated.monthly_credits_used,
                    monthly_quota,
                    "Monthly pool overdrawn; spend aborted with no mutation"
                );
                return Err(
                    AppError::ledger_inconsistency("Credit accounting failed; nothing was charged")
                        .with_user_id(user_id),
                );
            }

            updated.version = loaded.version + 1;
            if self
                .storage
                .store_credit_account_if_version(&updated, loaded.version)
                .await?
            {
                return Ok(SpendReceipt {
                    from_purchased,
                    from_monthly,
                    balance: balance_of(&updated, monthly_quota),
                });
            }

            warn!(%user_id, "Credit account version conflict; retrying spend");
        }

        Err(AppError::internal("Credit account under heavy contention; spend aborted")
            .with_user_id(user_id))
    }

    /// Add purchased credits (top-up or plan purchase)
    ///
    /// # Errors
    ///
    /// Returns storage errors, or an internal error when contention exhausts
    /// the retry budget.
    pub async fn add_purchased(&self, user_id: Uuid, amount: u32) -> AppResult<Balance> {
        for _attempt in 0..MAX_CAS_ATTEMPTS {
            let loaded = self.storage.credit_account(user_id).await?;
            let mut updated = loaded.clone();
            updated.purchased_credits = updated.purchased_credits.saturating_add(amount);
            updated.version = loaded.version + 1;

            if self
                .storage
                .store_credit_account_if_version(&updated, loaded.version)
                .await?
            {
                return Ok(balance_of(&updated, 0));
            }
            warn!(%user_id, "Credit account version conflict; retrying purchase");
        }

        Err(AppError::internal("Credit account under heavy contention; purchase aborted")
            .with_user_id(user_id))
    }

    /// Current balance under the caller's plan quota
    ///
    /// Read-only: a pending monthly reset is reflected in the view but only
    /// committed by the next successful spend.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn balance(&self, user_id: Uuid, plan: Plan) -> AppResult<Balance> {
        let account = self.storage.credit_account(user_id).await?;
        let refreshed = refreshed(account, Utc::now());
        Ok(balance_of(&refreshed, plan.monthly_credit_quota()))
    }
}

/// Apply the monthly reset when the calendar month rolled over
fn refreshed(mut account: CreditAccount, now: DateTime<Utc>) -> CreditAccount {
    let needs_reset = match account.credits_reset_at {
        Some(reset_at) => reset_at.month() != now.month() || reset_at.year() != now.year(),
        None => true,
    };
    if needs_reset {
        account.monthly_credits_used = 0;
        account.credits_reset_at = Some(now);
    }
    account
}

/// Compute the post-spend account with checked arithmetic
///
/// Returns `None` when any counter would over- or underflow, which is the
/// post-condition violation path.
fn apply_spend(
    account: &CreditAccount,
    from_purchased: u32,
    from_monthly: u32,
    amount: u32,
) -> Option<CreditAccount> {
    let purchased = account.purchased_credits.checked_sub(from_purchased)?;
    let monthly_used = account.monthly_credits_used.checked_add(from_monthly)?;
    let lifetime = account
        .lifetime_credits_used
        .checked_add(u64::from(amount))?;

    Some(CreditAccount {
        user_id: account.user_id,
        purchased_credits: purchased,
        monthly_credits_used: monthly_used,
        credits_reset_at: account.credits_reset_at,
        lifetime_credits_used: lifetime,
        version: account.version,
    })
}

fn balance_of(account: &CreditAccount, monthly_quota: u32) -> Balance {
    let monthly_remaining = monthly_quota.saturating_sub(account.monthly_credits_used);
    Balance {
        purchased: account.purchased_credits,
        monthly_used: account.monthly_credits_used,
        monthly_quota,
        monthly_remaining,
        total_available: account.purchased_credits + monthly_remaining,
    }
}
