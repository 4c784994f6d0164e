// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The metering engine: quota admission, estimates, usage recording and
//! summaries over a ledger adapter.
//!
//! The engine owns no state beyond its collaborators. Every operation starts
//! by ensuring the account, which also rolls an ended billing cycle over, so
//! callers always observe the live cycle. Ledger errors propagate as-is: a
//! storage failure is never turned into an "allowed" answer.

use std::sync::Arc;

use chrono::Duration;
use luc_core::types::{system_clock, Clock};
use luc_core::{Account, LedgerAdapter, LucError, QuotaPolicy, Settlement, UsageEvent, WorkspaceId};
use luc_cost::{CostModel, Quote};
use tracing::{debug, warn};

use crate::request::{
    CanExecuteCommand, EstimateCommand, RecordUsageCommand, SetTierCommand, SettleCommand,
    SettlementLookup, SummaryCommand,
};
use crate::summary::{admission, breakdown, daily_totals, Admission, Summary, UsageHistory};

/// Fraction of a quota at which recording logs a warning.
const QUOTA_WARN_PCT: f64 = 0.8;

pub struct MeteringEngine {
    ledger: Arc<dyn LedgerAdapter>,
    policy: Arc<QuotaPolicy>,
    cost: CostModel,
    clock: Clock,
}

impl MeteringEngine {
    pub fn new(ledger: Arc<dyn LedgerAdapter>, policy: Arc<QuotaPolicy>, cost: CostModel) -> Self {
        Self {
            ledger,
            policy,
            cost,
            clock: system_clock(),
        }
    }

    /// Replace the time source, e.g. to drive cycle boundaries in tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerAdapter> {
        &self.ledger
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost
    }

    async fn live_account(&self, workspace_id: &WorkspaceId) -> Result<Account, LucError> {
        self.ledger.ensure_account(workspace_id, (self.clock)()).await
    }

    /// Whether every requirement fits under its quota. Never writes usage.
    pub async fn can_execute(&self, cmd: &CanExecuteCommand) -> Result<Admission, LucError> {
        let account = self.live_account(&cmd.workspace_id).await?;
        let requirements: Vec<_> = cmd
            .requirements
            .iter()
            .map(|r| (r.resource.clone(), r.projected_amount))
            .collect();
        let result = admission(&account, &requirements);
        debug!(
            workspace_id = %cmd.workspace_id,
            allowed = result.allowed,
            blocking = result.blocking_quotas.len(),
            "admission checked"
        );
        Ok(result)
    }

    /// Price an operation across variants. No usage is written.
    pub async fn estimate(&self, cmd: &EstimateCommand) -> Result<Quote, LucError> {
        self.live_account(&cmd.workspace_id).await?;
        self.cost.quote(
            &cmd.operation,
            cmd.variants.as_deref(),
            self.policy.max_discount(),
            (self.clock)(),
        )
    }

    /// Append one event per resource under the command's operation id.
    ///
    /// Replaying an operation id writes nothing and returns the same summary,
    /// so a timed-out call can be retried as-is.
    pub async fn record_usage(&self, cmd: &RecordUsageCommand) -> Result<Summary, LucError> {
        let now = (self.clock)();
        let mut account = self.ledger.ensure_account(&cmd.workspace_id, now).await?;
        let mut duplicates = 0usize;

        for item in &cmd.usage {
            let event = UsageEvent::new(
                cmd.workspace_id.clone(),
                cmd.operation_id.clone(),
                item.resource.clone(),
                item.amount,
                item.cost_usd,
                now,
            );
            let outcome = self.ledger.append_event(&event).await?;
            if outcome.duplicate {
                duplicates += 1;
            }
            account = outcome.account;
        }

        if duplicates > 0 {
            debug!(
                workspace_id = %cmd.workspace_id,
                operation_id = %cmd.operation_id,
                duplicates,
                "operation already recorded"
            );
        }
        warn_near_limits(&account);
        Ok(Summary::from_account(&account))
    }

    pub async fn summary(&self, cmd: &SummaryCommand) -> Result<Summary, LucError> {
        let now = (self.clock)();
        let account = self.ledger.ensure_account(&cmd.workspace_id, now).await?;
        let mut summary = Summary::from_account(&account);

        if cmd.include_breakdown {
            let events = self
                .ledger
                .events(
                    &cmd.workspace_id,
                    account.billing_cycle_start,
                    account.billing_cycle_end,
                )
                .await?;
            summary.breakdown = Some(breakdown(&events));
        }

        if let Some(days) = cmd.history_days {
            let from = now - Duration::days(i64::from(days));
            let until = now + Duration::milliseconds(1);
            let events = self.ledger.events(&cmd.workspace_id, from, until).await?;
            let cycles = self.ledger.cycle_history(&cmd.workspace_id).await?;
            summary.history = Some(UsageHistory {
                days,
                daily: daily_totals(&events),
                cycles,
            });
        }

        Ok(summary)
    }

    /// Store the final charge for a task. Repeats return the stored record.
    pub async fn settle(&self, cmd: &SettleCommand) -> Result<Settlement, LucError> {
        let now = (self.clock)();
        self.ledger.ensure_account(&cmd.workspace_id, now).await?;
        let settlement = Settlement {
            settlement_id: uuid::Uuid::new_v4().to_string(),
            workspace_id: cmd.workspace_id.clone(),
            task_id: cmd.task_id.clone(),
            final_cost_usd: cmd.final_cost_usd,
            paid: cmd.paid,
            receipt_url: cmd.receipt_url.clone(),
            discount: cmd.discount,
            created_at: now,
        };
        self.ledger.insert_settlement(&settlement).await
    }

    /// Look up a settlement; one owned by another workspace is reported as missing.
    pub async fn settlement(&self, lookup: &SettlementLookup) -> Result<Settlement, LucError> {
        match self.ledger.get_settlement(&lookup.task_id).await? {
            Some(s) if s.workspace_id == lookup.workspace_id => Ok(s),
            _ => Err(LucError::NotFound(format!(
                "settlement for task `{}`",
                lookup.task_id
            ))),
        }
    }

    pub async fn set_tier(&self, cmd: &SetTierCommand) -> Result<Summary, LucError> {
        let now = (self.clock)();
        self.ledger.ensure_account(&cmd.workspace_id, now).await?;
        let account = self.ledger.set_tier(&cmd.workspace_id, cmd.tier, now).await?;
        Ok(Summary::from_account(&account))
    }
}

fn warn_near_limits(account: &Account) {
    for (resource, usage) in &account.aggregates {
        if !usage.is_unmetered() && usage.pct() >= QUOTA_WARN_PCT {
            warn!(
                workspace_id = %account.workspace_id,
                resource = %resource,
                used = usage.used,
                limit = usage.limit,
                "approaching quota limit (80%+)"
            );
        }
    }
}
