// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local ledger.
//!
//! Accounts live in an arena of per-workspace async mutexes, so appends to
//! one workspace never wait on another. Nothing survives a restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use luc_core::{
    cycle_window, Account, AdapterType, AppendOutcome, CycleArchive, HealthStatus, LedgerAdapter,
    LucError, OperationId, PluginAdapter, QuotaPolicy, Resource, Settlement, Tier, UsageEvent,
    WorkspaceId,
};

#[derive(Debug)]
struct AccountState {
    tier: Tier,
    cycle_start: DateTime<Utc>,
    cycle_end: DateTime<Utc>,
    used: BTreeMap<Resource, u64>,
    events: Vec<UsageEvent>,
    /// Index into `events` by idempotency key.
    keys: HashMap<(OperationId, Resource), usize>,
    archives: Vec<CycleArchive>,
}

impl AccountState {
    fn roll_if_due(
        &mut self,
        policy: &QuotaPolicy,
        workspace_id: &WorkspaceId,
        now: DateTime<Utc>,
    ) -> Result<(), LucError> {
        if now < self.cycle_end {
            return Ok(());
        }
        let length = policy.cycle_length(self.tier)?;
        let closing = policy.quotas_for(self.tier, &self.used)?;
        self.archives.push(CycleArchive {
            workspace_id: workspace_id.clone(),
            tier: self.tier,
            cycle_start: self.cycle_start,
            cycle_end: self.cycle_end,
            aggregates: closing,
            archived_at: now,
        });
        let (start, end) = cycle_window(self.cycle_end, length, now);
        info!(
            workspace_id = %workspace_id,
            closed_start = %self.cycle_start,
            closed_end = %self.cycle_end,
            cycle_start = %start,
            cycle_end = %end,
            "billing cycle rolled over"
        );
        self.cycle_start = start;
        self.cycle_end = end;
        self.used.clear();
        Ok(())
    }

    fn snapshot(&self, policy: &QuotaPolicy, workspace_id: &WorkspaceId) -> Result<Account, LucError> {
        Ok(Account {
            workspace_id: workspace_id.clone(),
            tier: self.tier,
            billing_cycle_start: self.cycle_start,
            billing_cycle_end: self.cycle_end,
            aggregates: policy.quotas_for(self.tier, &self.used)?,
        })
    }
}

/// In-memory [`LedgerAdapter`] with per-workspace locking.
pub struct MemoryLedger {
    policy: Arc<QuotaPolicy>,
    accounts: DashMap<WorkspaceId, Arc<Mutex<AccountState>>>,
    settlements: DashMap<String, Settlement>,
}

impl MemoryLedger {
    pub fn new(policy: Arc<QuotaPolicy>) -> Self {
        Self {
            policy,
            accounts: DashMap::new(),
            settlements: DashMap::new(),
        }
    }

    /// Clone the account's lock handle without holding the map shard across an await.
    fn slot(&self, workspace_id: &WorkspaceId) -> Result<Arc<Mutex<AccountState>>, LucError> {
        self.accounts
            .get(workspace_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LucError::AccountNotFound {
                workspace_id: workspace_id.to_string(),
            })
    }

    /// Lock the account and bring its cycle up to date.
    async fn live(
        &self,
        workspace_id: &WorkspaceId,
        now: DateTime<Utc>,
    ) -> Result<tokio::sync::OwnedMutexGuard<AccountState>, LucError> {
        let mut state = self.slot(workspace_id)?.lock_owned().await;
        state.roll_if_due(&self.policy, workspace_id, now)?;
        Ok(state)
    }
}

#[async_trait]
impl PluginAdapter for MemoryLedger {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ledger
    }

    async fn health_check(&self) -> Result<HealthStatus, LucError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LucError> {
        Ok(())
    }
}

#[async_trait]
impl LedgerAdapter for MemoryLedger {
    async fn ensure_account(
        &self,
        workspace_id: &WorkspaceId,
        now: DateTime<Utc>,
    ) -> Result<Account, LucError> {
        if !self.accounts.contains_key(workspace_id) {
            let tier = self.policy.default_tier();
            let length = self.policy.cycle_length(tier)?;
            if let Entry::Vacant(slot) = self.accounts.entry(workspace_id.clone()) {
                slot.insert(Arc::new(Mutex::new(AccountState {
                    tier,
                    cycle_start: now,
                    cycle_end: now + length,
                    used: BTreeMap::new(),
                    events: Vec::new(),
                    keys: HashMap::new(),
                    archives: Vec::new(),
                })));
                info!(workspace_id = %workspace_id, %tier, "account created");
            }
        }
        let state = self.live(workspace_id, now).await?;
        state.snapshot(&self.policy, workspace_id)
    }

    async fn current_aggregate(
        &self,
        workspace_id: &WorkspaceId,
        now: DateTime<Utc>,
    ) -> Result<Account, LucError> {
        let state = self.live(workspace_id, now).await?;
        state.snapshot(&self.policy, workspace_id)
    }

    async fn append_event(&self, event: &UsageEvent) -> Result<AppendOutcome, LucError> {
        let mut state = self.live(&event.workspace_id, event.recorded_at).await?;

        let key = (event.operation_id.clone(), event.resource.clone());
        if let Some(&idx) = state.keys.get(&key) {
            let prior = &state.events[idx];
            if prior.amount != event.amount || prior.cost_usd != event.cost_usd {
                warn!(
                    workspace_id = %event.workspace_id,
                    operation_id = %event.operation_id,
                    resource = %event.resource,
                    prior_amount = prior.amount,
                    amount = event.amount,
                    "duplicate operation with a different payload ignored"
                );
            }
            return Ok(AppendOutcome {
                account: state.snapshot(&self.policy, &event.workspace_id)?,
                duplicate: true,
            });
        }

        // A cycle rolled by a concurrent writer still takes this event.
        let mut event = event.clone();
        if event.recorded_at < state.cycle_start {
            event.recorded_at = state.cycle_start;
        }

        let used = state.used.entry(event.resource.clone()).or_insert(0);
        *used = used
            .checked_add(event.amount)
            .ok_or_else(|| LucError::validation("usage counter overflow"))?;
        let idx = state.events.len();
        state.events.push(event.clone());
        state.keys.insert(key, idx);

        info!(
            workspace_id = %event.workspace_id,
            operation_id = %event.operation_id,
            resource = %event.resource,
            amount = event.amount,
            cost_usd = event.cost_usd,
            "usage recorded"
        );
        Ok(AppendOutcome {
            account: state.snapshot(&self.policy, &event.workspace_id)?,
            duplicate: false,
        })
    }

    async fn rollover(
        &self,
        workspace_id: &WorkspaceId,
        now: DateTime<Utc>,
    ) -> Result<Account, LucError> {
        self.current_aggregate(workspace_id, now).await
    }

    async fn set_tier(
        &self,
        workspace_id: &WorkspaceId,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> Result<Account, LucError> {
        self.policy.limits_for(tier)?;
        let mut state = self.live(workspace_id, now).await?;
        info!(workspace_id = %workspace_id, from = %state.tier, to = %tier, "tier changed");
        state.tier = tier;
        state.snapshot(&self.policy, workspace_id)
    }

    async fn events(
        &self,
        workspace_id: &WorkspaceId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>, LucError> {
        let state = self.slot(workspace_id)?.lock_owned().await;
        let mut events: Vec<UsageEvent> = state
            .events
            .iter()
            .filter(|e| e.recorded_at >= from && e.recorded_at < until)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.recorded_at);
        Ok(events)
    }

    async fn cycle_history(&self, workspace_id: &WorkspaceId) -> Result<Vec<CycleArchive>, LucError> {
        let state = self.slot(workspace_id)?.lock_owned().await;
        Ok(state.archives.iter().rev().cloned().collect())
    }

    async fn insert_settlement(&self, settlement: &Settlement) -> Result<Settlement, LucError> {
        match self.settlements.entry(settlement.task_id.clone()) {
            Entry::Occupied(existing) => {
                if existing.get().workspace_id != settlement.workspace_id {
                    return Err(LucError::validation(format!(
                        "task `{}` is already settled by another workspace",
                        settlement.task_id
                    )));
                }
                Ok(existing.get().clone())
            }
            Entry::Vacant(slot) => {
                slot.insert(settlement.clone());
                info!(
                    workspace_id = %settlement.workspace_id,
                    task_id = %settlement.task_id,
                    final_cost_usd = settlement.final_cost_usd,
                    paid = settlement.paid,
                    "settlement stored"
                );
                Ok(settlement.clone())
            }
        }
    }

    async fn get_settlement(&self, task_id: &str) -> Result<Option<Settlement>, LucError> {
        Ok(self.settlements.get(task_id).map(|s| s.value().clone()))
    }
}
