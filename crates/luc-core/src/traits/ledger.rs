// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ledger adapter trait: the append-only usage store and owner of the
//! account lifecycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::LucError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Account, AppendOutcome, CycleArchive, Settlement, Tier, UsageEvent, WorkspaceId};

/// Durable store of usage events plus the live aggregate per account.
///
/// Implementations must serialize `append_event`, `rollover` and `set_tier`
/// per workspace so that the aggregate always equals the sum of events in
/// the live cycle. Every read or write that observes an ended cycle rolls
/// it over first.
#[async_trait]
pub trait LedgerAdapter: PluginAdapter {
    /// Create the account at the default tier if absent and return it.
    async fn ensure_account(
        &self,
        workspace_id: &WorkspaceId,
        now: DateTime<Utc>,
    ) -> Result<Account, LucError>;

    /// Read the live-cycle aggregate. Fails with `AccountNotFound` if the
    /// account was never ensured.
    async fn current_aggregate(
        &self,
        workspace_id: &WorkspaceId,
        now: DateTime<Utc>,
    ) -> Result<Account, LucError>;

    /// Append an event and increment its resource aggregate atomically.
    ///
    /// A repeated `(workspace_id, operation_id, resource)` is a no-op that
    /// returns the aggregate unchanged with `duplicate = true`.
    async fn append_event(&self, event: &UsageEvent) -> Result<AppendOutcome, LucError>;

    /// Archive the live cycle and open the one containing `now`, if the live
    /// cycle has ended. Otherwise returns the account unchanged.
    async fn rollover(
        &self,
        workspace_id: &WorkspaceId,
        now: DateTime<Utc>,
    ) -> Result<Account, LucError>;

    /// Move the account to another tier; current-cycle usage is kept.
    async fn set_tier(
        &self,
        workspace_id: &WorkspaceId,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> Result<Account, LucError>;

    /// Events recorded in `[from, until)`, oldest first.
    async fn events(
        &self,
        workspace_id: &WorkspaceId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>, LucError>;

    /// Archived cycles, most recent first.
    async fn cycle_history(&self, workspace_id: &WorkspaceId) -> Result<Vec<CycleArchive>, LucError>;

    /// Store a settlement unless one exists for its task; returns the stored one.
    async fn insert_settlement(&self, settlement: &Settlement) -> Result<Settlement, LucError>;

    /// Look up a settlement by task.
    async fn get_settlement(&self, task_id: &str) -> Result<Option<Settlement>, LucError>;
}
