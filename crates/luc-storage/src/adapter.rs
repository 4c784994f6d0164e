// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the `LedgerAdapter` trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use luc_config::model::StorageConfig;
use luc_core::{
    Account, AdapterType, AppendOutcome, CycleArchive, HealthStatus, LedgerAdapter, LucError,
    PluginAdapter, QuotaPolicy, Settlement, Tier, UsageEvent, WorkspaceId,
};

use crate::database::Database;
use crate::queries;

/// Durable ledger backed by SQLite.
///
/// Every mutation is a single transaction on the database's writer thread,
/// so appends and rollovers are serialized across all workspaces.
pub struct SqliteLedger {
    db: Database,
    policy: Arc<QuotaPolicy>,
}

impl SqliteLedger {
    /// Wrap an already opened database.
    pub fn new(db: Database, policy: Arc<QuotaPolicy>) -> Self {
        Self { db, policy }
    }

    /// Open the database described by `config` and wrap it.
    pub async fn open(config: &StorageConfig, policy: Arc<QuotaPolicy>) -> Result<Self, LucError> {
        let db = Database::open_with_options(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite ledger initialized");
        Ok(Self::new(db, policy))
    }

    /// The underlying database, shared with the SQLite admission guard.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PluginAdapter for SqliteLedger {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ledger
    }

    async fn health_check(&self) -> Result<HealthStatus, LucError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LucError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl LedgerAdapter for SqliteLedger {
    async fn ensure_account(
        &self,
        workspace_id: &WorkspaceId,
        now: DateTime<Utc>,
    ) -> Result<Account, LucError> {
        queries::accounts::ensure_account(&self.db, self.policy.clone(), workspace_id, now).await
    }

    async fn current_aggregate(
        &self,
        workspace_id: &WorkspaceId,
        now: DateTime<Utc>,
    ) -> Result<Account, LucError> {
        queries::accounts::current_aggregate(&self.db, self.policy.clone(), workspace_id, now)
            .await
    }

    async fn append_event(&self, event: &UsageEvent) -> Result<AppendOutcome, LucError> {
        queries::events::append_event(&self.db, self.policy.clone(), event).await
    }

    async fn rollover(
        &self,
        workspace_id: &WorkspaceId,
        now: DateTime<Utc>,
    ) -> Result<Account, LucError> {
        queries::accounts::rollover(&self.db, self.policy.clone(), workspace_id, now).await
    }

    async fn set_tier(
        &self,
        workspace_id: &WorkspaceId,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> Result<Account, LucError> {
        queries::accounts::set_tier(&self.db, self.policy.clone(), workspace_id, tier, now).await
    }

    async fn events(
        &self,
        workspace_id: &WorkspaceId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>, LucError> {
        queries::events::list_events(&self.db, workspace_id, from, until).await
    }

    async fn cycle_history(&self, workspace_id: &WorkspaceId) -> Result<Vec<CycleArchive>, LucError> {
        queries::accounts::cycle_history(&self.db, workspace_id).await
    }

    async fn insert_settlement(&self, settlement: &Settlement) -> Result<Settlement, LucError> {
        queries::settlements::insert_settlement(&self.db, settlement).await
    }

    async fn get_settlement(&self, task_id: &str) -> Result<Option<Settlement>, LucError> {
        queries::settlements::get_settlement(&self.db, task_id).await
    }
}
