// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ledger whose every call fails with `StorageUnavailable`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use luc_core::{
    Account, AdapterType, AppendOutcome, CycleArchive, HealthStatus, LedgerAdapter, LucError,
    PluginAdapter, Settlement, Tier, UsageEvent, WorkspaceId,
};

#[derive(Debug, Default)]
pub struct FailingLedger;

fn unavailable() -> LucError {
    LucError::storage(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "ledger offline",
    ))
}

#[async_trait]
impl PluginAdapter for FailingLedger {
    fn name(&self) -> &str {
        "failing"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Ledger
    }

    async fn health_check(&self) -> Result<HealthStatus, LucError> {
        Ok(HealthStatus::Unhealthy("ledger offline".into()))
    }

    async fn shutdown(&self) -> Result<(), LucError> {
        Ok(())
    }
}

#[async_trait]
impl LedgerAdapter for FailingLedger {
    async fn ensure_account(&self, _: &WorkspaceId, _: DateTime<Utc>) -> Result<Account, LucError> {
        Err(unavailable())
    }

    async fn current_aggregate(
        &self,
        _: &WorkspaceId,
        _: DateTime<Utc>,
    ) -> Result<Account, LucError> {
        Err(unavailable())
    }

    async fn append_event(&self, _: &UsageEvent) -> Result<AppendOutcome, LucError> {
        Err(unavailable())
    }

    async fn rollover(&self, _: &WorkspaceId, _: DateTime<Utc>) -> Result<Account, LucError> {
        Err(unavailable())
    }

    async fn set_tier(&self, _: &WorkspaceId, _: Tier, _: DateTime<Utc>) -> Result<Account, LucError> {
        Err(unavailable())
    }

    async fn events(
        &self,
        _: &WorkspaceId,
        _: DateTime<Utc>,
        _: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>, LucError> {
        Err(unavailable())
    }

    async fn cycle_history(&self, _: &WorkspaceId) -> Result<Vec<CycleArchive>, LucError> {
        Err(unavailable())
    }

    async fn insert_settlement(&self, _: &Settlement) -> Result<Settlement, LucError> {
        Err(unavailable())
    }

    async fn get_settlement(&self, _: &str) -> Result<Option<Settlement>, LucError> {
        Err(unavailable())
    }
}
