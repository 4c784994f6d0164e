// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness assembling a metering engine over either ledger backend.
//!
//! `TestHarness` wires a policy, a ledger (in-memory, temp-file SQLite or
//! always-failing), the default cost model and a [`ManualClock`], and offers
//! shorthand helpers for the common engine calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use luc_config::model::{LucConfig, PricingConfig};
use luc_core::{LedgerAdapter, LucError, QuotaPolicy, Resource, Tier};
use luc_cost::CostModel;
use luc_metering::request::{RequirementDto, UsageItemDto};
use luc_metering::{
    Admission, CanExecuteRequest, MeteringEngine, RecordUsageRequest, Summary, SummaryRequest,
};
use luc_storage::{Database, MemoryLedger, SqliteLedger};

use crate::clock::ManualClock;
use crate::failing_ledger::FailingLedger;

/// Which ledger implementation the harness runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Memory,
    /// SQLite file in a temp directory, removed on drop.
    Sqlite,
    /// Every call fails with `StorageUnavailable`.
    Failing,
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    backend: LedgerBackend,
    tiers: Vec<(Tier, Vec<(String, u64)>, u32)>,
    default_tier: Tier,
    max_discount: f64,
    clock: ManualClock,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            backend: LedgerBackend::Memory,
            tiers: Vec::new(),
            default_tier: Tier::Free,
            max_discount: luc_core::MAX_DISCOUNT_CAP,
            clock: ManualClock::default(),
        }
    }

    pub fn backend(mut self, backend: LedgerBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Add a tier table. Without any, the built-in tiers from the default
    /// configuration are used.
    pub fn with_tier(mut self, tier: Tier, limits: &[(&str, u64)], cycle_days: u32) -> Self {
        let limits = limits.iter().map(|(r, l)| (r.to_string(), *l)).collect();
        self.tiers.push((tier, limits, cycle_days));
        self
    }

    pub fn default_tier(mut self, tier: Tier) -> Self {
        self.default_tier = tier;
        self
    }

    pub fn max_discount(mut self, max_discount: f64) -> Self {
        self.max_discount = max_discount;
        self
    }

    pub fn clock(mut self, clock: ManualClock) -> Self {
        self.clock = clock;
        self
    }

    fn policy(&self) -> Result<QuotaPolicy, LucError> {
        if self.tiers.is_empty() {
            let mut config = LucConfig::default().policy;
            config.default_tier = self.default_tier;
            config.max_discount = self.max_discount;
            return config.to_policy();
        }
        let mut policy = QuotaPolicy::new(self.default_tier, self.max_discount)?;
        for (tier, limits, cycle_days) in &self.tiers {
            let limits = limits
                .iter()
                .map(|(r, l)| Ok((Resource::parse(r)?, *l)))
                .collect::<Result<BTreeMap<_, _>, LucError>>()?;
            policy = policy.with_tier(*tier, limits, *cycle_days);
        }
        policy.validate()?;
        Ok(policy)
    }

    /// Build the harness, creating the ledger and engine.
    pub async fn build(self) -> Result<TestHarness, LucError> {
        let policy = Arc::new(self.policy()?);

        let mut temp_dir = None;
        let ledger: Arc<dyn LedgerAdapter> = match self.backend {
            LedgerBackend::Memory => Arc::new(MemoryLedger::new(policy.clone())),
            LedgerBackend::Sqlite => {
                let dir = tempfile::TempDir::new().map_err(LucError::storage)?;
                let path = dir.path().join("luc-test.db");
                let db = Database::open(&path.to_string_lossy()).await?;
                temp_dir = Some(dir);
                Arc::new(SqliteLedger::new(db, policy.clone()))
            }
            LedgerBackend::Failing => Arc::new(FailingLedger),
        };

        let cost = CostModel::from_config(&PricingConfig::default())?;
        let engine = MeteringEngine::new(ledger.clone(), policy.clone(), cost)
            .with_clock(self.clock.clock());

        Ok(TestHarness {
            engine: Arc::new(engine),
            ledger,
            policy,
            clock: self.clock,
            _temp_dir: temp_dir,
        })
    }
}

/// A metering engine over a fresh ledger with a manual clock.
pub struct TestHarness {
    pub engine: Arc<MeteringEngine>,
    pub ledger: Arc<dyn LedgerAdapter>,
    pub policy: Arc<QuotaPolicy>,
    pub clock: ManualClock,
    /// Kept alive so the SQLite file outlives the harness.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Record `(resource, amount)` pairs under one operation id at zero cost.
    pub async fn record(
        &self,
        workspace_id: &str,
        operation_id: &str,
        usage: &[(&str, u64)],
    ) -> Result<Summary, LucError> {
        let cmd = RecordUsageRequest {
            workspace_id: workspace_id.into(),
            operation_id: operation_id.into(),
            usage: usage
                .iter()
                .map(|(resource, amount)| UsageItemDto {
                    resource: resource.to_string(),
                    amount: *amount,
                    cost_usd: 0.0,
                })
                .collect(),
        }
        .validate(&self.policy)?;
        self.engine.record_usage(&cmd).await
    }

    pub async fn can_execute(
        &self,
        workspace_id: &str,
        requirements: &[(&str, u64)],
    ) -> Result<Admission, LucError> {
        let cmd = CanExecuteRequest {
            workspace_id: workspace_id.into(),
            resource: None,
            projected_amount: None,
            requirements: Some(
                requirements
                    .iter()
                    .map(|(resource, projected)| RequirementDto {
                        resource: resource.to_string(),
                        projected_amount: *projected,
                    })
                    .collect(),
            ),
        }
        .validate(&self.policy)?;
        self.engine.can_execute(&cmd).await
    }

    /// Summary with breakdown and 30 days of history.
    pub async fn summary(&self, workspace_id: &str) -> Result<Summary, LucError> {
        let cmd = SummaryRequest {
            workspace_id: workspace_id.into(),
            include_breakdown: true,
            include_history: true,
            history_days: None,
        }
        .validate()?;
        self.engine.summary(&cmd).await
    }
}
