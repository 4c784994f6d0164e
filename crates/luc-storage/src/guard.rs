// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission guard whose counters live in the ledger database, so every
//! instance pointing at the same file shares one limit per caller.

use std::time::Duration;

use async_trait::async_trait;
use luc_core::types::{system_clock, Clock};
use luc_core::{AdapterType, AdmissionGuard, CallerId, HealthStatus, LucError, PluginAdapter};
use tracing::warn;

use crate::database::Database;
use crate::queries;

/// Sliding-window counter approximated from two fixed windows.
pub struct SqliteAdmissionGuard {
    db: Database,
    max_requests: u32,
    window: Duration,
    clock: Clock,
}

impl SqliteAdmissionGuard {
    pub fn new(db: Database, max_requests: u32, window: Duration) -> Self {
        Self::with_clock(db, max_requests, window, system_clock())
    }

    pub fn with_clock(db: Database, max_requests: u32, window: Duration, clock: Clock) -> Self {
        Self {
            db,
            max_requests,
            window,
            clock,
        }
    }
}

#[async_trait]
impl PluginAdapter for SqliteAdmissionGuard {
    fn name(&self) -> &str {
        "sqlite-window"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::AdmissionGuard
    }

    async fn health_check(&self) -> Result<HealthStatus, LucError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LucError> {
        Ok(())
    }
}

#[async_trait]
impl AdmissionGuard for SqliteAdmissionGuard {
    async fn allow(&self, caller: &CallerId) -> Result<bool, LucError> {
        let now_ms = (self.clock)().timestamp_millis();
        let window_ms = i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX);
        let allowed = queries::rate_windows::try_acquire(
            &self.db,
            caller.as_str(),
            now_ms,
            window_ms,
            self.max_requests,
        )
        .await?;
        if !allowed {
            warn!(caller_id = %caller, max_requests = self.max_requests, "admission denied");
        }
        Ok(allowed)
    }
}
