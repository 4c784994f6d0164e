// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring: configuration in, ledger + engine + guard + gateway state out.

use std::sync::Arc;
use std::time::Duration;

use luc_config::model::{GuardBackend, LucConfig, StorageBackend};
use luc_core::{AdmissionGuard, LedgerAdapter, LucError, PluginAdapter};
use luc_cost::CostModel;
use luc_gateway::{CallerRegistry, GatewayState};
use luc_metering::{MeteringEngine, SlidingWindowGuard};
use luc_storage::{Database, MemoryLedger, SqliteAdmissionGuard, SqliteLedger};
use tracing::{info, warn};

/// Everything `serve` and the one-shot commands need.
pub struct App {
    pub engine: Arc<MeteringEngine>,
    pub ledger: Arc<dyn LedgerAdapter>,
    /// Open database, when either the ledger or the guard is SQLite-backed.
    pub database: Option<Database>,
}

impl App {
    pub async fn build(config: &LucConfig) -> Result<Self, LucError> {
        let policy = Arc::new(config.policy.to_policy()?);
        let cost = CostModel::from_config(&config.pricing)?;

        let (ledger, database): (Arc<dyn LedgerAdapter>, Option<Database>) =
            match config.storage.backend {
                StorageBackend::Sqlite => {
                    let ledger = SqliteLedger::open(&config.storage, policy.clone()).await?;
                    let db = ledger.database().clone();
                    (Arc::new(ledger), Some(db))
                }
                StorageBackend::Memory => (Arc::new(MemoryLedger::new(policy.clone())), None),
            };

        info!(
            ledger = ledger.name(),
            default_tier = %policy.default_tier(),
            max_discount = policy.max_discount(),
            "metering engine ready"
        );

        let engine = Arc::new(MeteringEngine::new(ledger.clone(), policy, cost));
        Ok(Self {
            engine,
            ledger,
            database,
        })
    }

    /// Build the admission guard named by `[guard] backend`.
    pub async fn guard(&self, config: &LucConfig) -> Result<Arc<dyn AdmissionGuard>, LucError> {
        let window = Duration::from_secs(config.guard.window_secs);
        Ok(match config.guard.backend {
            GuardBackend::Memory => Arc::new(SlidingWindowGuard::from_config(&config.guard)),
            GuardBackend::Sqlite => {
                let db = match &self.database {
                    Some(db) => db.clone(),
                    None => {
                        Database::open_with_options(
                            &config.storage.database_path,
                            config.storage.wal_mode,
                        )
                        .await?
                    }
                };
                Arc::new(SqliteAdmissionGuard::new(db, config.guard.max_requests, window))
            }
        })
    }

    pub async fn gateway_state(&self, config: &LucConfig) -> Result<GatewayState, LucError> {
        let callers = CallerRegistry::from_config(&config.gateway.callers)?;
        if callers.is_empty() {
            warn!("no [[gateway.callers]] configured -- every API request will be rejected");
        }
        Ok(GatewayState::new(
            self.engine.clone(),
            self.guard(config).await?,
            callers,
        ))
    }

    pub async fn shutdown(&self) -> Result<(), LucError> {
        self.ledger.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use luc_config::model::CallerConfig;
    use tower::ServiceExt;

    use super::*;

    fn config(backend: StorageBackend, dir: &tempfile::TempDir) -> LucConfig {
        let mut config = LucConfig::default();
        config.storage.backend = backend;
        config.storage.database_path = dir.path().join("luc.db").to_string_lossy().to_string();
        config.gateway.callers = vec![CallerConfig {
            id: "ops".into(),
            token: "ops-token".into(),
        }];
        config
    }

    #[tokio::test]
    async fn default_config_builds_a_working_gateway() {
        let dir = tempfile::TempDir::new().unwrap();
        for backend in [StorageBackend::Memory, StorageBackend::Sqlite] {
            let config = config(backend, &dir);
            let app = App::build(&config).await.unwrap();
            let state = app.gateway_state(&config).await.unwrap();
            let response = luc_gateway::router(state)
                .oneshot(
                    Request::builder()
                        .uri("/v1/summary?workspace_id=acme")
                        .header("authorization", "Bearer ops-token")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            app.shutdown().await.unwrap();
        }
    }

    #[tokio::test]
    async fn sqlite_guard_opens_its_own_database_for_memory_ledger() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = config(StorageBackend::Memory, &dir);
        config.guard.backend = GuardBackend::Sqlite;
        let app = App::build(&config).await.unwrap();
        assert!(app.database.is_none());
        let guard = app.guard(&config).await.unwrap();
        assert_eq!(guard.name(), "sqlite-window");
        assert!(dir.path().join("luc.db").exists());
    }
}
