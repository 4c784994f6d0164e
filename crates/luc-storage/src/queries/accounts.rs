// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account lifecycle: lazy creation, billing-cycle rollover and tier changes.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use luc_core::types::format_timestamp;
use luc_core::{cycle_window, Account, CycleArchive, LucError, QuotaPolicy, Resource, Tier, WorkspaceId};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::{count_column, json_column, resource_column, tier_column, to_json, ts_column};
use crate::database::{Database, Staged};

/// The persisted part of an account, without its aggregates.
#[derive(Debug, Clone)]
pub(crate) struct AccountRow {
    pub tier: Tier,
    pub cycle_start: DateTime<Utc>,
    pub cycle_end: DateTime<Utc>,
}

pub(crate) fn select_account(conn: &Connection, workspace_id: &str) -> rusqlite::Result<Option<AccountRow>> {
    conn.query_row(
        "SELECT tier, cycle_start, cycle_end FROM accounts WHERE workspace_id = ?1",
        params![workspace_id],
        |row| {
            Ok(AccountRow {
                tier: tier_column(row, 0)?,
                cycle_start: ts_column(row, 1)?,
                cycle_end: ts_column(row, 2)?,
            })
        },
    )
    .optional()
}

/// Per-resource usage for the cycle starting at `cycle_start`.
pub(crate) fn select_usage(
    conn: &Connection,
    workspace_id: &str,
    cycle_start: &DateTime<Utc>,
) -> rusqlite::Result<BTreeMap<Resource, u64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT resource, used FROM account_aggregates
         WHERE workspace_id = ?1 AND cycle_start = ?2",
    )?;
    let rows = stmt.query_map(params![workspace_id, format_timestamp(cycle_start)], |row| {
        Ok((resource_column(row, 0)?, count_column(row, 1)?))
    })?;
    rows.collect()
}

/// Join a stored row with its usage and the policy limits.
pub(crate) fn load_account(
    conn: &Connection,
    policy: &QuotaPolicy,
    workspace_id: &WorkspaceId,
    row: AccountRow,
) -> Staged<Account> {
    let used = select_usage(conn, workspace_id.as_str(), &row.cycle_start)?;
    Ok(policy.quotas_for(row.tier, &used).map(|aggregates| Account {
        workspace_id: workspace_id.clone(),
        tier: row.tier,
        billing_cycle_start: row.cycle_start,
        billing_cycle_end: row.cycle_end,
        aggregates,
    }))
}

/// Archive the live cycle and open the one containing `now`, if it has ended.
///
/// Must run inside the caller's transaction.
pub(crate) fn roll_if_due(
    conn: &Connection,
    policy: &QuotaPolicy,
    workspace_id: &str,
    row: AccountRow,
    now: DateTime<Utc>,
) -> Staged<AccountRow> {
    if now < row.cycle_end {
        return Ok(Ok(row));
    }
    let length = match policy.cycle_length(row.tier) {
        Ok(length) => length,
        Err(e) => return Ok(Err(e)),
    };
    let used = select_usage(conn, workspace_id, &row.cycle_start)?;
    let closing = match policy.quotas_for(row.tier, &used) {
        Ok(quotas) => quotas,
        Err(e) => return Ok(Err(e)),
    };

    conn.execute(
        "INSERT OR IGNORE INTO billing_cycles
         (workspace_id, cycle_start, cycle_end, tier, aggregates, archived_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            workspace_id,
            format_timestamp(&row.cycle_start),
            format_timestamp(&row.cycle_end),
            row.tier.to_string(),
            to_json(&closing)?,
            format_timestamp(&now),
        ],
    )?;

    let (start, end) = cycle_window(row.cycle_end, length, now);
    conn.execute(
        "UPDATE accounts SET cycle_start = ?2, cycle_end = ?3, updated_at = ?4
         WHERE workspace_id = ?1",
        params![
            workspace_id,
            format_timestamp(&start),
            format_timestamp(&end),
            format_timestamp(&now),
        ],
    )?;

    info!(
        workspace_id,
        closed_start = %row.cycle_start,
        closed_end = %row.cycle_end,
        cycle_start = %start,
        cycle_end = %end,
        "billing cycle rolled over"
    );
    Ok(Ok(AccountRow {
        tier: row.tier,
        cycle_start: start,
        cycle_end: end,
    }))
}

/// Lock the account row for the rest of the transaction, rolling it over if due.
///
/// Returns `AccountNotFound` when the account does not exist.
pub(crate) fn live_account(
    conn: &Connection,
    policy: &QuotaPolicy,
    workspace_id: &WorkspaceId,
    now: DateTime<Utc>,
) -> Staged<AccountRow> {
    match select_account(conn, workspace_id.as_str())? {
        Some(row) => roll_if_due(conn, policy, workspace_id.as_str(), row, now),
        None => Ok(Err(LucError::AccountNotFound {
            workspace_id: workspace_id.to_string(),
        })),
    }
}

/// Create the account at the default tier if absent and return it.
pub async fn ensure_account(
    db: &Database,
    policy: Arc<QuotaPolicy>,
    workspace_id: &WorkspaceId,
    now: DateTime<Utc>,
) -> Result<Account, LucError> {
    let workspace_id = workspace_id.clone();
    db.call(move |conn| {
        let tx = conn.transaction()?;
        let row = match select_account(&tx, workspace_id.as_str())? {
            Some(row) => match roll_if_due(&tx, &policy, workspace_id.as_str(), row, now)? {
                Ok(row) => row,
                Err(e) => return Ok(Err(e)),
            },
            None => {
                let tier = policy.default_tier();
                let length = match policy.cycle_length(tier) {
                    Ok(length) => length,
                    Err(e) => return Ok(Err(e)),
                };
                let stamp = format_timestamp(&now);
                tx.execute(
                    "INSERT INTO accounts (workspace_id, tier, cycle_start, cycle_end, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![
                        workspace_id.as_str(),
                        tier.to_string(),
                        stamp,
                        format_timestamp(&(now + length)),
                        stamp,
                    ],
                )?;
                info!(workspace_id = %workspace_id, %tier, "account created");
                AccountRow {
                    tier,
                    cycle_start: now,
                    cycle_end: now + length,
                }
            }
        };
        let account = load_account(&tx, &policy, &workspace_id, row)?;
        tx.commit()?;
        Ok(account)
    })
    .await
}

/// Read the live-cycle aggregate, rolling over first if due.
pub async fn current_aggregate(
    db: &Database,
    policy: Arc<QuotaPolicy>,
    workspace_id: &WorkspaceId,
    now: DateTime<Utc>,
) -> Result<Account, LucError> {
    let workspace_id = workspace_id.clone();
    db.call(move |conn| {
        let tx = conn.transaction()?;
        let row = match live_account(&tx, &policy, &workspace_id, now)? {
            Ok(row) => row,
            Err(e) => return Ok(Err(e)),
        };
        let account = load_account(&tx, &policy, &workspace_id, row)?;
        tx.commit()?;
        Ok(account)
    })
    .await
}

/// Explicit rollover. A no-op returning the account when the cycle is live.
pub async fn rollover(
    db: &Database,
    policy: Arc<QuotaPolicy>,
    workspace_id: &WorkspaceId,
    now: DateTime<Utc>,
) -> Result<Account, LucError> {
    current_aggregate(db, policy, workspace_id, now).await
}

/// Change the account tier; the live cycle keeps its usage and window.
pub async fn set_tier(
    db: &Database,
    policy: Arc<QuotaPolicy>,
    workspace_id: &WorkspaceId,
    tier: Tier,
    now: DateTime<Utc>,
) -> Result<Account, LucError> {
    policy.limits_for(tier)?;
    let workspace_id = workspace_id.clone();
    db.call(move |conn| {
        let tx = conn.transaction()?;
        let mut row = match live_account(&tx, &policy, &workspace_id, now)? {
            Ok(row) => row,
            Err(e) => return Ok(Err(e)),
        };
        tx.execute(
            "UPDATE accounts SET tier = ?2, updated_at = ?3 WHERE workspace_id = ?1",
            params![workspace_id.as_str(), tier.to_string(), format_timestamp(&now)],
        )?;
        info!(workspace_id = %workspace_id, from = %row.tier, to = %tier, "tier changed");
        row.tier = tier;
        let account = load_account(&tx, &policy, &workspace_id, row)?;
        tx.commit()?;
        Ok(account)
    })
    .await
}

/// Archived cycles, most recent first.
pub async fn cycle_history(
    db: &Database,
    workspace_id: &WorkspaceId,
) -> Result<Vec<CycleArchive>, LucError> {
    let workspace_id = workspace_id.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT tier, cycle_start, cycle_end, aggregates, archived_at
                 FROM billing_cycles WHERE workspace_id = ?1
                 ORDER BY cycle_start DESC",
            )?;
            let rows = stmt.query_map(params![workspace_id.as_str()], |row| {
                Ok(CycleArchive {
                    workspace_id: workspace_id.clone(),
                    tier: tier_column(row, 0)?,
                    cycle_start: ts_column(row, 1)?,
                    cycle_end: ts_column(row, 2)?,
                    aggregates: json_column(row, 3)?,
                    archived_at: ts_column(row, 4)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn policy() -> Arc<QuotaPolicy> {
        let limits = BTreeMap::from([(Resource::parse("api_calls").unwrap(), 50)]);
        Arc::new(
            QuotaPolicy::new(Tier::Free, 0.4)
                .unwrap()
                .with_tier(Tier::Free, limits.clone(), 30)
                .with_tier(Tier::Pro, limits, 7),
        )
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn ensure_account_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        let ws = WorkspaceId::parse("ws-1").unwrap();
        let first = ensure_account(&db, policy(), &ws, t0()).await.unwrap();
        let second = ensure_account(&db, policy(), &ws, t0() + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.billing_cycle_end, t0() + Duration::days(30));
        assert_eq!(first.tier, Tier::Free);
    }

    #[tokio::test]
    async fn current_aggregate_requires_account() {
        let db = Database::open_in_memory().await.unwrap();
        let ws = WorkspaceId::parse("ghost").unwrap();
        let err = current_aggregate(&db, policy(), &ws, t0()).await.unwrap_err();
        assert!(matches!(err, LucError::AccountNotFound { .. }));
    }

    #[tokio::test]
    async fn rollover_archives_and_advances() {
        let db = Database::open_in_memory().await.unwrap();
        let ws = WorkspaceId::parse("ws-1").unwrap();
        ensure_account(&db, policy(), &ws, t0()).await.unwrap();

        let later = t0() + Duration::days(75);
        let account = rollover(&db, policy(), &ws, later).await.unwrap();
        assert_eq!(account.billing_cycle_start, t0() + Duration::days(60));
        assert!(account.cycle_contains(&later));

        let history = cycle_history(&db, &ws).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].cycle_start, t0());
        assert_eq!(history[0].cycle_end, t0() + Duration::days(30));
    }

    #[tokio::test]
    async fn set_tier_keeps_window() {
        let db = Database::open_in_memory().await.unwrap();
        let ws = WorkspaceId::parse("ws-1").unwrap();
        let before = ensure_account(&db, policy(), &ws, t0()).await.unwrap();
        let after = set_tier(&db, policy(), &ws, Tier::Pro, t0()).await.unwrap();
        assert_eq!(after.tier, Tier::Pro);
        assert_eq!(after.billing_cycle_end, before.billing_cycle_end);

        let err = set_tier(&db, policy(), &ws, Tier::Team, t0()).await.unwrap_err();
        assert!(matches!(err, LucError::UnknownTier(_)));
    }
}
