// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only usage events and the aggregate increment that accompanies them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use luc_core::types::format_timestamp;
use luc_core::{AppendOutcome, LucError, OperationId, QuotaPolicy, UsageEvent, WorkspaceId};
use rusqlite::{params, OptionalExtension};
use tracing::{info, warn};

use super::accounts::{live_account, load_account};
use super::{resource_column, ts_column};
use crate::database::Database;

/// Append `event` and increment its aggregate in one transaction.
///
/// A repeated `(workspace_id, operation_id, resource)` writes nothing and
/// returns the live aggregate with `duplicate = true`.
pub async fn append_event(
    db: &Database,
    policy: Arc<QuotaPolicy>,
    event: &UsageEvent,
) -> Result<AppendOutcome, LucError> {
    let amount = i64::try_from(event.amount)
        .map_err(|_| LucError::validation(format!("amount {} is too large", event.amount)))?;
    let event = event.clone();
    db.call(move |conn| {
        let tx = conn.transaction()?;
        let row = match live_account(&tx, &policy, &event.workspace_id, event.recorded_at)? {
            Ok(row) => row,
            Err(e) => return Ok(Err(e)),
        };

        let existing: Option<(i64, f64)> = tx
            .query_row(
                "SELECT amount, cost_usd FROM usage_events
                 WHERE workspace_id = ?1 AND operation_id = ?2 AND resource = ?3",
                params![
                    event.workspace_id.as_str(),
                    event.operation_id.as_str(),
                    event.resource.as_str(),
                ],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((prior_amount, prior_cost)) = existing {
            if prior_amount != amount || prior_cost != event.cost_usd {
                warn!(
                    workspace_id = %event.workspace_id,
                    operation_id = %event.operation_id,
                    resource = %event.resource,
                    prior_amount,
                    amount,
                    "duplicate operation with a different payload ignored"
                );
            }
            let account = load_account(&tx, &policy, &event.workspace_id, row)?;
            tx.commit()?;
            return Ok(account.map(|account| AppendOutcome {
                account,
                duplicate: true,
            }));
        }

        // A cycle rolled by a concurrent writer still takes this event.
        let recorded_at = event.recorded_at.max(row.cycle_start);
        let cycle_start = format_timestamp(&row.cycle_start);

        let used: i64 = tx
            .query_row(
                "SELECT used FROM account_aggregates
                 WHERE workspace_id = ?1 AND cycle_start = ?2 AND resource = ?3",
                params![event.workspace_id.as_str(), cycle_start, event.resource.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);
        if used.checked_add(amount).is_none() {
            return Ok(Err(LucError::validation(format!(
                "recording {} more `{}` would overflow the usage counter",
                event.amount, event.resource
            ))));
        }

        tx.execute(
            "INSERT INTO usage_events
             (event_id, workspace_id, resource, amount, cost_usd, operation_id, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.event_id,
                event.workspace_id.as_str(),
                event.resource.as_str(),
                amount,
                event.cost_usd,
                event.operation_id.as_str(),
                format_timestamp(&recorded_at),
            ],
        )?;
        tx.execute(
            "INSERT INTO account_aggregates (workspace_id, cycle_start, resource, used)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (workspace_id, cycle_start, resource)
             DO UPDATE SET used = used + excluded.used",
            params![
                event.workspace_id.as_str(),
                cycle_start,
                event.resource.as_str(),
                amount,
            ],
        )?;

        let account = load_account(&tx, &policy, &event.workspace_id, row)?;
        tx.commit()?;

        info!(
            workspace_id = %event.workspace_id,
            operation_id = %event.operation_id,
            resource = %event.resource,
            amount = event.amount,
            cost_usd = event.cost_usd,
            "usage recorded"
        );
        Ok(account.map(|account| AppendOutcome {
            account,
            duplicate: false,
        }))
    })
    .await
}

/// Events recorded in `[from, until)`, oldest first.
pub async fn list_events(
    db: &Database,
    workspace_id: &WorkspaceId,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<UsageEvent>, LucError> {
    let workspace_id = workspace_id.clone();
    db.call(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT event_id, resource, amount, cost_usd, operation_id, recorded_at
             FROM usage_events
             WHERE workspace_id = ?1 AND recorded_at >= ?2 AND recorded_at < ?3
             ORDER BY recorded_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(
            params![
                workspace_id.as_str(),
                format_timestamp(&from),
                format_timestamp(&until),
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    resource_column(row, 1)?,
                    super::count_column(row, 2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, String>(4)?,
                    ts_column(row, 5)?,
                ))
            },
        )?;

        let mut events = Vec::new();
        for row in rows {
            let (event_id, resource, amount, cost_usd, operation_id, recorded_at) = row?;
            let operation_id = match OperationId::parse(&operation_id) {
                Ok(id) => id,
                Err(e) => return Ok(Err(e)),
            };
            events.push(UsageEvent {
                event_id,
                workspace_id: workspace_id.clone(),
                resource,
                amount,
                cost_usd,
                operation_id,
                recorded_at,
            });
        }
        Ok(Ok(events))
    })
    .await
}
