// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settlement records: one immutable final charge per task.

use luc_core::types::format_timestamp;
use luc_core::{LucError, Settlement, SettlementDiscount, WorkspaceId};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::{json_column, to_json, ts_column};
use crate::database::Database;

fn select_settlement(conn: &Connection, task_id: &str) -> rusqlite::Result<Option<Settlement>> {
    conn.query_row(
        "SELECT settlement_id, workspace_id, task_id, final_cost_usd, paid,
                receipt_url, discount, created_at
         FROM settlements WHERE task_id = ?1",
        params![task_id],
        |row| {
            let workspace_id: String = row.get(1)?;
            let discount: Option<String> = row.get(6)?;
            Ok(Settlement {
                settlement_id: row.get(0)?,
                workspace_id: WorkspaceId::parse(&workspace_id).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
                task_id: row.get(2)?,
                final_cost_usd: row.get(3)?,
                paid: row.get(4)?,
                receipt_url: row.get(5)?,
                discount: match discount {
                    Some(_) => Some(json_column::<SettlementDiscount>(row, 6)?),
                    None => None,
                },
                created_at: ts_column(row, 7)?,
            })
        },
    )
    .optional()
}

/// Insert `settlement` unless its task already has one; returns the stored row.
///
/// A task id already settled by another workspace is a validation error.
pub async fn insert_settlement(db: &Database, settlement: &Settlement) -> Result<Settlement, LucError> {
    let settlement = settlement.clone();
    db.call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(existing) = select_settlement(&tx, &settlement.task_id)? {
            if existing.workspace_id != settlement.workspace_id {
                return Ok(Err(LucError::validation(format!(
                    "task `{}` is already settled by another workspace",
                    settlement.task_id
                ))));
            }
            return Ok(Ok(existing));
        }

        let discount = settlement.discount.as_ref().map(to_json).transpose()?;
        tx.execute(
            "INSERT INTO settlements
             (settlement_id, workspace_id, task_id, final_cost_usd, paid, receipt_url, discount, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                settlement.settlement_id,
                settlement.workspace_id.as_str(),
                settlement.task_id,
                settlement.final_cost_usd,
                settlement.paid,
                settlement.receipt_url,
                discount,
                format_timestamp(&settlement.created_at),
            ],
        )?;
        tx.commit()?;
        info!(
            workspace_id = %settlement.workspace_id,
            task_id = %settlement.task_id,
            final_cost_usd = settlement.final_cost_usd,
            paid = settlement.paid,
            "settlement stored"
        );
        Ok(Ok(settlement))
    })
    .await
}

pub async fn get_settlement(db: &Database, task_id: &str) -> Result<Option<Settlement>, LucError> {
    let task_id = task_id.to_string();
    db.connection()
        .call(move |conn| select_settlement(conn, &task_id))
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn settlement(workspace: &str, task: &str, cost: f64) -> Settlement {
        Settlement {
            settlement_id: uuid::Uuid::new_v4().to_string(),
            workspace_id: WorkspaceId::parse(workspace).unwrap(),
            task_id: task.to_string(),
            final_cost_usd: cost,
            paid: true,
            receipt_url: Some("https://receipts.example/1".into()),
            discount: Some(SettlementDiscount {
                discount_pct: 0.2,
                savings_usd: 0.5,
            }),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn settlement_is_stored_once() {
        let db = Database::open_in_memory().await.unwrap();
        let first = insert_settlement(&db, &settlement("ws", "task-1", 2.0))
            .await
            .unwrap();
        let again = insert_settlement(&db, &settlement("ws", "task-1", 9.0))
            .await
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(again.final_cost_usd, 2.0);

        let read = get_settlement(&db, "task-1").await.unwrap().unwrap();
        assert_eq!(read, first);
        assert!(get_settlement(&db, "task-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn foreign_workspace_cannot_reuse_task_id() {
        let db = Database::open_in_memory().await.unwrap();
        insert_settlement(&db, &settlement("ws-a", "task-1", 2.0))
            .await
            .unwrap();
        let err = insert_settlement(&db, &settlement("ws-b", "task-1", 2.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LucError::Validation(_)));
    }
}
