// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixed-window counters backing the SQLite admission guard.

use luc_core::LucError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;

/// Count one request for `caller_id` at `now_ms` and report whether it fits.
///
/// The estimate is the current window's count plus the previous window's
/// count weighted by how much of it still overlaps the sliding window.
/// Rejected requests are not counted.
pub async fn try_acquire(
    db: &Database,
    caller_id: &str,
    now_ms: i64,
    window_ms: i64,
    max_requests: u32,
) -> Result<bool, LucError> {
    let caller_id = caller_id.to_string();
    let window_ms = window_ms.max(1);
    let current = now_ms - now_ms.rem_euclid(window_ms);
    let previous = current - window_ms;

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let count_at = |start: i64| -> rusqlite::Result<i64> {
                Ok(tx
                    .query_row(
                        "SELECT count FROM rate_windows WHERE caller_id = ?1 AND window_start = ?2",
                        params![caller_id, start],
                        |row| row.get(0),
                    )
                    .optional()?
                    .unwrap_or(0))
            };
            let current_count = count_at(current)?;
            let previous_count = count_at(previous)?;

            let overlap = (window_ms - (now_ms - current)) as f64 / window_ms as f64;
            let estimate = previous_count as f64 * overlap + current_count as f64;
            if estimate + 1.0 > f64::from(max_requests) {
                tx.commit()?;
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO rate_windows (caller_id, window_start, count) VALUES (?1, ?2, 1)
                 ON CONFLICT (caller_id, window_start) DO UPDATE SET count = count + 1",
                params![caller_id, current],
            )?;
            tx.execute(
                "DELETE FROM rate_windows WHERE caller_id = ?1 AND window_start < ?2",
                params![caller_id, previous],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_limit_within_window() {
        let db = Database::open_in_memory().await.unwrap();
        for i in 0..3 {
            assert!(try_acquire(&db, "c", 1_000 + i, 60_000, 3).await.unwrap());
        }
        assert!(!try_acquire(&db, "c", 1_010, 60_000, 3).await.unwrap());
        // Other callers are independent.
        assert!(try_acquire(&db, "d", 1_010, 60_000, 3).await.unwrap());
    }

    #[tokio::test]
    async fn previous_window_decays() {
        let db = Database::open_in_memory().await.unwrap();
        for i in 0..4 {
            assert!(try_acquire(&db, "c", i, 1_000, 4).await.unwrap());
        }
        // Just past the boundary the previous window still counts almost fully.
        assert!(!try_acquire(&db, "c", 1_001, 1_000, 4).await.unwrap());
        // Three quarters through the next window only a quarter remains.
        assert!(try_acquire(&db, "c", 1_750, 1_000, 4).await.unwrap());
        // Two windows later everything has expired.
        for i in 0..4 {
            assert!(try_acquire(&db, "c", 3_000 + i, 1_000, 4).await.unwrap());
        }
    }
}
