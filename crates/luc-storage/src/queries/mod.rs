// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the ledger tables.
//!
//! Every public function takes a [`Database`](crate::database::Database) and
//! runs on its single writer thread. Mutations are one transaction each.

pub mod accounts;
pub mod events;
pub mod rate_windows;
pub mod settlements;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use luc_core::types::parse_timestamp;
use luc_core::{Resource, Tier};
use rusqlite::types::Type;

fn conversion_failure<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Read a timestamp column written with `format_timestamp`.
pub(crate) fn ts_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| conversion_failure(idx, e))
}

pub(crate) fn tier_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Tier> {
    let raw: String = row.get(idx)?;
    Tier::from_str(&raw).map_err(|e| conversion_failure(idx, e))
}

pub(crate) fn resource_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Resource> {
    let raw: String = row.get(idx)?;
    Resource::parse(&raw).map_err(|e| conversion_failure(idx, e))
}

/// Stored counters are non-negative by schema constraint.
pub(crate) fn count_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw).map_err(|e| conversion_failure(idx, e))
}

/// Read a JSON text column.
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_failure(idx, e))
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
