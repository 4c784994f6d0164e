// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ledger backends for the LUC metering engine.
//!
//! Provides a WAL-mode SQLite ledger with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`, an in-memory ledger
//! with per-workspace locks, and a SQLite-backed admission guard whose
//! counters are shared between instances.

pub mod adapter;
pub mod database;
pub mod guard;
pub mod memory;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteLedger;
pub use database::Database;
pub use guard::SqliteAdmissionGuard;
pub use memory::MemoryLedger;
