// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the LUC usage-metering engine.
//!
//! This crate provides the error type, the identifiers and records shared by
//! every other crate, the quota policy, and the adapter traits that ledger
//! and admission-guard backends implement.

pub mod error;
pub mod policy;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LucError;
pub use policy::{cycle_window, QuotaPolicy, DEFAULT_CYCLE_DAYS, MAX_CYCLE_DAYS, MAX_DISCOUNT_CAP};
pub use types::{
    Account, AdapterType, AppendOutcome, CallerId, Clock, CycleArchive, HealthStatus,
    OperationId, QuotaUsage, Resource, Settlement, SettlementDiscount, Tier, UsageEvent,
    WorkspaceId,
};

pub use traits::{AdmissionGuard, LedgerAdapter, PluginAdapter};
