// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metering engine for LUC.
//!
//! Orchestrates the quota policy, a ledger adapter and the cost model behind
//! four operations (`can_execute`, `estimate`, `record_usage`, `summary`)
//! plus settlements and tier changes. Requests are validated once in
//! [`request`] before the engine sees them.

pub mod engine;
pub mod guard;
pub mod request;
pub mod summary;

pub use engine::MeteringEngine;
pub use guard::SlidingWindowGuard;
pub use request::{
    CanExecuteCommand, CanExecuteRequest, EstimateCommand, EstimateRequest, RecordUsageCommand,
    RecordUsageRequest, SetTierCommand, SetTierRequest, SettleCommand, SettleRequest,
    SettlementLookup, SummaryCommand, SummaryRequest, UsageItemDto,
};
pub use summary::{Admission, BlockingQuota, QuotaStatus, Summary};
