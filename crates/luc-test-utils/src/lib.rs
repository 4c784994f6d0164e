// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for LUC integration tests.
//!
//! # Components
//!
//! - [`TestHarness`] - metering engine over a memory, SQLite or failing ledger
//! - [`ManualClock`] - deterministic time source for billing-cycle tests
//! - [`FailingLedger`] - ledger that is always unavailable

pub mod clock;
pub mod failing_ledger;
pub mod harness;

pub use clock::ManualClock;
pub use failing_ledger::FailingLedger;
pub use harness::{LedgerBackend, TestHarness};
