// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits implemented by ledger and admission-guard backends.

pub mod adapter;
pub mod guard;
pub mod ledger;

pub use adapter::PluginAdapter;
pub use guard::AdmissionGuard;
pub use ledger::LedgerAdapter;
