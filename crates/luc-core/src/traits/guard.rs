// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission guard trait: a per-caller request-rate gate that sits in front
//! of the metering engine and knows nothing about quotas.

use async_trait::async_trait;

use crate::error::LucError;
use crate::traits::adapter::PluginAdapter;
use crate::types::CallerId;

#[async_trait]
pub trait AdmissionGuard: PluginAdapter {
    /// Count one request for `caller` and report whether it may proceed.
    ///
    /// Callers must treat an `Err` as a rejection.
    async fn allow(&self, caller: &CallerId) -> Result<bool, LucError>;
}
