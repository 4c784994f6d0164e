// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the ledger, cost model, metering engine and gateway.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::LucError;

/// Maximum length accepted for workspace, caller, operation and task identifiers.
pub const MAX_ID_LEN: usize = 128;

/// Timestamp layout used for persisted values. Fixed width, so it sorts lexically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Source of "now" for the engine and ledgers. Swappable so tests can drive
/// billing-cycle boundaries.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A clock backed by the system time.
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Format a timestamp for storage.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp previously written by [`format_timestamp`].
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, LucError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| LucError::Internal(format!("malformed timestamp `{raw}`: {e}")))
}

fn check_identifier(kind: &str, raw: &str) -> Result<(), LucError> {
    if raw.trim().is_empty() {
        return Err(LucError::validation(format!("{kind} must not be empty")));
    }
    if raw.len() > MAX_ID_LEN {
        return Err(LucError::validation(format!(
            "{kind} must be at most {MAX_ID_LEN} characters"
        )));
    }
    if raw.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(LucError::validation(format!(
            "{kind} must not contain whitespace or control characters"
        )));
    }
    Ok(())
}

/// Unique identifier for a billed workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Validate and wrap a raw workspace identifier.
    pub fn parse(raw: &str) -> Result<Self, LucError> {
        check_identifier("workspace_id", raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated caller identity, supplied by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    pub fn parse(raw: &str) -> Result<Self, LucError> {
        check_identifier("caller_id", raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied idempotency key for a billable operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    pub fn parse(raw: &str) -> Result<Self, LucError> {
        check_identifier("operation_id", raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A metered resource name such as `api_calls` or `tokens`.
///
/// Lowercase ASCII letters, digits and underscores, starting with a letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(String);

impl Resource {
    pub const API_CALLS: &'static str = "api_calls";
    pub const TOKENS: &'static str = "tokens";
    pub const TASKS: &'static str = "tasks";

    pub fn parse(raw: &str) -> Result<Self, LucError> {
        let valid = !raw.is_empty()
            && raw.len() <= 64
            && raw.starts_with(|c: char| c.is_ascii_lowercase())
            && raw
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(LucError::validation(format!(
                "resource `{raw}` must match [a-z][a-z0-9_]{{0,63}}"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named quota profile.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Pro,
    Team,
    Enterprise,
}

/// Used and limit values for one resource in the live billing cycle.
///
/// A limit of zero means the resource is unmetered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub used: u64,
    pub limit: u64,
}

impl QuotaUsage {
    pub fn new(used: u64, limit: u64) -> Self {
        Self { used, limit }
    }

    /// Whether the resource has no cap.
    pub fn is_unmetered(&self) -> bool {
        self.limit == 0
    }

    /// Fraction of the limit consumed; 0 when unmetered.
    pub fn pct(&self) -> f64 {
        if self.limit == 0 {
            0.0
        } else {
            self.used as f64 / self.limit as f64
        }
    }

    /// Whether `projected` more units fit under the limit.
    pub fn admits(&self, projected: u64) -> bool {
        self.is_unmetered() || self.used.saturating_add(projected) <= self.limit
    }

    /// Whether no further units fit.
    pub fn is_exhausted(&self) -> bool {
        !self.is_unmetered() && self.used >= self.limit
    }
}

/// A workspace's billing account and its live-cycle aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub workspace_id: WorkspaceId,
    pub tier: Tier,
    /// Inclusive start of the live billing cycle.
    pub billing_cycle_start: DateTime<Utc>,
    /// Exclusive end of the live billing cycle.
    pub billing_cycle_end: DateTime<Utc>,
    pub aggregates: BTreeMap<Resource, QuotaUsage>,
}

impl Account {
    /// Whether `ts` falls inside the live cycle's half-open window.
    pub fn cycle_contains(&self, ts: &DateTime<Utc>) -> bool {
        *ts >= self.billing_cycle_start && *ts < self.billing_cycle_end
    }

    /// Whether the live cycle has ended as of `now`.
    pub fn cycle_expired(&self, now: &DateTime<Utc>) -> bool {
        *now >= self.billing_cycle_end
    }

    /// Usage for a resource, zero-filled when the cycle has not touched it.
    pub fn usage(&self, resource: &Resource) -> QuotaUsage {
        self.aggregates
            .get(resource)
            .copied()
            .unwrap_or(QuotaUsage::new(0, 0))
    }
}

/// An immutable record of billable consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub event_id: String,
    pub workspace_id: WorkspaceId,
    pub resource: Resource,
    pub amount: u64,
    pub cost_usd: f64,
    pub operation_id: OperationId,
    pub recorded_at: DateTime<Utc>,
}

impl UsageEvent {
    /// Create a new event with a fresh UUID.
    pub fn new(
        workspace_id: WorkspaceId,
        operation_id: OperationId,
        resource: Resource,
        amount: u64,
        cost_usd: f64,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            workspace_id,
            resource,
            amount,
            cost_usd,
            operation_id,
            recorded_at,
        }
    }
}

/// Result of appending an event to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendOutcome {
    /// The account after the append (unchanged for duplicates).
    pub account: Account,
    /// True when the idempotency key had already been recorded.
    pub duplicate: bool,
}

/// Snapshot of a closed billing cycle, written at rollover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleArchive {
    pub workspace_id: WorkspaceId,
    pub tier: Tier,
    pub cycle_start: DateTime<Utc>,
    pub cycle_end: DateTime<Utc>,
    pub aggregates: BTreeMap<Resource, QuotaUsage>,
    pub archived_at: DateTime<Utc>,
}

/// Discount carried over from the quote into the final charge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettlementDiscount {
    pub discount_pct: f64,
    pub savings_usd: f64,
}

/// The final, reconciled charge for a completed task. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub settlement_id: String,
    pub workspace_id: WorkspaceId,
    pub task_id: String,
    pub final_cost_usd: f64,
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<SettlementDiscount>,
    pub created_at: DateTime<Utc>,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Ledger,
    AdmissionGuard,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_format_roundtrips_at_millisecond_precision() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 10, 30, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        let raw = format_timestamp(&ts);
        assert_eq!(raw, "2026-03-01T10:30:00.250Z");
        assert_eq!(parse_timestamp(&raw).unwrap(), ts);
    }

    #[test]
    fn resource_names_are_restricted() {
        assert!(Resource::parse("api_calls").is_ok());
        assert!(Resource::parse("tokens2").is_ok());
        assert!(Resource::parse("").is_err());
        assert!(Resource::parse("API").is_err());
        assert!(Resource::parse("9lives").is_err());
        assert!(Resource::parse("has-dash").is_err());
    }

    #[test]
    fn workspace_id_rejects_blank_and_whitespace() {
        assert!(WorkspaceId::parse("ws-1").is_ok());
        assert!(WorkspaceId::parse("   ").is_err());
        assert!(WorkspaceId::parse("ws 1").is_err());
        assert!(WorkspaceId::parse(&"x".repeat(MAX_ID_LEN + 1)).is_err());
    }

    #[test]
    fn tier_parses_snake_case() {
        use std::str::FromStr;
        assert_eq!(Tier::from_str("pro").unwrap(), Tier::Pro);
        assert_eq!(Tier::Enterprise.to_string(), "enterprise");
        assert!(Tier::from_str("platinum").is_err());
    }

    #[test]
    fn quota_usage_treats_zero_limit_as_unmetered() {
        let unmetered = QuotaUsage::new(1_000_000, 0);
        assert!(unmetered.admits(u64::MAX));
        assert!(!unmetered.is_exhausted());
        assert_eq!(unmetered.pct(), 0.0);

        let capped = QuotaUsage::new(49, 50);
        assert!(capped.admits(1));
        assert!(!capped.admits(2));
        assert!((capped.pct() - 0.98).abs() < 1e-12);
    }

    #[test]
    fn account_cycle_window_is_half_open() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = start + chrono::Duration::days(30);
        let account = Account {
            workspace_id: WorkspaceId::parse("ws").unwrap(),
            tier: Tier::Free,
            billing_cycle_start: start,
            billing_cycle_end: end,
            aggregates: BTreeMap::new(),
        };
        assert!(account.cycle_contains(&start));
        assert!(!account.cycle_contains(&end));
        assert!(account.cycle_expired(&end));
        assert!(!account.cycle_expired(&(end - chrono::Duration::milliseconds(1))));
    }
    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let ws = WorkspaceId::parse("acme").unwrap();
        assert_eq!(serde_json::to_string(&ws).unwrap(), "\"acme\"");
        assert_eq!(serde_json::to_string(&Tier::Team).unwrap(), "\"team\"");
    }

    proptest::proptest! {
        #[test]
        fn admits_agrees_with_exhaustion(used in 0u64..10_000, limit in 1u64..10_000) {
            let usage = QuotaUsage::new(used, limit);
            proptest::prop_assert_eq!(usage.is_exhausted(), !usage.admits(1));
            if usage.admits(limit) {
                proptest::prop_assert_eq!(used, 0);
            }
        }
    }
}
