// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read models returned by the metering engine.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use luc_core::{Account, CycleArchive, QuotaUsage, Resource, Tier, UsageEvent, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Used, limit and consumed fraction for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub used: u64,
    pub limit: u64,
    /// `used / limit`; 0 when the resource is unmetered.
    pub pct: f64,
}

impl From<QuotaUsage> for QuotaStatus {
    fn from(q: QuotaUsage) -> Self {
        Self {
            used: q.used,
            limit: q.limit,
            pct: q.pct(),
        }
    }
}

/// Headroom detail for a quota that would not admit the projected amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingQuota {
    pub resource: Resource,
    pub used: u64,
    pub limit: u64,
    pub projected: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub allowed: bool,
    /// Names of the resources that would be exceeded.
    pub blocking_quotas: Vec<Resource>,
    pub blocking_details: Vec<BlockingQuota>,
}

/// Current-cycle totals for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBreakdown {
    pub resource: Resource,
    pub amount: u64,
    pub cost_usd: f64,
    pub event_count: u64,
}

/// Totals for one resource on one UTC day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub resource: Resource,
    pub amount: u64,
    pub cost_usd: f64,
    pub event_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageHistory {
    pub days: u32,
    /// Oldest day first.
    pub daily: Vec<DailyUsage>,
    /// Most recent cycle first.
    pub cycles: Vec<CycleArchive>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub workspace_id: WorkspaceId,
    pub tier: Tier,
    pub billing_cycle_start: DateTime<Utc>,
    pub billing_cycle_end: DateTime<Utc>,
    pub quotas: BTreeMap<Resource, QuotaStatus>,
    pub can_execute: bool,
    pub blocking_quotas: Vec<Resource>,
    pub blocking_details: Vec<BlockingQuota>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Vec<ResourceBreakdown>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<UsageHistory>,
}

/// Check each `(resource, projected)` pair against the live aggregate.
///
/// With no requirements, reports every exhausted quota.
pub fn admission(account: &Account, requirements: &[(Resource, u64)]) -> Admission {
    let blocking_details: Vec<BlockingQuota> = if requirements.is_empty() {
        account
            .aggregates
            .iter()
            .filter(|(_, usage)| usage.is_exhausted())
            .map(|(resource, usage)| BlockingQuota {
                resource: resource.clone(),
                used: usage.used,
                limit: usage.limit,
                projected: 0,
            })
            .collect()
    } else {
        requirements
            .iter()
            .filter_map(|(resource, projected)| {
                let usage = account.usage(resource);
                (!usage.admits(*projected)).then(|| BlockingQuota {
                    resource: resource.clone(),
                    used: usage.used,
                    limit: usage.limit,
                    projected: *projected,
                })
            })
            .collect()
    };
    Admission {
        allowed: blocking_details.is_empty(),
        blocking_quotas: blocking_details.iter().map(|b| b.resource.clone()).collect(),
        blocking_details,
    }
}

impl Summary {
    pub fn from_account(account: &Account) -> Self {
        let Admission {
            allowed,
            blocking_quotas,
            blocking_details,
        } = admission(account, &[]);
        Self {
            workspace_id: account.workspace_id.clone(),
            tier: account.tier,
            billing_cycle_start: account.billing_cycle_start,
            billing_cycle_end: account.billing_cycle_end,
            quotas: account
                .aggregates
                .iter()
                .map(|(resource, usage)| (resource.clone(), QuotaStatus::from(*usage)))
                .collect(),
            can_execute: allowed,
            blocking_quotas,
            blocking_details,
            breakdown: None,
            history: None,
        }
    }
}

/// Per-resource totals over `events`, in resource order.
pub fn breakdown(events: &[UsageEvent]) -> Vec<ResourceBreakdown> {
    let mut totals: BTreeMap<&Resource, ResourceBreakdown> = BTreeMap::new();
    for event in events {
        let entry = totals
            .entry(&event.resource)
            .or_insert_with(|| ResourceBreakdown {
                resource: event.resource.clone(),
                amount: 0,
                cost_usd: 0.0,
                event_count: 0,
            });
        entry.amount = entry.amount.saturating_add(event.amount);
        entry.cost_usd += event.cost_usd;
        entry.event_count += 1;
    }
    totals.into_values().collect()
}

/// Per-day, per-resource totals over `events`, oldest day first.
pub fn daily_totals(events: &[UsageEvent]) -> Vec<DailyUsage> {
    let mut totals: BTreeMap<(NaiveDate, &Resource), DailyUsage> = BTreeMap::new();
    for event in events {
        let date = event.recorded_at.date_naive();
        let entry = totals
            .entry((date, &event.resource))
            .or_insert_with(|| DailyUsage {
                date,
                resource: event.resource.clone(),
                amount: 0,
                cost_usd: 0.0,
                event_count: 0,
            });
        entry.amount = entry.amount.saturating_add(event.amount);
        entry.cost_usd += event.cost_usd;
        entry.event_count += 1;
    }
    totals.into_values().collect()
}
