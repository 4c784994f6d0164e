// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota policy: per-tier resource limits, billing-cycle length and the
//! discount ceiling used by the cost model.
//!
//! The policy is immutable after construction and holds no state. The
//! configuration crate builds it from the `[policy]` section.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};

use crate::error::LucError;
use crate::types::{QuotaUsage, Resource, Tier};

/// Hard ceiling for any configured discount fraction.
pub const MAX_DISCOUNT_CAP: f64 = 0.40;

/// Billing-cycle length used when a tier does not override it.
pub const DEFAULT_CYCLE_DAYS: u32 = 30;

/// Longest billing cycle a tier may configure.
pub const MAX_CYCLE_DAYS: u32 = 3_660;

/// Limits and cycle length for a single tier.
#[derive(Debug, Clone, PartialEq)]
pub struct TierPolicy {
    pub limits: BTreeMap<Resource, u64>,
    pub cycle_days: u32,
}

/// Mapping of tier → resource → limit, plus the discount ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaPolicy {
    tiers: BTreeMap<Tier, TierPolicy>,
    default_tier: Tier,
    max_discount: f64,
}

impl QuotaPolicy {
    /// Create an empty policy. Tiers are added with [`QuotaPolicy::with_tier`].
    pub fn new(default_tier: Tier, max_discount: f64) -> Result<Self, LucError> {
        if !(0.0..=MAX_DISCOUNT_CAP).contains(&max_discount) {
            return Err(LucError::Config(format!(
                "max_discount must be within [0, {MAX_DISCOUNT_CAP}], got {max_discount}"
            )));
        }
        Ok(Self {
            tiers: BTreeMap::new(),
            default_tier,
            max_discount,
        })
    }

    /// Add or replace a tier table.
    pub fn with_tier(mut self, tier: Tier, limits: BTreeMap<Resource, u64>, cycle_days: u32) -> Self {
        self.tiers.insert(tier, TierPolicy { limits, cycle_days });
        self
    }

    /// Check cross-tier consistency: the default tier exists and every tier
    /// meters the same resource set with a bounded cycle length.
    pub fn validate(&self) -> Result<(), LucError> {
        let default = self.tier(self.default_tier)?;
        let expected: BTreeSet<&Resource> = default.limits.keys().collect();
        if expected.is_empty() {
            return Err(LucError::Config(format!(
                "default tier `{}` meters no resources",
                self.default_tier
            )));
        }
        for (tier, table) in &self.tiers {
            if !(1..=MAX_CYCLE_DAYS).contains(&table.cycle_days) {
                return Err(LucError::Config(format!(
                    "tier `{tier}` cycle length must be within 1..={MAX_CYCLE_DAYS} days, got {}",
                    table.cycle_days
                )));
            }
            let actual: BTreeSet<&Resource> = table.limits.keys().collect();
            if actual != expected {
                return Err(LucError::Config(format!(
                    "tier `{tier}` must meter the same resources as the default tier `{}`",
                    self.default_tier
                )));
            }
        }
        Ok(())
    }

    fn tier(&self, tier: Tier) -> Result<&TierPolicy, LucError> {
        self.tiers
            .get(&tier)
            .ok_or_else(|| LucError::UnknownTier(tier.to_string()))
    }

    /// Resource limits for a tier.
    pub fn limits_for(&self, tier: Tier) -> Result<&BTreeMap<Resource, u64>, LucError> {
        Ok(&self.tier(tier)?.limits)
    }

    /// Limit for one resource in a tier; unknown resources are a validation error.
    pub fn limit(&self, tier: Tier, resource: &Resource) -> Result<u64, LucError> {
        self.limits_for(tier)?
            .get(resource)
            .copied()
            .ok_or_else(|| LucError::validation(format!("resource `{resource}` is not metered")))
    }

    /// Length of one billing cycle for a tier.
    pub fn cycle_length(&self, tier: Tier) -> Result<Duration, LucError> {
        Ok(Duration::days(i64::from(self.tier(tier)?.cycle_days)))
    }

    pub fn max_discount(&self) -> f64 {
        self.max_discount
    }

    pub fn default_tier(&self) -> Tier {
        self.default_tier
    }

    /// Tiers with a configured table.
    pub fn tiers(&self) -> impl Iterator<Item = Tier> + '_ {
        self.tiers.keys().copied()
    }

    /// The metered resource set (identical across tiers once validated).
    pub fn resources(&self) -> BTreeSet<Resource> {
        self.tiers
            .get(&self.default_tier)
            .map(|t| t.limits.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_known_resource(&self, resource: &Resource) -> bool {
        self.tiers
            .get(&self.default_tier)
            .is_some_and(|t| t.limits.contains_key(resource))
    }

    /// Join per-resource usage with the tier's limits. Every metered resource
    /// appears in the result, zero-filled when unused.
    pub fn quotas_for(
        &self,
        tier: Tier,
        used: &BTreeMap<Resource, u64>,
    ) -> Result<BTreeMap<Resource, QuotaUsage>, LucError> {
        let limits = self.limits_for(tier)?;
        let mut quotas: BTreeMap<Resource, QuotaUsage> = limits
            .iter()
            .map(|(resource, limit)| {
                let used = used.get(resource).copied().unwrap_or(0);
                (resource.clone(), QuotaUsage::new(used, *limit))
            })
            .collect();
        // Usage recorded against a resource the tier no longer lists stays visible.
        for (resource, amount) in used {
            quotas
                .entry(resource.clone())
                .or_insert(QuotaUsage::new(*amount, 0));
        }
        Ok(quotas)
    }
}

/// The billing window that follows a cycle ending at `previous_end` and
/// contains `now`.
///
/// Idle accounts skip whole cycles, so the result is always aligned to
/// `previous_end + k * length` for some `k >= 0`.
pub fn cycle_window(
    previous_end: DateTime<Utc>,
    length: Duration,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let step = length.num_milliseconds().max(1);
    let elapsed = (now - previous_end).num_milliseconds().max(0);
    let start = previous_end + Duration::milliseconds(elapsed / step * step);
    (start, start + length)
}
