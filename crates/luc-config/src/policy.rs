// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion from the `[policy]` section into a [`QuotaPolicy`].

use std::collections::BTreeMap;

use luc_core::{LucError, QuotaPolicy, Resource};

use crate::model::PolicyConfig;

impl PolicyConfig {
    /// Build and validate the quota policy described by this section.
    pub fn to_policy(&self) -> Result<QuotaPolicy, LucError> {
        let mut policy = QuotaPolicy::new(self.default_tier, self.max_discount)?;
        for (tier, table) in self.effective_tiers() {
            let mut limits = BTreeMap::new();
            for (name, limit) in &table.limits {
                let resource = Resource::parse(name)
                    .map_err(|e| LucError::Config(format!("policy.tiers.{tier}: {e}")))?;
                limits.insert(resource, *limit);
            }
            let cycle_days = table.cycle_days.unwrap_or(self.default_cycle_days);
            policy = policy.with_tier(tier, limits, cycle_days);
        }
        policy.validate()?;
        Ok(policy)
    }
}
