// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as consistent tier tables, pricing references and caller tokens.

use std::collections::HashSet;

use luc_core::{CallerId, MAX_DISCOUNT_CAP};

use crate::diagnostic::ConfigError;
use crate::model::{LucConfig, StorageBackend};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Longest validity a quote may be given.
pub const MAX_QUOTE_TTL_SECS: u64 = 86_400;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LucConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of: {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        fail("storage.database_path must not be empty".to_string());
    }

    // Policy
    if !(0.0..=MAX_DISCOUNT_CAP).contains(&config.policy.max_discount) {
        fail(format!(
            "policy.max_discount must be within [0, {MAX_DISCOUNT_CAP}], got {}",
            config.policy.max_discount
        ));
    } else if let Err(e) = config.policy.to_policy() {
        fail(format!("policy: {e}"));
    }

    // Pricing
    let models = config.pricing.effective_models();
    for (name, rate) in &models {
        let valid = |r: f64| r.is_finite() && r >= 0.0;
        if !valid(rate.input_per_mtok) || !valid(rate.output_per_mtok) {
            fail(format!("pricing.models.{name} rates must be finite and non-negative"));
        }
    }
    let mut seen_variants = HashSet::new();
    for (i, variant) in config.pricing.effective_variants().iter().enumerate() {
        if variant.name.trim().is_empty() {
            fail(format!("pricing.variants[{i}].name must not be empty"));
        }
        if !seen_variants.insert(variant.name.clone()) {
            fail(format!(
                "duplicate variant name `{}` in [[pricing.variants]]",
                variant.name
            ));
        }
        for model in [&variant.planning, &variant.generation, &variant.verification] {
            if !models.contains_key(model) {
                fail(format!(
                    "pricing.variants[{i}] (`{}`) references unknown model `{model}`",
                    variant.name
                ));
            }
        }
    }
    if !(1..=MAX_QUOTE_TTL_SECS).contains(&config.pricing.quote_ttl_secs) {
        fail(format!(
            "pricing.quote_ttl_secs must be within 1..={MAX_QUOTE_TTL_SECS}, got {}",
            config.pricing.quote_ttl_secs
        ));
    }

    // Guard
    if config.guard.max_requests == 0 {
        fail("guard.max_requests must be at least 1".to_string());
    }
    if config.guard.window_secs == 0 {
        fail("guard.window_secs must be at least 1".to_string());
    }

    // Gateway
    let host = config.gateway.host.trim();
    let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
    let is_valid_hostname = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
    if !is_valid_ip && !is_valid_hostname {
        fail(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        ));
    }
    let mut seen_ids = HashSet::new();
    let mut seen_tokens = HashSet::new();
    for (i, caller) in config.gateway.callers.iter().enumerate() {
        if let Err(e) = CallerId::parse(&caller.id) {
            fail(format!("gateway.callers[{i}].id: {e}"));
        }
        if caller.token.trim().is_empty() {
            fail(format!("gateway.callers[{i}].token must not be empty"));
        }
        if !seen_ids.insert(caller.id.as_str()) {
            fail(format!("duplicate caller id `{}` in [[gateway.callers]]", caller.id));
        }
        if !seen_tokens.insert(caller.token.as_str()) {
            fail(format!("gateway.callers[{i}] reuses another caller's token"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
