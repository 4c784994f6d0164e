// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the LUC metering engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use luc_core::Tier;
use serde::{Deserialize, Serialize};

/// Top-level LUC configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LucConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Ledger backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Quota tiers and discount ceiling.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Model rates and cost variants.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Per-caller admission guard.
    #[serde(default)]
    pub guard: GuardConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name reported by the health endpoint.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "luc".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which ledger implementation backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Durable SQLite ledger.
    #[default]
    Sqlite,
    /// Process-local ledger; state is lost on restart.
    Memory,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("luc").join("luc.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("luc.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Quota policy configuration.
///
/// An empty `tiers` table selects the built-in tier set returned by
/// [`PolicyConfig::effective_tiers`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Tier assigned to accounts on creation.
    #[serde(default = "default_tier")]
    pub default_tier: Tier,

    /// Discount ceiling for the cost model (at most 0.40).
    #[serde(default = "default_max_discount")]
    pub max_discount: f64,

    /// Cycle length for tiers that do not set `cycle_days`.
    #[serde(default = "default_cycle_days")]
    pub default_cycle_days: u32,

    #[serde(default)]
    pub tiers: BTreeMap<Tier, TierConfig>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            default_tier: default_tier(),
            max_discount: default_max_discount(),
            default_cycle_days: default_cycle_days(),
            tiers: BTreeMap::new(),
        }
    }
}

impl PolicyConfig {
    /// Configured tiers, or the built-in set when none are configured.
    pub fn effective_tiers(&self) -> BTreeMap<Tier, TierConfig> {
        if self.tiers.is_empty() {
            builtin_tiers()
        } else {
            self.tiers.clone()
        }
    }
}

fn default_tier() -> Tier {
    Tier::Free
}

fn default_max_discount() -> f64 {
    luc_core::MAX_DISCOUNT_CAP
}

fn default_cycle_days() -> u32 {
    luc_core::DEFAULT_CYCLE_DAYS
}

/// Limits for one tier. A limit of zero leaves the resource unmetered.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    pub limits: BTreeMap<String, u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_days: Option<u32>,
}

fn tier_table(api_calls: u64, tokens: u64, tasks: u64) -> TierConfig {
    TierConfig {
        limits: BTreeMap::from([
            ("api_calls".to_string(), api_calls),
            ("tokens".to_string(), tokens),
            ("tasks".to_string(), tasks),
        ]),
        cycle_days: None,
    }
}

/// The tier set used when `[policy.tiers]` is absent.
pub fn builtin_tiers() -> BTreeMap<Tier, TierConfig> {
    BTreeMap::from([
        (Tier::Free, tier_table(50, 100_000, 10)),
        (Tier::Pro, tier_table(1_000, 2_000_000, 200)),
        (Tier::Team, tier_table(5_000, 10_000_000, 1_000)),
        (Tier::Enterprise, tier_table(0, 0, 0)),
    ])
}

/// Pricing configuration for the cost model.
///
/// Empty `models` or `variants` select the built-in tables.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// Per-model rates in USD per million tokens.
    #[serde(default)]
    pub models: BTreeMap<String, ModelRateConfig>,

    /// Cost variants, in recommendation order.
    #[serde(default)]
    pub variants: Vec<VariantConfig>,

    /// Lifetime of a quote in seconds.
    #[serde(default = "default_quote_ttl_secs")]
    pub quote_ttl_secs: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            models: BTreeMap::new(),
            variants: Vec::new(),
            quote_ttl_secs: default_quote_ttl_secs(),
        }
    }
}

impl PricingConfig {
    pub fn effective_models(&self) -> BTreeMap<String, ModelRateConfig> {
        if self.models.is_empty() {
            builtin_models()
        } else {
            self.models.clone()
        }
    }

    pub fn effective_variants(&self) -> Vec<VariantConfig> {
        if self.variants.is_empty() {
            builtin_variants()
        } else {
            self.variants.clone()
        }
    }
}

fn default_quote_ttl_secs() -> u64 {
    900
}

/// Rates for one model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelRateConfig {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

/// A named assignment of models to the planning, generation and
/// verification components.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VariantConfig {
    pub name: String,
    pub planning: String,
    pub generation: String,
    pub verification: String,
}

/// Model rates used when `[pricing.models]` is absent.
pub fn builtin_models() -> BTreeMap<String, ModelRateConfig> {
    let rate = |input_per_mtok, output_per_mtok| ModelRateConfig {
        input_per_mtok,
        output_per_mtok,
    };
    BTreeMap::from([
        ("haiku".to_string(), rate(0.80, 4.0)),
        ("sonnet".to_string(), rate(3.0, 15.0)),
        ("opus".to_string(), rate(15.0, 75.0)),
    ])
}

/// Variants used when `[[pricing.variants]]` is absent.
pub fn builtin_variants() -> Vec<VariantConfig> {
    let variant = |name: &str, planning: &str, generation: &str, verification: &str| VariantConfig {
        name: name.to_string(),
        planning: planning.to_string(),
        generation: generation.to_string(),
        verification: verification.to_string(),
    };
    vec![
        variant("balanced", "sonnet", "sonnet", "haiku"),
        variant("economy", "haiku", "haiku", "haiku"),
        variant("premium", "opus", "opus", "sonnet"),
    ]
}

/// Which admission guard implementation is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardBackend {
    /// Per-process sliding-window log.
    #[default]
    Memory,
    /// Shared counters in the SQLite database.
    Sqlite,
}

/// Admission guard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    #[serde(default)]
    pub backend: GuardBackend,

    /// Requests allowed per caller within one window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            backend: GuardBackend::default(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_max_requests() -> u32 {
    1000
}

fn default_window_secs() -> u64 {
    60
}

/// HTTP gateway configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer tokens accepted by the gateway. No callers means every
    /// request is rejected.
    #[serde(default)]
    pub callers: Vec<CallerConfig>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("callers", &self.callers.len())
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            callers: Vec::new(),
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8640
}

/// One authenticated caller.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CallerConfig {
    pub id: String,
    pub token: String,
}

impl std::fmt::Debug for CallerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallerConfig")
            .field("id", &self.id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tiers_share_resource_set() {
        let tiers = builtin_tiers();
        let free: Vec<_> = tiers[&Tier::Free].limits.keys().collect();
        for table in tiers.values() {
            assert_eq!(table.limits.keys().collect::<Vec<_>>(), free);
        }
        assert_eq!(tiers[&Tier::Free].limits["api_calls"], 50);
    }

    #[test]
    fn tiers_deserialize_from_snake_case_keys() {
        let config: LucConfig = toml::from_str(
            r#"
[policy.tiers.pro]
limits = { api_calls = 10 }
cycle_days = 7
"#,
        )
        .unwrap();
        let pro = &config.policy.tiers[&Tier::Pro];
        assert_eq!(pro.limits["api_calls"], 10);
        assert_eq!(pro.cycle_days, Some(7));
    }

    #[test]
    fn configured_tiers_replace_builtin_set() {
        let mut config = PolicyConfig::default();
        assert_eq!(config.effective_tiers().len(), 4);
        config.tiers.insert(Tier::Free, tier_table(1, 1, 1));
        assert_eq!(config.effective_tiers().len(), 1);
    }

    #[test]
    fn caller_token_is_redacted_in_debug() {
        let caller = CallerConfig {
            id: "svc".into(),
            token: "super-secret".into(),
        };
        let debug = format!("{caller:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let result = toml::from_str::<LucConfig>("[storage]\nbackend = \"postgres\"\n");
        assert!(result.is_err());
    }
}
