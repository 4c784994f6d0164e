// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the LUC configuration system.

use luc_config::diagnostic::ConfigError;
use luc_config::model::{GuardBackend, LucConfig, StorageBackend};
use luc_config::{load_and_validate_str, load_config_from_str};
use luc_core::{Resource, Tier};

/// Valid TOML with every section deserializes successfully.
#[test]
fn valid_toml_deserializes_into_luc_config() {
    let toml = r#"
[service]
name = "metering"
log_level = "debug"

[storage]
backend = "sqlite"
database_path = "/tmp/luc-test.db"
wal_mode = false

[policy]
default_tier = "pro"
max_discount = 0.25
default_cycle_days = 14

[policy.tiers.pro]
limits = { api_calls = 100, tokens = 5000 }

[policy.tiers.team]
limits = { api_calls = 0, tokens = 0 }
cycle_days = 28

[pricing]
quote_ttl_secs = 60

[pricing.models.small]
input_per_mtok = 1.0
output_per_mtok = 2.0

[[pricing.variants]]
name = "only"
planning = "small"
generation = "small"
verification = "small"

[guard]
backend = "sqlite"
max_requests = 5
window_secs = 10

[gateway]
host = "0.0.0.0"
port = 9000

[[gateway.callers]]
id = "billing-svc"
token = "t0k3n"
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should load");
    assert_eq!(config.service.name, "metering");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    assert_eq!(config.storage.database_path, "/tmp/luc-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.policy.default_tier, Tier::Pro);
    assert_eq!(config.pricing.quote_ttl_secs, 60);
    assert_eq!(config.pricing.effective_variants().len(), 1);
    assert_eq!(config.guard.backend, GuardBackend::Sqlite);
    assert_eq!(config.guard.max_requests, 5);
    assert_eq!(config.gateway.port, 9000);
    assert_eq!(config.gateway.callers[0].id, "billing-svc");

    let policy = config.policy.to_policy().unwrap();
    let tokens = Resource::parse("tokens").unwrap();
    assert_eq!(policy.limit(Tier::Pro, &tokens).unwrap(), 5000);
    assert_eq!(policy.cycle_length(Tier::Pro).unwrap().num_days(), 14);
    assert_eq!(policy.cycle_length(Tier::Team).unwrap().num_days(), 28);
    assert!(matches!(
        policy.limits_for(Tier::Free),
        Err(luc_core::LucError::UnknownTier(_))
    ));
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.service.name, "luc");
    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    assert!(config.storage.wal_mode);
    assert_eq!(config.policy.default_tier, Tier::Free);
    assert_eq!(config.policy.max_discount, 0.40);
    assert_eq!(config.policy.default_cycle_days, 30);
    assert_eq!(config.pricing.quote_ttl_secs, 900);
    assert_eq!(config.guard.backend, GuardBackend::Memory);
    assert_eq!(config.guard.max_requests, 1000);
    assert_eq!(config.guard.window_secs, 60);
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert!(config.gateway.callers.is_empty());
}

/// Unknown keys are rejected with a suggestion.
#[test]
fn unknown_key_produces_suggestion() {
    let toml = r#"
[guard]
max_reqests = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown key");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion, .. }
                if key == "max_reqests" && suggestion.as_deref() == Some("max_requests")
        )
    });
    assert!(found, "expected an UnknownKey error with suggestion, got {errors:?}");
}

/// An unknown tier name fails deserialization.
#[test]
fn unknown_tier_is_rejected() {
    let toml = r#"
[policy.tiers.platinum]
limits = { api_calls = 1 }
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Tiers metering different resources fail validation.
#[test]
fn inconsistent_tier_tables_fail_validation() {
    let toml = r#"
[policy.tiers.free]
limits = { api_calls = 10 }

[policy.tiers.pro]
limits = { tokens = 10 }
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("same resources"))
    ));
}

/// A default tier without a table fails validation.
#[test]
fn default_tier_must_be_configured() {
    let toml = r#"
[policy]
default_tier = "team"

[policy.tiers.free]
limits = { api_calls = 10 }
"#;
    assert!(load_and_validate_str(toml).is_err());
}

/// `LUC_*` variables override file values through the section mapping.
#[test]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "luc.toml",
            r#"
[storage]
database_path = "from-file.db"

[guard]
max_requests = 10
"#,
        )?;
        jail.set_env("LUC_STORAGE_DATABASE_PATH", "from-env.db");
        jail.set_env("LUC_GUARD_MAX_REQUESTS", "42");

        let config = luc_config::load_config().expect("config should load");
        assert_eq!(config.storage.database_path, "from-env.db");
        assert_eq!(config.guard.max_requests, 42);
        Ok(())
    });
}

/// Missing config files are silently skipped.
#[test]
fn missing_config_file_uses_defaults() {
    let config =
        luc_config::load_config_from_path(std::path::Path::new("/nonexistent/path/luc.toml"))
            .expect("missing file should be skipped");
    assert_eq!(config.service.name, "luc");
}

/// The defaults serialize back to TOML that loads again.
#[test]
fn effective_config_roundtrips_through_toml() {
    let config = LucConfig::default();
    let rendered = toml::to_string(&config).expect("defaults should serialize");
    let reloaded = load_and_validate_str(&rendered).expect("rendered config should load");
    assert_eq!(reloaded.guard.window_secs, config.guard.window_secs);
}
