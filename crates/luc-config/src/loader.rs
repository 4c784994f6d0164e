// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./luc.toml` > `~/.config/luc/luc.toml` > `/etc/luc/luc.toml`
//! with environment variable overrides via `LUC_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::LucConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/luc/luc.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "luc.toml";

/// Top-level sections that environment variables may target.
const ENV_SECTIONS: &[&str] = &["service", "storage", "policy", "pricing", "guard", "gateway"];

/// Path of the per-user configuration file, if a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("luc").join("luc.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/luc/luc.toml` (system-wide)
/// 3. `~/.config/luc/luc.toml` (user XDG config)
/// 4. `./luc.toml` (local directory)
/// 5. `LUC_*` environment variables
pub fn load_config() -> Result<LucConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the compiled defaults.
///
/// Used for testing and explicit configuration. No files or env vars are read.
pub fn load_config_from_str(toml_content: &str) -> Result<LucConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LucConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<LucConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LucConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LucConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Map `LUC_<SECTION>_<KEY>` onto `<section>.<key>`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `LUC_STORAGE_DATABASE_PATH` maps to `storage.database_path`.
fn env_provider() -> Env {
    Env::prefixed("LUC_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("guard_max_requests"), "guard.max_requests");
        assert_eq!(map_env_key("pricing_quote_ttl_secs"), "pricing.quote_ttl_secs");
        assert_eq!(map_env_key("GATEWAY_PORT"), "gateway.port");
        assert_eq!(map_env_key("unrelated_key"), "unrelated_key");
    }
}
