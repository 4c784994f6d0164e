// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the LUC metering engine.

use thiserror::Error;

/// The primary error type used across all LUC adapter traits and core operations.
///
/// Quota exhaustion is deliberately absent: a denied admission is a normal
/// result carried as data, never an error.
#[derive(Debug, Error)]
pub enum LucError {
    /// Malformed or missing request fields, rejected before touching the ledger.
    #[error("validation error: {0}")]
    Validation(String),

    /// No caller identity could be established for the request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The ledger has no account for the workspace (`ensure_account` was skipped).
    #[error("account not found for workspace `{workspace_id}`")]
    AccountNotFound { workspace_id: String },

    /// The quota policy has no table for the requested tier.
    #[error("unknown tier `{0}`")]
    UnknownTier(String),

    /// Ledger I/O failure (database connection, query failure, serialization).
    #[error("storage unavailable: {source}")]
    StorageUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The admission guard rejected the caller.
    #[error("rate limit exceeded for caller `{caller_id}`")]
    RateLimited { caller_id: String },

    /// A looked-up record (settlement, etc.) does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration errors (invalid TOML, inconsistent policy tables).
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LucError {
    /// Stable wire code for this error, used by transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            Self::UnknownTier(_) => "UNKNOWN_TIER",
            Self::StorageUnavailable { .. } => "ACCOUNT_ERROR",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap any storage-layer error.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::StorageUnavailable {
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_contract() {
        assert_eq!(LucError::validation("x").code(), "VALIDATION_ERROR");
        assert_eq!(
            LucError::storage(std::io::Error::other("down")).code(),
            "ACCOUNT_ERROR"
        );
        assert_eq!(
            LucError::RateLimited {
                caller_id: "c".into()
            }
            .code(),
            "RATE_LIMITED"
        );
    }

    #[test]
    fn storage_error_displays_source() {
        let err = LucError::storage(std::io::Error::other("disk gone"));
        assert!(err.to_string().contains("disk gone"));
    }
}
