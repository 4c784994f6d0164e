// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost model for the LUC metering engine.
//!
//! This crate provides:
//! - **Pricing**: per-model rates and named cost variants
//! - **Estimate**: deterministic per-component cost of one operation
//! - **Discount**: relevance-based token savings, bounded by policy
//! - **Quote**: every requested variant priced at once, with an expiry

pub mod discount;
pub mod estimate;
pub mod pricing;
pub mod quote;

use chrono::{DateTime, Utc};
use luc_config::model::PricingConfig;
use luc_core::LucError;
use tracing::debug;

pub use discount::Discount;
pub use estimate::{Complexity, Component, ComponentCost, ComponentTokens, CostEstimate, Operation};
pub use pricing::{ModelRate, PricingTable, Variant};
pub use quote::{Quote, VariantQuote};

/// Pricing table plus quote lifetime. Holds no mutable state.
#[derive(Debug, Clone)]
pub struct CostModel {
    table: PricingTable,
    quote_ttl_secs: u64,
}

impl CostModel {
    pub fn new(table: PricingTable, quote_ttl_secs: u64) -> Self {
        Self {
            table,
            quote_ttl_secs,
        }
    }

    pub fn from_config(config: &PricingConfig) -> Result<Self, LucError> {
        let table = PricingTable::from_config(config)?;
        debug!(
            variants = ?table.variant_names(),
            quote_ttl_secs = config.quote_ttl_secs,
            "cost model loaded"
        );
        Ok(Self::new(table, config.quote_ttl_secs))
    }

    pub fn table(&self) -> &PricingTable {
        &self.table
    }

    /// Estimate `operation` under the named variant.
    pub fn estimate(
        &self,
        operation: &Operation,
        variant: &str,
        max_discount: f64,
    ) -> Result<CostEstimate, LucError> {
        let variant = self.table.variant(variant)?;
        estimate::estimate(&self.table, variant, operation, max_discount)
    }

    pub fn quote(
        &self,
        operation: &Operation,
        variants: Option<&[String]>,
        max_discount: f64,
        now: DateTime<Utc>,
    ) -> Result<Quote, LucError> {
        quote::build_quote(
            &self.table,
            operation,
            variants,
            max_discount,
            self.quote_ttl_secs,
            now,
        )
    }
}
