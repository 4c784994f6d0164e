// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time-boxed, advisory multi-variant quotes.

use chrono::{DateTime, Duration, Utc};
use luc_core::LucError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::estimate::{estimate, CostEstimate, Operation};
use crate::pricing::PricingTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantQuote {
    pub name: String,
    pub estimate: CostEstimate,
}

/// A set of estimates for one operation. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: String,
    pub valid_for_seconds: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Requested variants in order; the first is the primary recommendation.
    pub variants: Vec<VariantQuote>,
}

impl Quote {
    pub fn primary(&self) -> Option<&VariantQuote> {
        self.variants.first()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Price `operation` under each requested variant, or every configured
/// variant when `variants` is `None` or empty.
pub fn build_quote(
    table: &PricingTable,
    operation: &Operation,
    variants: Option<&[String]>,
    max_discount: f64,
    ttl_secs: u64,
    now: DateTime<Utc>,
) -> Result<Quote, LucError> {
    let selected = match variants {
        Some(names) if !names.is_empty() => names
            .iter()
            .map(|name| table.variant(name))
            .collect::<Result<Vec<_>, _>>()?,
        _ => table.variants().iter().collect(),
    };

    let variants = selected
        .into_iter()
        .map(|variant| {
            Ok(VariantQuote {
                name: variant.name.clone(),
                estimate: estimate(table, variant, operation, max_discount)?,
            })
        })
        .collect::<Result<Vec<_>, LucError>>()?;

    if variants.is_empty() {
        return Err(LucError::Internal("quote produced no variants".into()));
    }

    let expires_at = i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| LucError::Config(format!("quote ttl {ttl_secs}s is too large")))?;
    Ok(Quote {
        quote_id: Uuid::new_v4().to_string(),
        valid_for_seconds: ttl_secs,
        created_at: now,
        expires_at,
        variants,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use luc_config::model::PricingConfig;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn table() -> PricingTable {
        PricingTable::from_config(&PricingConfig::default()).unwrap()
    }

    fn op() -> Operation {
        Operation {
            description: "draft a release note".into(),
            ..Operation::default()
        }
    }

    #[test]
    fn default_quote_covers_every_variant_in_order() {
        let quote = build_quote(&table(), &op(), None, 0.40, 900, now()).unwrap();
        let names: Vec<_> = quote.variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["balanced", "economy", "premium"]);
        assert_eq!(quote.primary().unwrap().name, "balanced");
        assert_eq!(quote.valid_for_seconds, 900);
        assert_eq!(quote.expires_at - quote.created_at, Duration::seconds(900));
        assert!(!quote.is_expired(now()));
        assert!(quote.is_expired(now() + Duration::seconds(900)));
    }

    #[test]
    fn requested_variants_keep_request_order() {
        let names = vec!["premium".to_string(), "economy".to_string()];
        let quote = build_quote(&table(), &op(), Some(&names), 0.40, 60, now()).unwrap();
        assert_eq!(quote.primary().unwrap().name, "premium");
        assert_eq!(quote.variants.len(), 2);
        assert!(quote.variants[0].estimate.total_usd > quote.variants[1].estimate.total_usd);
    }

    #[test]
    fn unknown_variant_fails_the_whole_quote() {
        let names = vec!["economy".to_string(), "turbo".to_string()];
        let err = build_quote(&table(), &op(), Some(&names), 0.40, 60, now()).unwrap_err();
        assert!(matches!(err, LucError::Validation(_)));
    }

    #[test]
    fn quote_serializes_to_json() {
        let quote = build_quote(&table(), &op(), None, 0.40, 900, now()).unwrap();
        let json = serde_json::to_value(&quote).unwrap();
        assert!(json["created_at"].as_str().unwrap().starts_with("2026-03-01T12:00:00"));
        assert_eq!(json["variants"][0]["estimate"]["breakdown"][0]["component"], "planning");
    }
}
