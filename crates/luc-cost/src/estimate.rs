// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic cost estimation for one operation under one variant.

use luc_core::LucError;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::discount::{check_relevance, derive_relevance, discount_pct, discounted_tokens, Discount};
use crate::pricing::{PricingTable, Variant};

/// The stages an operation is priced in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Planning,
    Generation,
    Verification,
}

impl Component {
    pub const ALL: [Component; 3] = [
        Component::Planning,
        Component::Generation,
        Component::Verification,
    ];
}

/// Coarse size class used when no explicit token counts are given.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    /// Baseline (input, output) tokens for a component.
    fn profile(self, component: Component) -> (u64, u64) {
        match (self, component) {
            (Complexity::Low, Component::Planning) => (500, 200),
            (Complexity::Low, Component::Generation) => (1_000, 800),
            (Complexity::Low, Component::Verification) => (300, 100),
            (Complexity::Medium, Component::Planning) => (1_500, 500),
            (Complexity::Medium, Component::Generation) => (3_000, 2_500),
            (Complexity::Medium, Component::Verification) => (800, 300),
            (Complexity::High, Component::Planning) => (4_000, 1_500),
            (Complexity::High, Component::Generation) => (8_000, 6_000),
            (Complexity::High, Component::Verification) => (2_000, 800),
        }
    }
}

/// Caller-supplied token counts for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentTokens {
    #[serde(alias = "name")]
    pub component: Component,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The operation being priced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub description: String,
    #[serde(default)]
    pub complexity: Complexity,
    /// Explicit token counts; replaces the complexity profile when present.
    #[serde(default)]
    pub components: Option<Vec<ComponentTokens>>,
    /// Caller-supplied relevance in `[0, 1]`; derived from `prior_context` when absent.
    #[serde(default)]
    pub relevance: Option<f64>,
    #[serde(default)]
    pub prior_context: Vec<String>,
}

impl Operation {
    /// Token counts per component, before any discount.
    pub fn component_tokens(&self) -> Result<Vec<ComponentTokens>, LucError> {
        if let Some(components) = &self.components {
            if components.is_empty() {
                return Err(LucError::validation("components must not be empty"));
            }
            for (i, c) in components.iter().enumerate() {
                if components[..i].iter().any(|p| p.component == c.component) {
                    return Err(LucError::validation(format!(
                        "component `{}` is listed more than once",
                        c.component
                    )));
                }
            }
            return Ok(components.clone());
        }

        let description_tokens = self.description.chars().count().div_ceil(4) as u64;
        Ok(Component::ALL
            .iter()
            .map(|&component| {
                let (mut input_tokens, output_tokens) = self.complexity.profile(component);
                if component == Component::Planning {
                    input_tokens = input_tokens.saturating_add(description_tokens);
                }
                ComponentTokens {
                    component,
                    input_tokens,
                    output_tokens,
                }
            })
            .collect())
    }

    /// The relevance used for discounting.
    pub fn relevance(&self) -> Result<f64, LucError> {
        match self.relevance {
            Some(r) => check_relevance(r),
            None => Ok(derive_relevance(&self.description, &self.prior_context)),
        }
    }
}

/// Priced component after discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentCost {
    pub component: Component,
    pub model: String,
    pub tokens: u64,
    pub usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub total_usd: f64,
    pub total_tokens: u64,
    pub breakdown: Vec<ComponentCost>,
    pub discount: Discount,
}

/// Price `operation` under `variant`. Pure: identical inputs give identical output.
pub fn estimate(
    table: &PricingTable,
    variant: &Variant,
    operation: &Operation,
    max_discount: f64,
) -> Result<CostEstimate, LucError> {
    let relevance = operation.relevance()?;
    let pct = discount_pct(relevance, max_discount);

    let mut breakdown = Vec::new();
    let mut pre_tokens = 0u64;
    let mut pre_usd = 0.0;
    for tokens in operation.component_tokens()? {
        let model = variant.model_for(tokens.component);
        let rate = table.rate(model)?;
        let raw_tokens = tokens.input_tokens.saturating_add(tokens.output_tokens);
        let raw_usd = rate.cost(tokens.input_tokens, tokens.output_tokens);
        pre_tokens = pre_tokens.saturating_add(raw_tokens);
        pre_usd += raw_usd;
        breakdown.push(ComponentCost {
            component: tokens.component,
            model: model.to_string(),
            tokens: discounted_tokens(raw_tokens, pct),
            usd: raw_usd * (1.0 - pct),
        });
    }

    let total_tokens = breakdown
        .iter()
        .fold(0u64, |acc, c| acc.saturating_add(c.tokens));
    let total_usd: f64 = breakdown.iter().map(|c| c.usd).sum();
    Ok(CostEstimate {
        total_usd,
        total_tokens,
        breakdown,
        discount: Discount {
            applied: pct > 0.0,
            relevance,
            discount_pct: pct,
            tokens_saved: pre_tokens.saturating_sub(total_tokens),
            savings_usd: pre_usd - total_usd,
            pre_savings_tokens: pre_tokens,
            post_savings_tokens: total_tokens,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use luc_config::model::PricingConfig;

    fn table() -> PricingTable {
        PricingTable::from_config(&PricingConfig::default()).unwrap()
    }

    fn generation_only(tokens: u64, relevance: f64) -> Operation {
        Operation {
            description: "write tests".into(),
            components: Some(vec![ComponentTokens {
                component: Component::Generation,
                input_tokens: tokens,
                output_tokens: 0,
            }]),
            relevance: Some(relevance),
            ..Operation::default()
        }
    }

    #[test]
    fn half_relevance_saves_a_fifth() {
        let table = table();
        let variant = table.variant("balanced").unwrap();
        let est = estimate(&table, variant, &generation_only(1000, 0.5), 0.40).unwrap();
        assert!((est.discount.discount_pct - 0.20).abs() < 1e-12);
        assert_eq!(est.discount.pre_savings_tokens, 1000);
        assert_eq!(est.discount.post_savings_tokens, 800);
        assert_eq!(est.discount.tokens_saved, 200);
        assert!(est.discount.applied);
        assert_eq!(est.total_tokens, 800);
        // sonnet input: 1000/1M * 3.0 = 0.003, discounted by 20%.
        assert!((est.total_usd - 0.0024).abs() < 1e-12);
        assert!((est.discount.savings_usd - 0.0006).abs() < 1e-12);
    }

    #[test]
    fn zero_relevance_applies_no_discount() {
        let table = table();
        let variant = table.variant("economy").unwrap();
        let est = estimate(&table, variant, &generation_only(1000, 0.0), 0.40).unwrap();
        assert!(!est.discount.applied);
        assert_eq!(est.total_tokens, 1000);
        assert_eq!(est.discount.tokens_saved, 0);
    }

    #[test]
    fn complexity_profile_adds_description_tokens_to_planning() {
        let op = Operation {
            description: "x".repeat(10),
            complexity: Complexity::Low,
            ..Operation::default()
        };
        let tokens = op.component_tokens().unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].component, Component::Planning);
        assert_eq!(tokens[0].input_tokens, 500 + 3);
        assert_eq!(tokens[1].input_tokens, 1_000);
    }

    #[test]
    fn estimates_are_deterministic() {
        let table = table();
        let variant = table.variant("premium").unwrap();
        let op = Operation {
            description: "summarize quarterly report".into(),
            complexity: Complexity::High,
            prior_context: vec!["summarize monthly report".into()],
            ..Operation::default()
        };
        let a = estimate(&table, variant, &op, 0.40).unwrap();
        let b = estimate(&table, variant, &op, 0.40).unwrap();
        assert_eq!(a, b);
        assert!(a.discount.relevance > 0.0);
    }

    #[test]
    fn duplicate_components_are_rejected() {
        let op = Operation {
            components: Some(vec![
                ComponentTokens {
                    component: Component::Planning,
                    input_tokens: 1,
                    output_tokens: 1,
                },
                ComponentTokens {
                    component: Component::Planning,
                    input_tokens: 1,
                    output_tokens: 1,
                },
            ]),
            ..Operation::default()
        };
        assert!(matches!(op.component_tokens(), Err(LucError::Validation(_))));
    }

    #[test]
    fn out_of_range_relevance_is_rejected() {
        let table = table();
        let variant = table.variant("balanced").unwrap();
        let err = estimate(&table, variant, &generation_only(10, 1.2), 0.40).unwrap_err();
        assert!(matches!(err, LucError::Validation(_)));
    }
    fn two_components(planning: u64, generation: u64, relevance: f64) -> Operation {
        Operation {
            description: "migrate the schema".into(),
            components: Some(vec![
                ComponentTokens {
                    component: Component::Planning,
                    input_tokens: planning,
                    output_tokens: 0,
                },
                ComponentTokens {
                    component: Component::Generation,
                    input_tokens: generation,
                    output_tokens: 0,
                },
            ]),
            relevance: Some(relevance),
            ..Operation::default()
        }
    }

    #[test]
    fn token_counts_beyond_f64_precision_are_not_inflated() {
        let table = table();
        let variant = table.variant("balanced").unwrap();
        let tokens = (1u64 << 53) + 3;
        let est = estimate(&table, variant, &generation_only(tokens, 0.0), 0.40).unwrap();
        assert_eq!(est.total_tokens, tokens);
        assert_eq!(est.discount.pre_savings_tokens, tokens);
        assert_eq!(est.discount.tokens_saved, 0);
    }

    #[test]
    fn component_totals_saturate_instead_of_overflowing() {
        let table = table();
        let variant = table.variant("balanced").unwrap();
        let half = u64::MAX / 2 + 1;
        let est = estimate(&table, variant, &two_components(half, half, 0.0), 0.40).unwrap();
        assert_eq!(est.total_tokens, u64::MAX);
        assert_eq!(est.discount.pre_savings_tokens, u64::MAX);
        assert_eq!(est.discount.tokens_saved, 0);
    }

    proptest::proptest! {
        #[test]
        fn post_savings_never_exceed_pre_savings(
            planning in proptest::prelude::any::<u64>(),
            generation in proptest::prelude::any::<u64>(),
            relevance in 0.0f64..=1.0,
        ) {
            let table = table();
            let variant = table.variant("balanced").unwrap();
            let est = estimate(&table, variant, &two_components(planning, generation, relevance), 0.40)
                .unwrap();
            proptest::prop_assert!(est.discount.post_savings_tokens <= est.discount.pre_savings_tokens);
            proptest::prop_assert_eq!(
                est.discount.tokens_saved,
                est.discount.pre_savings_tokens - est.discount.post_savings_tokens
            );
        }
    }
}
