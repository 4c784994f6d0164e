// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model rate tables and cost variants.

use std::collections::BTreeMap;

use luc_config::model::PricingConfig;
use luc_core::LucError;

use crate::estimate::Component;

/// Per-model pricing in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRate {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

impl ModelRate {
    /// Cost of a token mix: `tokens / 1e6 * rate` for input and output.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let input = (input_tokens as f64 / 1_000_000.0) * self.input_per_mtok;
        let output = (output_tokens as f64 / 1_000_000.0) * self.output_per_mtok;
        input + output
    }
}

/// A named assignment of one model per component.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    pub planning: String,
    pub generation: String,
    pub verification: String,
}

impl Variant {
    pub fn model_for(&self, component: Component) -> &str {
        match component {
            Component::Planning => &self.planning,
            Component::Generation => &self.generation,
            Component::Verification => &self.verification,
        }
    }
}

/// Rates and variants, with every variant referencing a known model.
#[derive(Debug, Clone)]
pub struct PricingTable {
    models: BTreeMap<String, ModelRate>,
    variants: Vec<Variant>,
}

impl PricingTable {
    pub fn new(models: BTreeMap<String, ModelRate>, variants: Vec<Variant>) -> Result<Self, LucError> {
        if variants.is_empty() {
            return Err(LucError::Config("at least one cost variant is required".into()));
        }
        for variant in &variants {
            for component in Component::ALL {
                let model = variant.model_for(component);
                if !models.contains_key(model) {
                    return Err(LucError::Config(format!(
                        "variant `{}` uses unknown model `{model}`",
                        variant.name
                    )));
                }
            }
        }
        Ok(Self { models, variants })
    }

    pub fn from_config(config: &PricingConfig) -> Result<Self, LucError> {
        let models = config
            .effective_models()
            .into_iter()
            .map(|(name, rate)| {
                (
                    name,
                    ModelRate {
                        input_per_mtok: rate.input_per_mtok,
                        output_per_mtok: rate.output_per_mtok,
                    },
                )
            })
            .collect();
        let variants = config
            .effective_variants()
            .into_iter()
            .map(|v| Variant {
                name: v.name,
                planning: v.planning,
                generation: v.generation,
                verification: v.verification,
            })
            .collect();
        Self::new(models, variants)
    }

    pub fn rate(&self, model: &str) -> Result<ModelRate, LucError> {
        self.models
            .get(model)
            .copied()
            .ok_or_else(|| LucError::Internal(format!("no rate for model `{model}`")))
    }

    /// Look up a variant by name; unknown names are a validation error.
    pub fn variant(&self, name: &str) -> Result<&Variant, LucError> {
        self.variants
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| {
                LucError::validation(format!(
                    "unknown variant `{name}`; expected one of: {}",
                    self.variant_names().join(", ")
                ))
            })
    }

    /// Variants in configured order. The first is the primary recommendation.
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn variant_names(&self) -> Vec<&str> {
        self.variants.iter().map(|v| v.name.as_str()).collect()
    }
}
