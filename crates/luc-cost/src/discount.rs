// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relevance scoring and the bounded discount derived from it.

use std::collections::BTreeSet;

use luc_core::LucError;
use serde::{Deserialize, Serialize};

/// Summary of the discount applied to an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub applied: bool,
    pub relevance: f64,
    pub discount_pct: f64,
    pub tokens_saved: u64,
    pub savings_usd: f64,
    pub pre_savings_tokens: u64,
    pub post_savings_tokens: u64,
}

/// `min(relevance * max_discount, max_discount)`.
pub fn discount_pct(relevance: f64, max_discount: f64) -> f64 {
    (relevance * max_discount).clamp(0.0, max_discount)
}

/// Reject relevance scores outside `[0, 1]`, including NaN.
pub fn check_relevance(relevance: f64) -> Result<f64, LucError> {
    if (0.0..=1.0).contains(&relevance) {
        Ok(relevance)
    } else {
        Err(LucError::validation(format!(
            "relevance must be within [0, 1], got {relevance}"
        )))
    }
}

fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard similarity of the lowercase word sets of `a` and `b`.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a = words(a);
    let b = words(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Highest similarity between `description` and any prior context entry.
pub fn derive_relevance(description: &str, prior_context: &[String]) -> f64 {
    prior_context
        .iter()
        .map(|prior| jaccard(description, prior))
        .fold(0.0, f64::max)
}

/// Resolution of the kept fraction in [`discounted_tokens`].
const KEEP_SCALE: u128 = 1_000_000;

/// Scale a token count by `(1 - pct)`, rounded to the nearest token.
///
/// Integer arithmetic keeps counts above 2^53 exact; the result never
/// exceeds `tokens`.
pub fn discounted_tokens(tokens: u64, pct: f64) -> u64 {
    let keep = ((1.0 - pct.clamp(0.0, 1.0)) * KEEP_SCALE as f64).round() as u128;
    let kept = (u128::from(tokens) * keep.min(KEEP_SCALE) + KEEP_SCALE / 2) / KEEP_SCALE;
    u64::try_from(kept).map_or(tokens, |kept| kept.min(tokens))
}
