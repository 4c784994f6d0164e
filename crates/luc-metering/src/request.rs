// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request DTOs and the validated commands they become.
//!
//! Every request is checked exactly once, here, before it reaches the ledger.
//! A DTO either turns into a command whose fields are already typed and
//! bounded, or into a `LucError::Validation` naming the offending field.

use std::collections::BTreeSet;

use luc_core::types::MAX_ID_LEN;
use luc_core::{
    LucError, OperationId, QuotaPolicy, Resource, SettlementDiscount, Tier, WorkspaceId,
    MAX_DISCOUNT_CAP,
};
use luc_cost::Operation;
use serde::{Deserialize, Serialize};

/// Default look-back for daily usage history.
pub const DEFAULT_HISTORY_DAYS: u32 = 30;

/// Longest look-back accepted for daily usage history.
pub const MAX_HISTORY_DAYS: u32 = 365;

const MAX_RECEIPT_URL_LEN: usize = 2048;

fn known_resource(policy: &QuotaPolicy, raw: &str) -> Result<Resource, LucError> {
    let resource = Resource::parse(raw)?;
    if !policy.is_known_resource(&resource) {
        return Err(LucError::validation(format!(
            "unknown resource `{resource}`; metered resources are: {}",
            policy
                .resources()
                .iter()
                .map(Resource::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }
    Ok(resource)
}

fn finite_non_negative(field: &str, value: f64) -> Result<f64, LucError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(LucError::validation(format!(
            "{field} must be a non-negative number, got {value}"
        )))
    }
}

fn task_id(raw: &str) -> Result<String, LucError> {
    if raw.trim().is_empty() || raw.len() > MAX_ID_LEN || raw.chars().any(char::is_whitespace) {
        return Err(LucError::validation(format!(
            "task_id must be 1 to {MAX_ID_LEN} characters without whitespace"
        )));
    }
    Ok(raw.to_string())
}

// --- can_execute ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementDto {
    pub resource: String,
    #[serde(default = "one")]
    pub projected_amount: u64,
}

fn one() -> u64 {
    1
}

/// Either a single `resource` (+ `projected_amount`) or a `requirements` list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanExecuteRequest {
    pub workspace_id: String,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub projected_amount: Option<u64>,
    #[serde(default)]
    pub requirements: Option<Vec<RequirementDto>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    pub resource: Resource,
    pub projected_amount: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanExecuteCommand {
    pub workspace_id: WorkspaceId,
    /// Empty means "is any quota exhausted?".
    pub requirements: Vec<Requirement>,
}

impl CanExecuteRequest {
    pub fn validate(self, policy: &QuotaPolicy) -> Result<CanExecuteCommand, LucError> {
        let workspace_id = WorkspaceId::parse(&self.workspace_id)?;

        let mut raw = self.requirements.unwrap_or_default();
        match (self.resource, self.projected_amount) {
            (Some(resource), projected) => raw.push(RequirementDto {
                resource,
                projected_amount: projected.unwrap_or(1),
            }),
            (None, Some(_)) => {
                return Err(LucError::validation(
                    "projected_amount requires a resource",
                ));
            }
            (None, None) => {}
        }

        let mut seen = BTreeSet::new();
        let mut requirements = Vec::with_capacity(raw.len());
        for dto in raw {
            let resource = known_resource(policy, &dto.resource)?;
            if !seen.insert(resource.clone()) {
                return Err(LucError::validation(format!(
                    "resource `{resource}` is listed more than once"
                )));
            }
            requirements.push(Requirement {
                resource,
                projected_amount: dto.projected_amount,
            });
        }

        Ok(CanExecuteCommand {
            workspace_id,
            requirements,
        })
    }
}

// --- estimate ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub workspace_id: String,
    pub operation: Operation,
    #[serde(default)]
    pub variants: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EstimateCommand {
    pub workspace_id: WorkspaceId,
    pub operation: Operation,
    pub variants: Option<Vec<String>>,
}

impl EstimateRequest {
    pub fn validate(self) -> Result<EstimateCommand, LucError> {
        let workspace_id = WorkspaceId::parse(&self.workspace_id)?;
        if self.operation.description.trim().is_empty() && self.operation.components.is_none() {
            return Err(LucError::validation(
                "operation needs a description or explicit components",
            ));
        }
        // Fail on malformed components or relevance before the ledger is touched.
        self.operation.component_tokens()?;
        self.operation.relevance()?;
        Ok(EstimateCommand {
            workspace_id,
            operation: self.operation,
            variants: self.variants.filter(|v| !v.is_empty()),
        })
    }
}

// --- record_usage ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageItemDto {
    pub resource: String,
    pub amount: u64,
    #[serde(default)]
    pub cost_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordUsageRequest {
    pub workspace_id: String,
    pub operation_id: String,
    pub usage: Vec<UsageItemDto>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageItem {
    pub resource: Resource,
    pub amount: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordUsageCommand {
    pub workspace_id: WorkspaceId,
    pub operation_id: OperationId,
    pub usage: Vec<UsageItem>,
}

impl RecordUsageRequest {
    pub fn validate(self, policy: &QuotaPolicy) -> Result<RecordUsageCommand, LucError> {
        let workspace_id = WorkspaceId::parse(&self.workspace_id)?;
        let operation_id = OperationId::parse(&self.operation_id)?;
        if self.usage.is_empty() {
            return Err(LucError::validation("usage must list at least one resource"));
        }

        let mut seen = BTreeSet::new();
        let usage = self
            .usage
            .into_iter()
            .map(|item| {
                let resource = known_resource(policy, &item.resource)?;
                if !seen.insert(resource.clone()) {
                    return Err(LucError::validation(format!(
                        "resource `{resource}` appears more than once in one operation"
                    )));
                }
                Ok(UsageItem {
                    resource,
                    amount: item.amount,
                    cost_usd: finite_non_negative("cost_usd", item.cost_usd)?,
                })
            })
            .collect::<Result<Vec<_>, LucError>>()?;

        Ok(RecordUsageCommand {
            workspace_id,
            operation_id,
            usage,
        })
    }
}

// --- summary ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub workspace_id: String,
    #[serde(default)]
    pub include_breakdown: bool,
    #[serde(default)]
    pub include_history: bool,
    #[serde(default)]
    pub history_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryCommand {
    pub workspace_id: WorkspaceId,
    pub include_breakdown: bool,
    /// Look-back in days when history was requested.
    pub history_days: Option<u32>,
}

impl SummaryRequest {
    pub fn validate(self) -> Result<SummaryCommand, LucError> {
        let workspace_id = WorkspaceId::parse(&self.workspace_id)?;
        let history_days = if self.include_history {
            let days = self.history_days.unwrap_or(DEFAULT_HISTORY_DAYS);
            if !(1..=MAX_HISTORY_DAYS).contains(&days) {
                return Err(LucError::validation(format!(
                    "history_days must be within [1, {MAX_HISTORY_DAYS}], got {days}"
                )));
            }
            Some(days)
        } else {
            None
        };
        Ok(SummaryCommand {
            workspace_id,
            include_breakdown: self.include_breakdown,
            history_days,
        })
    }
}

impl SummaryCommand {
    /// Plain summary: quotas only.
    pub fn basic(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            include_breakdown: false,
            history_days: None,
        }
    }
}

// --- settlements ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleRequest {
    pub workspace_id: String,
    pub task_id: String,
    pub final_cost_usd: f64,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub discount: Option<SettlementDiscount>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettleCommand {
    pub workspace_id: WorkspaceId,
    pub task_id: String,
    pub final_cost_usd: f64,
    pub paid: bool,
    pub receipt_url: Option<String>,
    pub discount: Option<SettlementDiscount>,
}

impl SettleRequest {
    pub fn validate(self) -> Result<SettleCommand, LucError> {
        let workspace_id = WorkspaceId::parse(&self.workspace_id)?;
        let task_id = task_id(&self.task_id)?;
        let final_cost_usd = finite_non_negative("final_cost_usd", self.final_cost_usd)?;

        let receipt_url = match self.receipt_url {
            Some(url) if url.trim().is_empty() || url.len() > MAX_RECEIPT_URL_LEN => {
                return Err(LucError::validation(format!(
                    "receipt_url must be 1 to {MAX_RECEIPT_URL_LEN} characters"
                )));
            }
            other => other,
        };

        if let Some(discount) = &self.discount {
            if !(0.0..=MAX_DISCOUNT_CAP).contains(&discount.discount_pct) {
                return Err(LucError::validation(format!(
                    "discount_pct must be within [0, {MAX_DISCOUNT_CAP}], got {}",
                    discount.discount_pct
                )));
            }
            finite_non_negative("savings_usd", discount.savings_usd)?;
        }

        Ok(SettleCommand {
            workspace_id,
            task_id,
            final_cost_usd,
            paid: self.paid,
            receipt_url,
            discount: self.discount,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SettlementLookup {
    pub workspace_id: WorkspaceId,
    pub task_id: String,
}

impl SettlementLookup {
    pub fn parse(workspace_id: &str, raw_task_id: &str) -> Result<Self, LucError> {
        Ok(Self {
            workspace_id: WorkspaceId::parse(workspace_id)?,
            task_id: task_id(raw_task_id)?,
        })
    }
}

// --- set_tier ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTierRequest {
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetTierCommand {
    pub workspace_id: WorkspaceId,
    pub tier: Tier,
}

impl SetTierRequest {
    pub fn validate(self, workspace_id: &str, policy: &QuotaPolicy) -> Result<SetTierCommand, LucError> {
        let workspace_id = WorkspaceId::parse(workspace_id)?;
        if policy.limits_for(self.tier).is_err() {
            return Err(LucError::validation(format!(
                "tier `{}` is not configured",
                self.tier
            )));
        }
        Ok(SetTierCommand {
            workspace_id,
            tier: self.tier,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn policy() -> QuotaPolicy {
        let limits = BTreeMap::from([
            (Resource::parse("api_calls").unwrap(), 50),
            (Resource::parse("tokens").unwrap(), 0),
        ]);
        QuotaPolicy::new(Tier::Free, 0.4)
            .unwrap()
            .with_tier(Tier::Free, limits, 30)
    }

    #[test]
    fn single_resource_form_defaults_projection_to_one() {
        let cmd = CanExecuteRequest {
            workspace_id: "ws".into(),
            resource: Some("api_calls".into()),
            ..Default::default()
        }
        .validate(&policy())
        .unwrap();
        assert_eq!(cmd.requirements.len(), 1);
        assert_eq!(cmd.requirements[0].projected_amount, 1);
    }

    #[test]
    fn projection_without_resource_is_rejected() {
        let err = CanExecuteRequest {
            workspace_id: "ws".into(),
            projected_amount: Some(5),
            ..Default::default()
        }
        .validate(&policy())
        .unwrap_err();
        assert!(matches!(err, LucError::Validation(_)));
    }

    #[test]
    fn unknown_resource_is_rejected() {
        let err = CanExecuteRequest {
            workspace_id: "ws".into(),
            resource: Some("gpus".into()),
            ..Default::default()
        }
        .validate(&policy())
        .unwrap_err();
        assert!(err.to_string().contains("unknown resource"));
    }

    #[test]
    fn usage_requires_distinct_resources() {
        let req = RecordUsageRequest {
            workspace_id: "ws".into(),
            operation_id: "op".into(),
            usage: vec![
                UsageItemDto {
                    resource: "api_calls".into(),
                    amount: 1,
                    cost_usd: 0.0,
                },
                UsageItemDto {
                    resource: "api_calls".into(),
                    amount: 2,
                    cost_usd: 0.0,
                },
            ],
        };
        assert!(matches!(req.validate(&policy()), Err(LucError::Validation(_))));
    }

    #[test]
    fn usage_rejects_empty_list_and_negative_cost() {
        let empty = RecordUsageRequest {
            workspace_id: "ws".into(),
            operation_id: "op".into(),
            usage: vec![],
        };
        assert!(empty.validate(&policy()).is_err());

        let negative = RecordUsageRequest {
            workspace_id: "ws".into(),
            operation_id: "op".into(),
            usage: vec![UsageItemDto {
                resource: "tokens".into(),
                amount: 1,
                cost_usd: -0.5,
            }],
        };
        assert!(negative.validate(&policy()).is_err());
    }

    #[test]
    fn blank_workspace_is_rejected_everywhere() {
        assert!(SummaryRequest::default().validate().is_err());
        assert!(SettlementLookup::parse("", "task").is_err());
    }

    #[test]
    fn history_days_are_bounded() {
        let req = |days| SummaryRequest {
            workspace_id: "ws".into(),
            include_history: true,
            history_days: Some(days),
            ..Default::default()
        };
        assert_eq!(req(365).validate().unwrap().history_days, Some(365));
        assert!(req(366).validate().is_err());
        assert!(req(0).validate().is_err());

        let default = SummaryRequest {
            workspace_id: "ws".into(),
            include_history: true,
            ..Default::default()
        };
        assert_eq!(default.validate().unwrap().history_days, Some(30));
    }

    #[test]
    fn history_days_are_ignored_without_history() {
        let req = SummaryRequest {
            workspace_id: "ws".into(),
            include_history: false,
            history_days: Some(0),
            ..Default::default()
        };
        assert_eq!(req.validate().unwrap().history_days, None);
    }

    #[test]
    fn settlement_discount_is_capped() {
        let req = SettleRequest {
            workspace_id: "ws".into(),
            task_id: "task-1".into(),
            final_cost_usd: 1.0,
            paid: true,
            receipt_url: None,
            discount: Some(SettlementDiscount {
                discount_pct: 0.5,
                savings_usd: 0.1,
            }),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn unconfigured_tier_is_a_validation_error() {
        let err = SetTierRequest { tier: Tier::Team }
            .validate("ws", &policy())
            .unwrap_err();
        assert!(matches!(err, LucError::Validation(_)));
    }

    #[test]
    fn requests_deserialize_from_json() {
        let req: RecordUsageRequest = serde_json::from_str(
            r#"{"workspace_id":"ws","operation_id":"op-1","usage":[{"resource":"tokens","amount":120}]}"#,
        )
        .unwrap();
        assert_eq!(req.usage[0].cost_usd, 0.0);
        let cmd = req.validate(&policy()).unwrap();
        assert_eq!(cmd.usage[0].amount, 120);
    }
}
