// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handlers only translate: extract the DTO, validate it into a command,
//! call the engine, serialize the result.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use luc_core::{HealthStatus, LucError, PluginAdapter, Settlement};
use luc_cost::Quote;
use luc_metering::{
    Admission, CanExecuteRequest, EstimateRequest, RecordUsageRequest, SetTierRequest,
    SettleRequest, SettlementLookup, Summary, SummaryRequest,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub ledger: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health
///
/// Unauthenticated. 503 when the ledger reports itself unhealthy.
pub async fn get_health(State(state): State<GatewayState>) -> (StatusCode, Json<HealthResponse>) {
    let ledger = state.engine.ledger();
    let (status, detail) = match ledger.health_check().await {
        Ok(HealthStatus::Healthy) => ("ok", None),
        Ok(HealthStatus::Degraded(reason)) => ("degraded", Some(reason)),
        Ok(HealthStatus::Unhealthy(reason)) => ("unhealthy", Some(reason)),
        Err(e) => ("unhealthy", Some(e.to_string())),
    };
    let code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            detail,
            ledger: ledger.name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.started_at.elapsed().as_secs(),
        }),
    )
}

/// POST /v1/can-execute
pub async fn post_can_execute(
    State(state): State<GatewayState>,
    body: Result<Json<CanExecuteRequest>, JsonRejection>,
) -> ApiResult<Admission> {
    let Json(body) = body?;
    let cmd = body.validate(state.engine.policy())?;
    Ok(Json(state.engine.can_execute(&cmd).await?))
}

/// POST /v1/estimate
pub async fn post_estimate(
    State(state): State<GatewayState>,
    body: Result<Json<EstimateRequest>, JsonRejection>,
) -> ApiResult<Quote> {
    let Json(body) = body?;
    let cmd = body.validate()?;
    Ok(Json(state.engine.estimate(&cmd).await?))
}

/// POST /v1/usage
pub async fn post_usage(
    State(state): State<GatewayState>,
    body: Result<Json<RecordUsageRequest>, JsonRejection>,
) -> ApiResult<Summary> {
    let Json(body) = body?;
    let cmd = body.validate(state.engine.policy())?;
    Ok(Json(state.engine.record_usage(&cmd).await?))
}

/// GET /v1/summary?workspace_id=..&include_breakdown=..&include_history=..&history_days=..
pub async fn get_summary(
    State(state): State<GatewayState>,
    query: Result<Query<SummaryRequest>, QueryRejection>,
) -> ApiResult<Summary> {
    let Query(query) = query?;
    let cmd = query.validate()?;
    Ok(Json(state.engine.summary(&cmd).await?))
}

/// POST /v1/settlements
pub async fn post_settlement(
    State(state): State<GatewayState>,
    body: Result<Json<SettleRequest>, JsonRejection>,
) -> ApiResult<Settlement> {
    let Json(body) = body?;
    let cmd = body.validate()?;
    Ok(Json(state.engine.settle(&cmd).await?))
}

#[derive(Debug, Deserialize)]
pub struct WorkspaceQuery {
    pub workspace_id: Option<String>,
}

/// GET /v1/settlements/{task_id}?workspace_id=..
pub async fn get_settlement(
    State(state): State<GatewayState>,
    task_id: Result<Path<String>, PathRejection>,
    query: Result<Query<WorkspaceQuery>, QueryRejection>,
) -> ApiResult<Settlement> {
    let Path(task_id) = task_id?;
    let Query(query) = query?;
    let workspace_id = query
        .workspace_id
        .ok_or_else(|| LucError::validation("workspace_id query parameter is required"))?;
    let lookup = SettlementLookup::parse(&workspace_id, &task_id)?;
    Ok(Json(state.engine.settlement(&lookup).await?))
}

/// PUT /v1/accounts/{workspace_id}/tier
pub async fn put_tier(
    State(state): State<GatewayState>,
    workspace_id: Result<Path<String>, PathRejection>,
    body: Result<Json<SetTierRequest>, JsonRejection>,
) -> ApiResult<Summary> {
    let Path(workspace_id) = workspace_id?;
    let Json(body) = body?;
    let cmd = body.validate(&workspace_id, state.engine.policy())?;
    Ok(Json(state.engine.set_tier(&cmd).await?))
}
