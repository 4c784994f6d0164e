// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-level tests driving the router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use luc_config::model::CallerConfig;
use luc_gateway::{router, CallerRegistry, GatewayState};
use luc_metering::SlidingWindowGuard;
use luc_test_utils::{LedgerBackend, TestHarness};
use serde_json::{json, Value};
use tower::ServiceExt;

const TOKEN: &str = "test-token";

struct Api {
    app: Router,
    _harness: TestHarness,
}

impl Api {
    async fn new(backend: LedgerBackend, callers: &[(&str, &str)], max_requests: u32) -> Self {
        let harness = TestHarness::builder().backend(backend).build().await.unwrap();
        let callers: Vec<CallerConfig> = callers
            .iter()
            .map(|(id, token)| CallerConfig {
                id: id.to_string(),
                token: token.to_string(),
            })
            .collect();
        let state = GatewayState::new(
            harness.engine.clone(),
            Arc::new(SlidingWindowGuard::new(max_requests, Duration::from_secs(60))),
            CallerRegistry::from_config(&callers).unwrap(),
        );
        Self {
            app: router(state),
            _harness: harness,
        }
    }

    async fn default() -> Self {
        Self::new(LedgerBackend::Memory, &[("billing", TOKEN)], 1000).await
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as(Some(TOKEN), method, uri, body).await
    }

    async fn send_as(
        &self,
        token: Option<&str>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

#[tokio::test]
async fn health_is_public() {
    let api = Api::default().await;
    let (status, body) = api.send_as(None, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ledger"], "memory");
}

#[tokio::test]
async fn missing_or_wrong_token_is_unauthorized() {
    let api = Api::default().await;
    let (status, body) = api
        .send_as(None, Method::GET, "/v1/summary?workspace_id=acme", None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = api
        .send_as(Some("wrong"), Method::GET, "/v1/summary?workspace_id=acme", None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn no_configured_callers_rejects_everything() {
    let api = Api::new(LedgerBackend::Memory, &[], 1000).await;
    let (status, _) = api
        .send(Method::GET, "/v1/summary?workspace_id=acme", None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn usage_then_summary_round_trip() {
    let api = Api::default().await;
    let (status, body) = api
        .send(
            Method::POST,
            "/v1/usage",
            Some(json!({
                "workspace_id": "acme",
                "operation_id": "op-1",
                "usage": [
                    {"resource": "api_calls", "amount": 5, "cost_usd": 0.02},
                    {"resource": "tokens", "amount": 1200}
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["quotas"]["api_calls"]["used"], 5);
    assert_eq!(body["tier"], "free");

    let (status, body) = api
        .send(
            Method::GET,
            "/v1/summary?workspace_id=acme&include_breakdown=true&include_history=true&history_days=7",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["quotas"]["tokens"]["used"], 1200);
    assert_eq!(body["breakdown"].as_array().unwrap().len(), 2);
    assert_eq!(body["history"]["days"], 7);
}

#[tokio::test]
async fn can_execute_reports_blocking_quotas() {
    let api = Api::default().await;
    let (status, body) = api
        .send(
            Method::POST,
            "/v1/can-execute",
            Some(json!({"workspace_id": "acme", "resource": "api_calls", "projected_amount": 51})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);
    assert_eq!(body["blocking_quotas"], json!(["api_calls"]));
    assert_eq!(body["blocking_details"][0]["projected"], 51);
}

#[tokio::test]
async fn validation_errors_use_the_error_envelope() {
    let api = Api::default().await;
    let (status, body) = api
        .send(
            Method::POST,
            "/v1/usage",
            Some(json!({"workspace_id": "acme", "operation_id": "op", "usage": []})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = api
        .send(Method::POST, "/v1/usage", Some(json!({"workspace_id": 5})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn estimate_returns_a_quote() {
    let api = Api::default().await;
    let (status, body) = api
        .send(
            Method::POST,
            "/v1/estimate",
            Some(json!({
                "workspace_id": "acme",
                "operation": {"description": "write a changelog", "complexity": "low"},
                "variants": ["economy", "premium"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["valid_for_seconds"], 900);
    assert_eq!(body["variants"][0]["name"], "economy");
    assert_eq!(body["variants"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn settlements_are_stored_once_and_scoped_to_workspace() {
    let api = Api::default().await;
    let settle = json!({
        "workspace_id": "acme",
        "task_id": "task-7",
        "final_cost_usd": 0.42,
        "paid": true,
        "discount": {"discount_pct": 0.2, "savings_usd": 0.1}
    });
    let (status, first) = api
        .send(Method::POST, "/v1/settlements", Some(settle.clone()))
        .await;
    assert_eq!(status, StatusCode::OK, "{first}");
    let (_, second) = api.send(Method::POST, "/v1/settlements", Some(settle)).await;
    assert_eq!(first["settlement_id"], second["settlement_id"]);

    let (status, found) = api
        .send(Method::GET, "/v1/settlements/task-7?workspace_id=acme", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["final_cost_usd"], 0.42);

    let (status, body) = api
        .send(Method::GET, "/v1/settlements/task-7?workspace_id=globex", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn tier_change_applies_new_limits() {
    let api = Api::default().await;
    let (status, body) = api
        .send(
            Method::PUT,
            "/v1/accounts/acme/tier",
            Some(json!({"tier": "pro"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["tier"], "pro");
    assert_eq!(body["quotas"]["api_calls"]["limit"], 1000);

    let (status, _) = api
        .send(
            Method::PUT,
            "/v1/accounts/acme/tier",
            Some(json!({"tier": "platinum"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admission_guard_limits_each_caller() {
    let api = Api::new(
        LedgerBackend::Memory,
        &[("billing", TOKEN), ("ops", "ops-token")],
        2,
    )
    .await;
    let uri = "/v1/summary?workspace_id=acme";
    assert_eq!(api.send(Method::GET, uri, None).await.0, StatusCode::OK);
    assert_eq!(api.send(Method::GET, uri, None).await.0, StatusCode::OK);
    let (status, body) = api.send(Method::GET, uri, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    let (status, _) = api
        .send_as(Some("ops-token"), Method::GET, uri, None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn storage_outage_maps_to_account_error() {
    let api = Api::new(LedgerBackend::Failing, &[("billing", TOKEN)], 1000).await;
    let (status, body) = api
        .send(
            Method::POST,
            "/v1/can-execute",
            Some(json!({"workspace_id": "acme", "resource": "api_calls"})),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "ACCOUNT_ERROR");

    let (status, body) = api.send_as(None, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn sqlite_backend_serves_the_same_api() {
    let api = Api::new(LedgerBackend::Sqlite, &[("billing", TOKEN)], 1000).await;
    let (status, body) = api
        .send(
            Method::POST,
            "/v1/usage",
            Some(json!({
                "workspace_id": "acme",
                "operation_id": "op-1",
                "usage": [{"resource": "api_calls", "amount": 3}]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["quotas"]["api_calls"]["used"], 3);
    let (_, health) = api.send_as(None, Method::GET, "/health", None).await;
    assert_eq!(health["ledger"], "sqlite");
}
