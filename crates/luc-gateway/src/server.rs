// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::middleware as axum_middleware;
use axum::routing::{get, post, put};
use axum::Router;
use luc_config::model::GatewayConfig;
use luc_core::{AdmissionGuard, LucError};
use luc_metering::MeteringEngine;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{admission_middleware, auth_middleware, CallerRegistry};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub engine: Arc<MeteringEngine>,
    pub guard: Arc<dyn AdmissionGuard>,
    pub callers: CallerRegistry,
    /// Process start, for uptime on `/health`.
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(
        engine: Arc<MeteringEngine>,
        guard: Arc<dyn AdmissionGuard>,
        callers: CallerRegistry,
    ) -> Self {
        Self {
            engine,
            guard,
            callers,
            started_at: Instant::now(),
        }
    }
}

/// Build the full route tree.
///
/// `/health` is public; every `/v1` route passes bearer auth, then the
/// admission guard.
pub fn router(state: GatewayState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    // Layers run outermost-last: auth wraps admission.
    let api_routes = Router::new()
        .route("/v1/can-execute", post(handlers::post_can_execute))
        .route("/v1/estimate", post(handlers::post_estimate))
        .route("/v1/usage", post(handlers::post_usage))
        .route("/v1/summary", get(handlers::get_summary))
        .route("/v1/settlements", post(handlers::post_settlement))
        .route("/v1/settlements/{task_id}", get(handlers::get_settlement))
        .route("/v1/accounts/{workspace_id}/tier", put(handlers::put_tier))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind to the configured address and serve until `shutdown` is cancelled.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), LucError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LucError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!(%addr, callers = config.callers.len(), "gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| LucError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
