// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token authentication and per-caller admission for the API routes.
//!
//! Tokens map to caller identities from `[[gateway.callers]]`. With no
//! callers configured every request is rejected (fail-closed). Authenticated
//! requests then pass the admission guard, which counts them per caller.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use luc_config::model::CallerConfig;
use luc_core::{AdmissionGuard, CallerId, LucError};
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::server::GatewayState;

/// Token → caller lookup built from configuration.
#[derive(Clone, Default)]
pub struct CallerRegistry {
    callers: Vec<(String, CallerId)>,
}

impl CallerRegistry {
    pub fn from_config(callers: &[CallerConfig]) -> Result<Self, LucError> {
        let mut registry = Vec::with_capacity(callers.len());
        for caller in callers {
            let id = CallerId::parse(&caller.id)?;
            if registry.iter().any(|(token, _)| token == &caller.token) {
                return Err(LucError::Config(format!(
                    "gateway caller `{}` reuses another caller's token",
                    caller.id
                )));
            }
            registry.push((caller.token.clone(), id));
        }
        Ok(Self { callers: registry })
    }

    /// Compares against every configured token in constant time per token.
    pub fn resolve(&self, token: &str) -> Option<&CallerId> {
        let mut found = None;
        for (expected, id) in &self.callers {
            if bool::from(expected.as_bytes().ct_eq(token.as_bytes())) {
                found = Some(id);
            }
        }
        found
    }

    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }
}

impl std::fmt::Debug for CallerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallerRegistry")
            .field(
                "callers",
                &self.callers.iter().map(|(_, id)| id).collect::<Vec<_>>(),
            )
            .field("tokens", &"[redacted]")
            .finish()
    }
}

/// Resolve the bearer token to a caller and attach it to the request.
pub async fn auth_middleware(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Response {
    if state.callers.is_empty() {
        tracing::error!("gateway has no callers configured -- rejecting request");
        return ApiError(LucError::Unauthorized("no callers are configured".into())).into_response();
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token.and_then(|t| state.callers.resolve(t)) {
        Some(caller) => {
            let caller = caller.clone();
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        None => ApiError(LucError::Unauthorized(
            "missing or invalid bearer token".into(),
        ))
        .into_response(),
    }
}

/// Count the request against the caller's rate window; reject when full or
/// when the guard itself fails.
pub async fn admission_middleware(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(caller) = request.extensions().get::<CallerId>().cloned() else {
        return ApiError(LucError::Unauthorized("no caller identity".into())).into_response();
    };

    match state.guard.allow(&caller).await {
        Ok(true) => next.run(request).await,
        Ok(false) => ApiError(LucError::RateLimited {
            caller_id: caller.to_string(),
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(caller_id = %caller, error = %e, "admission guard failed -- rejecting");
            ApiError(LucError::RateLimited {
                caller_id: caller.to_string(),
            })
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callers() -> Vec<CallerConfig> {
        vec![
            CallerConfig {
                id: "billing".into(),
                token: "secret-a".into(),
            },
            CallerConfig {
                id: "ops".into(),
                token: "secret-b".into(),
            },
        ]
    }

    #[test]
    fn tokens_resolve_to_callers() {
        let registry = CallerRegistry::from_config(&callers()).unwrap();
        assert_eq!(registry.resolve("secret-b").unwrap().as_str(), "ops");
        assert!(registry.resolve("nope").is_none());
        assert!(registry.resolve("secret-").is_none());
        assert!(registry.resolve("secret-bb").is_none());
        assert!(registry.resolve("").is_none());
    }

    #[test]
    fn shared_tokens_are_rejected() {
        let mut config = callers();
        config[1].token = "secret-a".into();
        assert!(CallerRegistry::from_config(&config).is_err());
    }

    #[test]
    fn debug_redacts_tokens() {
        let registry = CallerRegistry::from_config(&callers()).unwrap();
        let debug = format!("{registry:?}");
        assert!(!debug.contains("secret-a"));
        assert!(debug.contains("[redacted]"));
    }
}
