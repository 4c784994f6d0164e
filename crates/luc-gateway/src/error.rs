// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from `LucError` to HTTP responses.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use luc_core::LucError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Error response body: `{"error": {"code", "message"}}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Handler error wrapper so `?` works on `LucError` inside handlers.
#[derive(Debug)]
pub struct ApiError(pub LucError);

impl From<LucError> for ApiError {
    fn from(e: LucError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self(LucError::validation(e.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self(LucError::validation(e.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        Self(LucError::validation(e.body_text()))
    }
}

pub fn status_for(error: &LucError) -> StatusCode {
    match error {
        LucError::Validation(_) | LucError::UnknownTier(_) => StatusCode::BAD_REQUEST,
        LucError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        LucError::NotFound(_) | LucError::AccountNotFound { .. } => StatusCode::NOT_FOUND,
        LucError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        LucError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        LucError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        LucError::Config(_) | LucError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, code = self.0.code(), "request failed");
            match &self.0 {
                LucError::StorageUnavailable { .. } => "usage ledger is unavailable".to_string(),
                LucError::Timeout { .. } => self.0.to_string(),
                _ => "internal error".to_string(),
            }
        } else {
            self.0.to_string()
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.0.code(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}
