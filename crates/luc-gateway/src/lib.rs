// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the LUC metering engine.
//!
//! Exposes the engine's operations as JSON routes under `/v1`, guarded by
//! bearer-token authentication and a per-caller admission guard, plus an
//! unauthenticated `/health`.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::CallerRegistry;
pub use error::ApiError;
pub use server::{router, start_server, GatewayState};
