// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `luc serve` command implementation.
//!
//! Builds the ledger, engine and admission guard from configuration, then
//! serves the HTTP gateway until SIGINT or SIGTERM.

use luc_config::model::LucConfig;
use luc_core::LucError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::App;

pub async fn run_serve(config: LucConfig) -> Result<(), LucError> {
    info!(service = %config.service.name, "starting luc serve");

    let app = App::build(&config).await?;
    let state = app.gateway_state(&config).await?;
    let cancel = install_signal_handler();

    let result = luc_gateway::start_server(&config.gateway, state, cancel).await;

    if let Err(e) = app.shutdown().await {
        warn!(error = %e, "ledger shutdown failed");
    }
    info!("luc serve stopped");
    result
}

/// Cancel the returned token on SIGINT or SIGTERM.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}
