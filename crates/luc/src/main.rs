// SPDX-FileCopyrightText: 2026 LUC Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LUC - usage metering and admission control.
//!
//! This is the binary entry point: the HTTP service plus a few operator
//! commands that run the engine directly against the configured ledger.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use luc_config::model::LucConfig;
use luc_core::LucError;
use luc_cost::{Complexity, Operation};
use luc_metering::{EstimateRequest, SummaryRequest};

use crate::app::App;

/// LUC - usage metering and admission control.
#[derive(Parser, Debug)]
#[command(name = "luc", version, about, long_about = None)]
struct Cli {
    /// Load this file instead of the standard config locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,
    /// Print a workspace's quota summary as JSON.
    Summary {
        workspace_id: String,
        /// Include per-resource cost and event counts.
        #[arg(long)]
        breakdown: bool,
        /// Include daily history and archived cycles.
        #[arg(long)]
        history: bool,
        /// History look-back in days.
        #[arg(long)]
        days: Option<u32>,
    },
    /// Print a multi-variant quote for an operation as JSON.
    Estimate {
        workspace_id: String,
        description: String,
        #[arg(long, default_value = "medium")]
        complexity: Complexity,
        /// Restrict the quote to these variants (repeatable).
        #[arg(long = "variant")]
        variants: Vec<String>,
        /// Prior context entries used to derive relevance (repeatable).
        #[arg(long = "prior")]
        prior_context: Vec<String>,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => luc_config::load_and_validate_path(path),
        None => luc_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            luc_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Summary {
            workspace_id,
            breakdown,
            history,
            days,
        }) => {
            let request = SummaryRequest {
                workspace_id,
                include_breakdown: breakdown,
                include_history: history || days.is_some(),
                history_days: days,
            };
            run_summary(&config, request).await
        }
        Some(Commands::Estimate {
            workspace_id,
            description,
            complexity,
            variants,
            prior_context,
        }) => {
            let request = EstimateRequest {
                workspace_id,
                operation: Operation {
                    description,
                    complexity,
                    prior_context,
                    ..Operation::default()
                },
                variants: (!variants.is_empty()).then_some(variants),
            };
            run_estimate(&config, request).await
        }
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("luc: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error [{}]: {e}", e.code());
        std::process::exit(1);
    }
}

async fn run_summary(config: &LucConfig, request: SummaryRequest) -> Result<(), LucError> {
    let app = App::build(config).await?;
    let summary = app.engine.summary(&request.validate()?).await?;
    print_json(&summary)?;
    app.shutdown().await
}

async fn run_estimate(config: &LucConfig, request: EstimateRequest) -> Result<(), LucError> {
    let app = App::build(config).await?;
    let quote = app.engine.estimate(&request.validate()?).await?;
    print_json(&quote)?;
    app.shutdown().await
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), LucError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| LucError::Internal(format!("failed to render JSON: {e}")))?;
    println!("{rendered}");
    Ok(())
}

/// Print the merged configuration with caller tokens masked.
fn print_config(config: &LucConfig) -> Result<(), LucError> {
    let mut shown = config.clone();
    for caller in &mut shown.gateway.callers {
        caller.token = "[redacted]".to_string();
    }
    let rendered = toml::to_string_pretty(&shown)
        .map_err(|e| LucError::Internal(format!("failed to render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("luc={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
