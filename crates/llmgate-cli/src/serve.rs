//! `llmgate serve`: build the backend registry and run the HTTP gateway.
//!
//! Startup sequence:
//! 1. Load config (a broken config file aborts startup), initialise logging
//! 2. Validate config and build the backend registry (refuses to start when incomplete)
//! 3. Ensure the scratch directory exists
//! 4. Serve until Ctrl+C, then drain in-flight requests

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{info, warn};

use llmgate_backends::BackendRegistry;
use llmgate_core::config::try_load_config;
use llmgate_core::utils::expand_home;
use llmgate_core::UsageAccountant;
use llmgate_gateway::{serve, AppState, Dispatcher};

use crate::helpers;

pub async fn run(config_path: Option<&Path>, verbose: bool) -> Result<()> {
    let config = try_load_config(config_path).context("refusing to start")?;
    let logs = helpers::init_logging(&config.logging, verbose);

    let registry = BackendRegistry::from_config(&config)
        .context("configuration is incomplete; refusing to start")?;

    let scratch = expand_home(&config.server.scratch_dir);
    std::fs::create_dir_all(&scratch)
        .with_context(|| format!("failed to create scratch dir: {}", scratch.display()))?;

    helpers::print_banner();
    println!(
        "  {:<12} http://{}:{}",
        "Listening:".bold(),
        config.server.host,
        config.server.port
    );
    println!("  {:<12} {}", "Scratch:".bold(), scratch.display());
    println!("  {:<12} {}", "Backends:".bold(), registry.names().join(", "));
    println!();

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(registry),
        Arc::new(UsageAccountant::new()),
    ));
    let state = AppState::new(dispatcher.clone(), logs);

    serve(state, &config.server, shutdown_signal())
        .await
        .with_context(|| {
            format!(
                "failed to serve on {}:{}",
                config.server.host, config.server.port
            )
        })?;

    info!(
        requests = dispatcher.total_requests(),
        tokens = dispatcher.usage().total(),
        "llmgate stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received, draining requests");
}
