// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ak_daemon::config;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let state_dir = config::state_dir();
    if let Err(e) = std::fs::create_dir_all(state_dir.join("logs")) {
        eprintln!("failed to create log directory: {e}");
        std::process::exit(1);
    }
    let file_appender = tracing_appender::rolling::daily(state_dir.join("logs"), "ak.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config::log_filter()))
        .with_writer(non_blocking.and(std::io::stdout))
        .init();

    info!("starting ak-daemon");

    let kernel = match ak_daemon::build_kernel("ak-agent-runner", Vec::new()) {
        Ok(kernel) => std::sync::Arc::new(kernel),
        Err(e) => {
            error!(error = %e, "failed to initialize kernel");
            std::process::exit(1);
        }
    };

    kernel.start();

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }

    info!("shutdown signal received, draining background loops");
    if let Err(e) = kernel.stop(Duration::from_secs(10)).await {
        error!(error = %e, "error during shutdown");
        std::process::exit(1);
    }
    info!("ak-daemon stopped cleanly");
}
