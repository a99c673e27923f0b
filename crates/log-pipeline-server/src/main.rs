// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{process::ExitCode, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use log_pipeline::{api::LogApi, config::Config, lifecycle::Pipeline};

#[tokio::main]
pub async fn main() -> ExitCode {
    let config = Config::new();
    let env_filter = match &config {
        Ok(c) => c.log_filter(),
        Err(_) => Config::default().log_filter(),
    };

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match config {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Error creating config on log pipeline startup: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("Application starting up, creating background log pipeline worker");
    let pipeline = Pipeline::start(config.worker.clone());

    let api = LogApi::new(Arc::clone(&config), pipeline.handle());
    let server_cancel_token = CancellationToken::new();
    let server_token = server_cancel_token.clone();
    let mut server_handle = tokio::spawn(async move { api.start(server_token).await });

    let mut exit_code = ExitCode::SUCCESS;
    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            server_cancel_token.cancel();
            match server_handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Log pipeline API error during shutdown: {e}"),
                Err(e) => error!("Log pipeline API task failed: {e}"),
            }
        },
        result = &mut server_handle => {
            match result {
                Ok(Ok(())) => info!("Log pipeline API exited"),
                Ok(Err(e)) => error!("Log pipeline API error: {e}"),
                Err(e) => error!("Log pipeline API task failed: {e}"),
            }
            exit_code = ExitCode::FAILURE;
        },
    }

    info!("Application shutting down, stopping background log pipeline worker");
    if let Err(e) = pipeline.shutdown(config.shutdown_timeout).await {
        error!("Error stopping log pipeline worker: {e}");
        return ExitCode::FAILURE;
    }
    exit_code
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
