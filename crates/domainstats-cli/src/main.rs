#![doc = include_str!("../README.md")]

mod config;
mod output;
mod telemetry;

use clap::Parser as _;
use config::{AppConfig, CliArgs};
use core::time::Duration;
use domainstats::{CancellationToken, Parser, RunStatus};
use std::{io, process::ExitCode, time::Instant};
use telemetry::{
    increment_run_errors, increment_runs, init_telemetry, record_report, record_run_duration,
};
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Exit code for a run stopped by a signal or the deadline (128 + SIGINT).
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = AppConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_signal(cancel.clone(), config.timeout));

    let parser = Parser::new(config.parser);
    let start = Instant::now();
    increment_runs();
    let outcome = parser.report(&config.input, &cancel).await;
    record_run_duration(start.elapsed().as_secs_f64() * 1000.0);

    watcher.abort();
    let status = RunStatus::of(&outcome);

    let code = match outcome {
        Ok(report) => {
            record_report(&report);
            output::render(&mut io::stdout().lock(), &report.counts, config.format)?;
            ExitCode::SUCCESS
        }
        Err(e) => {
            increment_run_errors(status);
            tracing::error!(%status, "{e}");
            if e.is_cancelled() {
                ExitCode::from(EXIT_CANCELLED)
            } else {
                ExitCode::FAILURE
            }
        }
    };

    providers.shutdown();
    Ok(code)
}

fn log_startup_info(config: &AppConfig) {
    if cfg!(debug_assertions) {
        tracing::debug!("Starting with full config: {:#?}", config);
    }
    tracing::info!(
        "Counting domains in {} with {} workers",
        config.input.display(),
        config.parser.worker_count
    );
}

/// Cancels `cancel` on Ctrl+C, SIGTERM, or once `timeout` elapses.
async fn cancel_on_signal(cancel: CancellationToken, timeout: Option<Duration>) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    let deadline = async {
        match timeout {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
        () = deadline => tracing::warn!("Deadline reached"),
    }

    tracing::info!("Cancelling run...");
    cancel.cancel();
}
