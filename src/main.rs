//! Point-in-time restore for versioned S3 buckets
//!
//! Lists every version under a prefix, picks for each key the newest version
//! written before the requested moment and copies it back on top of the key.

// s3r/src/main.rs
mod cli;
mod config;
mod errors;
mod restore;
mod storage;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use config::{AppConfig, OperationConfig, load_restore_config};
use errors::AppError;
use restore::RestoreReport;
use std::process::ExitCode;
use storage::{S3VersionStore, build_s3_client};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the restore tool
#[tokio::main]
async fn main() -> ExitCode {
    // Credentials and region may come from a .env file
    dotenv::dotenv().ok();
    init_tracing();

    // Usage errors exit with code 2 from here
    let cli = Cli::parse();

    match run_app(cli).await {
        Ok(report) if report.is_success() => {
            for restored in &report.restored {
                println!(
                    "Restored {} from version {} (new version: {})",
                    restored.target.key,
                    restored.target.version_id,
                    restored.new_version_id.as_deref().unwrap_or("-")
                );
            }
            println!("✅ Restore completed successfully: {}.", report.summary());
            ExitCode::SUCCESS
        }
        Ok(report) => {
            eprintln!("⚠️ Restore completed with failures: {}.", report.summary());
            for failure in &report.failed {
                eprintln!("   {}", failure.error);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Maps the first [`AppError`] in the chain to its exit code; anything else is a plain failure.
fn exit_code_for(error: &anyhow::Error) -> u8 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<AppError>())
        .map(AppError::exit_code)
        .unwrap_or(1)
}

async fn run_app(cli: Cli) -> Result<RestoreReport> {
    let mut app_config = AppConfig::load(cli.config.as_deref()).context("Failed to load application configuration")?;

    match cli.command {
        Command::Restore(args) => {
            let restore_config = load_restore_config(&app_config.raw_json_config, &args)
                .context("Failed to load restore configuration")?;
            app_config.apply_storage_overrides(&args)?;
            app_config.operation = Some(OperationConfig::Restore(restore_config));

            let client = build_s3_client(&app_config.storage).await;
            let store = S3VersionStore::new(client);

            let cancel = CancellationToken::new();
            let signal_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, finishing in-flight copies and stopping");
                    signal_token.cancel();
                }
            });

            let report = restore::run_restore_flow(&app_config, &store, cancel)
                .await
                .context("Restore process failed")?;
            Ok(report)
        }
        Command::List(args) => Err(AppError::NotImplemented(format!("list --since {:?}", args.since)).into()),
    }
}
