//! tars - Main entry point

#![deny(clippy::unwrap_used, clippy::expect_used)]

use clap::Parser;
use serde::Serialize;
use std::process;
use tars_common::logging::init_logging;
use tars_export::commands::{self, App};
use tars_export::{Cli, Commands, Config};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = commands::log_config(cli.verbose);

    // The CLI works without logging
    let _ = init_logging(&log_config);

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn execute_command(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    let app = App::connect(config).await?;

    match &cli.command {
        Commands::Latest => print_json(&commands::latest(&app).await?),
        Commands::Allocate => print_json(&commands::allocate(&app).await?),
        Commands::Export {
            input,
            file_name,
            rows,
        } => print_json(&commands::export(&app, input, file_name, *rows).await?),
        Commands::Housekeeping { every: None } => {
            print_json(&commands::housekeeping(&app).await?)
        },
        Commands::Housekeeping { every: Some(secs) } => {
            commands::housekeeping_schedule(&app, *secs, shutdown_signal()).await
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping housekeeping");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping housekeeping");
        },
    }
}
