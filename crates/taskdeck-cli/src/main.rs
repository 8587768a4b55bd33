//! taskdeck - a terminal client for the taskdeck project and task tracker.
//!
//! Every command is checked against the stored session before it runs:
//! signed-out users are sent to `login`, and a session the server rejects
//! is cleared on the spot.

mod cli;
mod commands;
mod format;

use std::io;

use anyhow::Result;
use clap::Parser;
use taskdeck_core::{ApiClient, Config, SessionController};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use commands::{describe_state, Context, TerminalNavigator};

/// Directory for the optional daily log file
const LOG_DIR_ENV: &str = "TASKDECK_LOG_DIR";

/// Initialize the tracing subscriber for logging.
///
/// Returns the file writer guard when file logging is enabled; it must live
/// until exit so buffered lines are flushed.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "taskdeck.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let cli = Cli::parse();
    debug!(command = ?cli.command, "Parsed command");

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url.filter(|u| !u.trim().is_empty()) {
        config.api_base_url = url.trim().to_string();
    }
    let store = config.credential_store()?;
    let session = SessionController::new(store, TerminalNavigator);
    let api = ApiClient::from_config(&config, session.clone())?;

    let state = session.init();
    info!(state = %describe_state(&state), api = %config.api_base_url, "taskdeck starting");

    let mut ctx = Context {
        config,
        session,
        api,
    };
    commands::run(&mut ctx, cli.command).await
}
