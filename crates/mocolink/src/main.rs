mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mocolink_config::Preferences;
use mocolink_core::Session;

use crate::cli::{Cli, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let prefs = effective_preferences(&cli.global)?;

    let session = Session::new(prefs.session_config())?;
    session.start().await;

    let result = commands::dispatch(cli.command, &session, prefs).await;
    session.shutdown().await;
    result
}

/// Preferences from disk + environment, with CLI flags on top.
fn effective_preferences(global: &GlobalOpts) -> Result<Preferences, CliError> {
    let mut prefs = mocolink_config::load_preferences()?;
    if let Some(host) = &global.host {
        prefs.hostname = host.clone();
    }
    if let Some(port) = global.port {
        prefs.port = port;
    }
    Ok(prefs)
}
