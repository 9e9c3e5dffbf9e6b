//! Command dispatch: bridges CLI args -> session operations -> output.

pub mod adapters;
pub mod monitor;
pub mod pair;

use std::time::Duration;

use mocolink_config::Preferences;
use mocolink_core::Session;

use crate::cli::Command;
use crate::error::CliError;

/// Dispatch a command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    session: &Session,
    prefs: Preferences,
) -> Result<(), CliError> {
    match cmd {
        Command::Adapters => adapters::handle(session).await,
        Command::Pair(args) => pair::handle(session, args, prefs).await,
        Command::Monitor(args) => monitor::handle(session, args, prefs).await,
    }
}

/// Run an adapter scan and wait for the result to land in the store.
///
/// `scan_link_adapters` hands the listing to the apply task, so the
/// store updates a beat after the HTTP call returns. Waiting on the
/// adapter watch keeps the subsequent snapshot read consistent.
pub(crate) async fn scan_adapters_settled(session: &Session) -> Result<usize, CliError> {
    let mut adapters_rx = session.store().subscribe_adapters();
    adapters_rx.mark_unchanged();

    let listed = session.scan_link_adapters().await?;
    if listed > 0 {
        // No change fires when every listed adapter was invalid.
        let _ = tokio::time::timeout(Duration::from_secs(2), adapters_rx.changed()).await;
    }
    Ok(listed)
}
