//! Live status monitor for an already-paired adapter.

use tokio_stream::StreamExt;

use mocolink_config::Preferences;
use mocolink_core::{MotionControlStatus, Session};

use crate::cli::MonitorArgs;
use crate::error::CliError;

pub async fn handle(
    session: &Session,
    args: MonitorArgs,
    prefs: Preferences,
) -> Result<(), CliError> {
    let adapter_id = args
        .adapter
        .or(prefs.last_adapter)
        .ok_or(CliError::NoAdapterRemembered)?;

    session.attach_connected_adapter(&adapter_id);
    println!("Monitoring bundle through adapter {adapter_id}; press Ctrl-C to stop");

    let mut statuses = session.status_stream();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            status = statuses.next() => {
                let Some(status) = status else { break };
                print_status(&status);
            }
        }
    }
    Ok(())
}

/// One line per published status: motion state, loop progress, and a
/// position readout per axis. Uncalibrated axes are flagged.
fn print_status(status: &MotionControlStatus) {
    if status.axes.is_empty() {
        return;
    }

    let mut axes: Vec<_> = status.axes.values().collect();
    axes.sort_by_key(|a| a.axis.as_str());

    let readout = axes
        .iter()
        .map(|a| {
            let flag = if a.calibrated { "" } else { "?" };
            format!("{}={:.3}{} ({:.0}%)", a.axis, a.position, flag, a.battery_level * 100.0)
        })
        .collect::<Vec<_>>()
        .join("  ");

    println!(
        "{:?} progress={:.2} {readout}",
        status.state, status.keypose_motion_progress
    );
}
