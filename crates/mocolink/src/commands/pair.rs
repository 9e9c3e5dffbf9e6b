//! Pairing handler: scan for systems, then bundle or attach.

use std::time::Duration;

use tabled::Tabled;

use mocolink_config::Preferences;
use mocolink_core::{MotionControlSystem, PairingGroup, Session, SessionPhase};

use crate::cli::PairArgs;
use crate::error::CliError;
use crate::output;

/// How long a bundle gets to come up before the command gives up.
const PAIRING_WAIT: Duration = Duration::from_secs(30);

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SystemRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Setup")]
    setup: String,
    #[tabled(rename = "RSSI")]
    rssi: i32,
    #[tabled(rename = "Group")]
    group: String,
}

impl From<&MotionControlSystem> for SystemRow {
    fn from(s: &MotionControlSystem) -> Self {
        Self {
            mac: s.mac.clone(),
            kind: format!("{:?}", s.kind),
            setup: s.setup.clone(),
            rssi: s.rssi,
            group: if s.is_grouped() {
                s.group_id.to_string()
            } else {
                "-".into()
            },
        }
    }
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Group")]
    id: u16,
    #[tabled(rename = "Master")]
    master: String,
    #[tabled(rename = "Members")]
    members: String,
}

impl From<&PairingGroup> for GroupRow {
    fn from(g: &PairingGroup) -> Self {
        Self {
            id: g.group_id,
            master: g.master.clone().unwrap_or_else(|| "-".into()),
            members: g.members.join(", "),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: PairArgs,
    mut prefs: Preferences,
) -> Result<(), CliError> {
    super::scan_adapters_settled(session).await?;
    if session.store().adapter(&args.adapter).is_none() {
        return Err(CliError::AdapterNotFound { id: args.adapter });
    }

    session.start_pairing_scan(&args.adapter).await?;
    tokio::time::sleep(Duration::from_secs(args.scan_secs)).await;

    let systems = session.store().systems();
    let rows: Vec<SystemRow> = systems.iter().map(|s| SystemRow::from(s.as_ref())).collect();
    output::print_table(rows, "No motion-control systems in range");

    let groups = session.store().groups();
    if !groups.is_empty() {
        let rows: Vec<GroupRow> = groups.iter().map(|g| GroupRow::from(g.as_ref())).collect();
        output::print_table(rows, "");
    }

    if let Some(group_id) = args.group {
        session.attach_to_bundle(group_id).await?;
    } else if !args.macs.is_empty() {
        session.create_bundle(&args.macs).await?;
    } else {
        // Report-only scan; nothing to bundle.
        return Ok(());
    }

    wait_for_interface(session).await?;
    println!("Bundle active through adapter {}", args.adapter);

    prefs.last_adapter = Some(args.adapter.clone());
    mocolink_config::save_preferences(&prefs)?;
    Ok(())
}

/// Wait for the pairing to resolve. A failed pairing drops the
/// session back to the adapter phase, so both exits are watched.
async fn wait_for_interface(session: &Session) -> Result<(), CliError> {
    let mut phase = session.subscribe_phase();
    let resolved = phase.wait_for(|p| *p != SessionPhase::PairMotionControlSystems);

    let outcome = match tokio::time::timeout(PAIRING_WAIT, resolved).await {
        Ok(Ok(p)) if *p == SessionPhase::ShowMotionControlInterface => Ok(()),
        Ok(Ok(_)) => Err(CliError::Rejected {
            message: "pairing failed; the systems never formed a bundle".into(),
        }),
        Ok(Err(_)) => Err(CliError::Protocol {
            message: "session stopped during pairing".into(),
        }),
        Err(_) => Err(CliError::PairingTimeout {
            seconds: PAIRING_WAIT.as_secs(),
        }),
    };
    outcome
}
