//! Adapter discovery handler.

use tabled::Tabled;

use mocolink_core::{ConnectionType, LinkAdapter, Session};

use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AdapterRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    link_type: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Connection")]
    connection: String,
    #[tabled(rename = "Paired")]
    paired: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
}

impl From<&LinkAdapter> for AdapterRow {
    fn from(a: &LinkAdapter) -> Self {
        Self {
            id: a.link_id.clone(),
            link_type: a.link_type.clone(),
            port: a.port_name.clone(),
            connection: match a.link_connection_type {
                ConnectionType::None => "none",
                ConnectionType::Canbus => "canbus",
                ConnectionType::Wireless => "wireless",
            }
            .into(),
            paired: if a.is_pairing_done { "yes" } else { "no" }.into(),
            firmware: firmware_summary(a).into(),
        }
    }
}

fn firmware_summary(a: &LinkAdapter) -> &'static str {
    if a.is_firmware_corrupted == Some(true) {
        "corrupted"
    } else if a.is_device_firmware_update_required || a.is_radio_firmware_update_required {
        "update required"
    } else if a.is_device_firmware_update_available || a.is_radio_firmware_update_available {
        "update available"
    } else {
        "ok"
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session) -> Result<(), CliError> {
    let listed = super::scan_adapters_settled(session).await?;

    let adapters = session.store().adapters();
    let rows: Vec<AdapterRow> = adapters.iter().map(|a| AdapterRow::from(a.as_ref())).collect();
    let shown = rows.len();
    output::print_table(rows, "No link adapters found");

    if listed > shown {
        eprintln!("{} invalid adapter(s) hidden", listed - shown);
    }
    Ok(())
}
