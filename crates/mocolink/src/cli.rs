// CLI argument definitions.

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "mocolink",
    version,
    about = "Drive motion-control camera hardware through a link adapter service"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Host running the link adapter service (overrides preferences).
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Service port (overrides preferences).
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List link adapters attached to the service host.
    Adapters,

    /// Scan for motion-control systems and optionally form a bundle.
    Pair(PairArgs),

    /// Attach to an already-paired adapter and stream live status.
    Monitor(MonitorArgs),
}

#[derive(Debug, Args)]
pub struct PairArgs {
    /// Adapter to pair through.
    #[arg(long)]
    pub adapter: String,

    /// How long to scan before reporting, in seconds.
    #[arg(long, default_value_t = 3)]
    pub scan_secs: u64,

    /// Macs to bundle; the first one becomes the group master.
    /// Omit to only report scan results.
    #[arg(long, value_delimiter = ',')]
    pub macs: Vec<String>,

    /// Attach to an existing pairing group instead of bundling.
    #[arg(long, conflicts_with = "macs")]
    pub group: Option<u16>,
}

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Adapter to attach to; falls back to the one remembered from
    /// the last successful pairing.
    #[arg(long)]
    pub adapter: Option<String>,
}
