//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use mocolink_core::CoreError;

/// Exit codes for process termination.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the link adapter service")]
    #[diagnostic(
        code(mocolink::connection_failed),
        help(
            "Check that the service is running on the configured host.\n\
             Override the endpoint with --host / --port or MOCOLINK_HOSTNAME / MOCOLINK_PORT."
        )
    )]
    ConnectionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Service rejections ───────────────────────────────────────────

    #[error("The service rejected the command: {message}")]
    #[diagnostic(code(mocolink::rejected))]
    Rejected { message: String },

    #[error("Unexpected service response: {message}")]
    #[diagnostic(code(mocolink::protocol))]
    Protocol { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("Link adapter '{id}' not found")]
    #[diagnostic(
        code(mocolink::adapter_not_found),
        help("Run: mocolink adapters to see what the service host detected")
    )]
    AdapterNotFound { id: String },

    #[error("No link adapter remembered from a previous run")]
    #[diagnostic(
        code(mocolink::no_adapter),
        help("Pass --adapter, or pair first with: mocolink pair --adapter <id> --macs <macs>")
    )]
    NoAdapterRemembered,

    #[error("Pairing group {id} not found")]
    #[diagnostic(
        code(mocolink::group_not_found),
        help("Run: mocolink pair --adapter <id> to scan for groups")
    )]
    GroupNotFound { id: u16 },

    #[error("Pairing group {id} has no master device to attach to")]
    #[diagnostic(code(mocolink::no_group_master))]
    NoGroupMaster { id: u16 },

    // ── Validation ───────────────────────────────────────────────────

    #[error("No systems selected for pairing")]
    #[diagnostic(
        code(mocolink::empty_selection),
        help("Pass at least one mac with --macs; the first one becomes the group master.")
    )]
    EmptySelection,

    #[error("No link adapter is connected")]
    #[diagnostic(code(mocolink::not_connected))]
    NotConnected,

    // ── Pairing ──────────────────────────────────────────────────────

    #[error("Pairing did not complete within {seconds}s")]
    #[diagnostic(
        code(mocolink::pairing_timeout),
        help(
            "The selected systems never formed a bundle.\n\
             Check that they are powered on and in radio range, then retry."
        )
    )]
    PairingTimeout { seconds: u64 },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(mocolink::config))]
    Config(#[from] mocolink_config::ConfigError),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AdapterNotFound { .. }
            | Self::GroupNotFound { .. }
            | Self::NoGroupMaster { .. } => exit_code::NOT_FOUND,
            Self::EmptySelection | Self::NoAdapterRemembered => exit_code::USAGE,
            Self::PairingTimeout { .. } => exit_code::TIMEOUT,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(api) => match api {
                mocolink_core::api::Error::Transport(e) => CliError::ConnectionFailed {
                    source: Box::new(e),
                },
                mocolink_core::api::Error::Api { message } => CliError::Rejected { message },
                other => CliError::Protocol {
                    message: other.to_string(),
                },
            },
            CoreError::NotConnected => CliError::NotConnected,
            CoreError::UnknownGroup(id) => CliError::GroupNotFound { id },
            CoreError::NoGroupMaster(id) => CliError::NoGroupMaster { id },
            CoreError::EmptySelection => CliError::EmptySelection,
        }
    }
}
