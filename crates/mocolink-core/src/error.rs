use thiserror::Error;

/// Errors surfaced by session operations.
///
/// Poll-loop failures never surface here; a failed poll leaves the
/// model untouched until the next tick and is only logged.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Api(#[from] mocolink_api::Error),

    /// An operation that needs a connected adapter was called before
    /// one was selected.
    #[error("no link adapter is connected")]
    NotConnected,

    /// Bundle attach referenced a group id the scan has not reported.
    #[error("unknown pairing group {0}")]
    UnknownGroup(u16),

    /// Bundle attach was requested for a group that has no master.
    #[error("pairing group {0} has no master device")]
    NoGroupMaster(u16),

    /// Bundle creation was requested with no systems selected.
    #[error("no systems selected for pairing")]
    EmptySelection,
}
