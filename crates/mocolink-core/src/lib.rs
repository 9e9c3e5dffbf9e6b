//! Reactive control layer between `mocolink-api` and consumers.
//!
//! This crate owns the connection lifecycle, polling engine, and
//! domain model for driving motion-control bundles through a link
//! adapter service:
//!
//! - **[`Session`]** — Central facade. [`start()`](Session::start)
//!   spawns the apply task; the pairing operations
//!   (`start_pairing_scan`, `create_bundle`, `attach_to_bundle`)
//!   walk the session through its three phases, each phase driven by
//!   exactly one background poll loop.
//!
//! - **[`LinkStore`]** — Reactive storage built on `DashMap` +
//!   `tokio::sync::watch`: discovered adapters, scanned systems,
//!   pairing groups, the ungrouped pool, and the merged
//!   [`MotionControlStatus`]. All mutation funnels through the
//!   session's single apply task.
//!
//! - **Domain model** ([`model`]) — [`AxisStatus`] with transient
//!   joystick intent, [`PairingGroup`] with the setup-string master
//!   rule, and the idempotent status merge.

pub mod config;
pub mod error;
pub mod model;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use mocolink_api as api;

pub use config::SessionConfig;
pub use error::CoreError;
pub use session::{Session, SessionPhase};
pub use store::{LinkStore, Snapshot};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AxisId, AxisStatus, ConnectionType, DegreeOfFreedom, DeviceKind, LinkAdapter,
    MotionControlStatus, MotionControlSystem, MotionState, PairState, PairingGroup, PairingStatus,
    PeriodicStatus, KEYPOSE_SLOT_COUNT, NO_GROUP,
};
