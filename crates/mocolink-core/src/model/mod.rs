// Domain model: axes, pairing groups, and merged motion-control state.

pub mod axis;
pub mod group;
pub mod status;

pub use axis::{AxisStatus, DegreeOfFreedom};
pub use group::{
    is_master_setup, PairingGroup, MASTER_INDICATORS, MEMBER_INDICATORS, UNPAIRED_INDICATORS,
};
pub use status::{MotionControlStatus, KEYPOSE_SLOT_COUNT};

// Wire-level types are re-exported so consumers rarely need to depend
// on mocolink-api directly.
pub use mocolink_api::types::{
    AxisId, ConnectionType, DeviceKind, LinkAdapter, MotionControlSystem, MotionState, PairState,
    PairingStatus, PeriodicStatus, NO_GROUP,
};
