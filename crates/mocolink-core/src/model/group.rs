// Pairing groups and the setup-string vocabulary.

/// `setup` values that mark a system as its group's master. The
/// string encodes the combined capabilities of the bundle; only the
/// master carries one of these.
pub const MASTER_INDICATORS: [&str; 20] = [
    "panOnly",
    "tiltOnly",
    "panTilt",
    "slideOnly",
    "dollyOnly",
    "panAndSlide",
    "tiltAndSlide",
    "panAndDolly",
    "tiltAndDolly",
    "panTiltAndSlide",
    "panTiltAndDolly",
    "panAndJib",
    "tiltAndJib",
    "panTiltAndJib",
    "jibOnly",
    "panAndJibPlus",
    "tiltAndJibPlus",
    "panTiltAndJibPlus",
    "jibPlusOnly",
    "followFocusOnly",
];

/// `setup` value of a non-master group member.
pub const MEMBER_INDICATORS: [&str; 1] = ["groupMember"];

/// `setup` values of systems not paired into any group.
pub const UNPAIRED_INDICATORS: [&str; 2] = ["none", "possibleCanbusMaster"];

/// Whether a `setup` string marks the group master.
pub fn is_master_setup(setup: &str) -> bool {
    MASTER_INDICATORS.contains(&setup)
}

/// A pairing group of motion-control systems, keyed by the firmware's
/// group id. Members are mac addresses in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingGroup {
    pub group_id: u16,
    pub members: Vec<String>,
    /// Mac of the group master, if one has been seen. Removing the
    /// master clears this; no other member is promoted.
    pub master: Option<String>,
}

impl PairingGroup {
    pub fn new(group_id: u16) -> Self {
        Self {
            group_id,
            members: Vec::new(),
            master: None,
        }
    }

    /// Add a member; a no-op for macs already present. The master is
    /// re-evaluated from `setup` either way, so a member whose setup
    /// flips to a master indicator takes over the slot.
    pub fn add_member(&mut self, mac: &str, setup: &str) {
        if !self.members.iter().any(|m| m == mac) {
            self.members.push(mac.to_owned());
        }
        if is_master_setup(setup) {
            self.master = Some(mac.to_owned());
        }
    }

    /// Remove a member by mac. If it was the master, the slot is
    /// cleared without promotion.
    pub fn remove_member(&mut self, mac: &str) {
        self.members.retain(|m| m != mac);
        if self.master.as_deref() == Some(mac) {
            self.master = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
