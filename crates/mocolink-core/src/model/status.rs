// Merged motion-control state for the active bundle.

use std::collections::HashMap;

use mocolink_api::types::{AxisId, MotionState, PeriodicStatus};

use super::axis::{AxisStatus, DegreeOfFreedom};

/// Number of keypose slots a bundle exposes.
pub const KEYPOSE_SLOT_COUNT: usize = 6;

/// Accumulated motion-control state, built up by merging periodic
/// status snapshots.
///
/// The merge is idempotent: applying the same snapshot twice changes
/// nothing the second time. Snapshots taken before the bundle has
/// finished enumerating its devices (`deviceInfoEverythingReady`
/// false) are discarded wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionControlStatus {
    pub axes: HashMap<AxisId, AxisStatus>,
    pub keypose_loop_active: bool,
    pub keypose_target_index: i32,
    pub keypose_start_index: i32,
    pub keypose_motion_progress: f64,
    pub keypose_motion_duration: f64,
    /// Per-slot filled flag; `None` until the firmware has reported
    /// that slot at least once.
    pub keypose_slots_filled: [Option<bool>; KEYPOSE_SLOT_COUNT],
    pub state: MotionState,
}

impl Default for MotionControlStatus {
    fn default() -> Self {
        Self {
            axes: HashMap::new(),
            keypose_loop_active: false,
            keypose_target_index: 0,
            keypose_start_index: -1,
            keypose_motion_progress: 1.0,
            keypose_motion_duration: 0.0,
            keypose_slots_filled: [None; KEYPOSE_SLOT_COUNT],
            state: MotionState::Idle,
        }
    }
}

macro_rules! assign_if_changed {
    ($changed:ident, $dst:expr, $src:expr) => {
        if $dst != $src {
            $dst = $src;
            $changed = true;
        }
    };
}

impl MotionControlStatus {
    /// Merge a periodic status snapshot. Returns whether anything
    /// changed.
    ///
    /// Snapshots with `device_info_ready == false` are ignored
    /// entirely; their readings reference a device list that is still
    /// being enumerated.
    pub fn merge(&mut self, snapshot: &PeriodicStatus) -> bool {
        if !snapshot.device_info_ready {
            return false;
        }

        let mut changed = false;
        assign_if_changed!(changed, self.keypose_loop_active, snapshot.keypose_loop_active);
        assign_if_changed!(changed, self.keypose_target_index, snapshot.keypose_motion_aim_index);
        assign_if_changed!(changed, self.keypose_start_index, snapshot.keypose_motion_start_index);
        assign_if_changed!(changed, self.keypose_motion_progress, snapshot.planned_motion_progress);
        assign_if_changed!(changed, self.keypose_motion_duration, snapshot.planned_motion_duration);
        assign_if_changed!(changed, self.state, snapshot.state);

        for slot in 0..KEYPOSE_SLOT_COUNT {
            let incoming = snapshot.keypose_slots_filled.get(slot).copied();
            assign_if_changed!(changed, self.keypose_slots_filled[slot], incoming);
        }

        // Upsert supported axes in place so joystick intent survives,
        // then drop axes the bundle no longer reports.
        for identifier in &snapshot.supported_axes {
            match self.axes.entry(identifier.axis) {
                std::collections::hash_map::Entry::Occupied(mut entry) => {
                    changed |= entry.get_mut().refresh(snapshot);
                }
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(AxisStatus::from_snapshot(snapshot, identifier.axis));
                    changed = true;
                }
            }
        }
        let before = self.axes.len();
        self.axes
            .retain(|axis, _| snapshot.supported_axes.iter().any(|sa| sa.axis == *axis));
        changed |= self.axes.len() != before;

        changed
    }

    // ── Derived queries ─────────────────────────────────────────────

    pub fn has_pan(&self) -> bool {
        self.axes.contains_key(&AxisId::HeadPan) || self.axes.contains_key(&AxisId::JibPlusPan)
    }

    pub fn has_tilt(&self) -> bool {
        self.axes.contains_key(&AxisId::HeadTilt) || self.axes.contains_key(&AxisId::JibPlusTilt)
    }

    pub fn has_slide(&self) -> bool {
        self.axes.contains_key(&AxisId::Slide)
    }

    pub fn has_focus(&self) -> bool {
        self.axes.contains_key(&AxisId::Focus)
    }

    /// Pan/tilt axes keyed by the joystick plane they map onto. Only
    /// the head axes participate; jib axes are reported in `axes` but
    /// never drive a joystick plane.
    pub fn pan_tilt_objects(&self) -> HashMap<DegreeOfFreedom, &AxisStatus> {
        let mut result = HashMap::new();
        if self.has_pan() {
            if let Some(status) = self.axes.get(&AxisId::HeadPan) {
                result.insert(DegreeOfFreedom::Horizontal, status);
            }
        }
        if self.has_tilt() {
            if let Some(status) = self.axes.get(&AxisId::HeadTilt) {
                result.insert(DegreeOfFreedom::Vertical, status);
            }
        }
        result
    }

    /// The slide axis, keyed by its single horizontal plane.
    pub fn slide_objects(&self) -> HashMap<DegreeOfFreedom, &AxisStatus> {
        let mut result = HashMap::new();
        if let Some(status) = self.axes.get(&AxisId::Slide) {
            result.insert(DegreeOfFreedom::Horizontal, status);
        }
        result
    }

    /// Axes currently driven by a joystick.
    pub fn joystick_controlled(&self) -> Vec<&AxisStatus> {
        self.axes.values().filter(|a| a.should_move).collect()
    }

    // ── Joystick intent ─────────────────────────────────────────────

    /// Record joystick movement for an axis.
    pub fn joystick_begin(&mut self, axis: AxisId, value: f64) -> bool {
        let Some(status) = self.axes.get_mut(&axis) else {
            return false;
        };
        status.should_move = true;
        status.is_last_move = false;
        status.move_value = value;
        true
    }

    /// Record joystick release: one final stop command goes out on
    /// the next tick, then the axis goes quiet.
    pub fn joystick_end(&mut self, axis: AxisId) -> bool {
        let Some(status) = self.axes.get_mut(&axis) else {
            return false;
        };
        status.is_last_move = true;
        status.move_value = 0.0;
        true
    }

    /// Collect the moves to send this tick and retire finished axes.
    ///
    /// Every axis with `should_move` contributes its current
    /// `move_value`. Axes flagged `is_last_move` get included one
    /// last time and have both flags cleared, so the stop value is
    /// sent exactly once.
    pub fn take_joystick_moves(&mut self) -> Vec<(AxisId, f64)> {
        let mut moves = Vec::new();
        for status in self.axes.values_mut() {
            if !status.should_move {
                continue;
            }
            moves.push((status.axis, status.move_value));
            if status.is_last_move {
                status.should_move = false;
                status.is_last_move = false;
            }
        }
        moves
    }
}
