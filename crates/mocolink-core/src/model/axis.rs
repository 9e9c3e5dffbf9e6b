// Per-axis live state.

use mocolink_api::types::{AxisId, DeviceKind, PeriodicStatus};

/// The plane a joystick axis maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DegreeOfFreedom {
    Horizontal,
    Vertical,
}

/// Live state of one controllable axis.
///
/// The three `should_move` / `is_last_move` / `move_value` fields are
/// transient joystick intent. They are owned by the local joystick
/// logic and are never overwritten by status snapshots; a merge only
/// touches the hardware-reported fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisStatus {
    pub axis: AxisId,
    pub device: DeviceKind,
    pub position: f64,
    pub calibrated: bool,
    pub battery_level: f64,

    pub should_move: bool,
    pub is_last_move: bool,
    pub move_value: f64,
}

impl AxisStatus {
    /// Build an axis entry from a status snapshot.
    pub fn from_snapshot(snapshot: &PeriodicStatus, axis: AxisId) -> Self {
        Self {
            axis,
            device: snapshot.device_for(axis).unwrap_or(DeviceKind::Unknown),
            position: snapshot.position_for(axis).unwrap_or(0.0),
            calibrated: snapshot.calibrated_for(axis),
            battery_level: snapshot.battery_for(axis).unwrap_or(0.0),
            should_move: false,
            is_last_move: false,
            move_value: 0.0,
        }
    }

    /// Update the hardware-reported fields from a snapshot, leaving
    /// the joystick intent fields alone. Returns whether anything
    /// changed.
    pub fn refresh(&mut self, snapshot: &PeriodicStatus) -> bool {
        let device = snapshot.device_for(self.axis).unwrap_or(DeviceKind::Unknown);
        let position = snapshot.position_for(self.axis).unwrap_or(0.0);
        let calibrated = snapshot.calibrated_for(self.axis);
        let battery_level = snapshot.battery_for(self.axis).unwrap_or(0.0);

        let mut changed = false;
        if self.device != device {
            self.device = device;
            changed = true;
        }
        if (self.position - position).abs() > f64::EPSILON {
            self.position = position;
            changed = true;
        }
        if self.calibrated != calibrated {
            self.calibrated = calibrated;
            changed = true;
        }
        if (self.battery_level - battery_level).abs() > f64::EPSILON {
            self.battery_level = battery_level;
            changed = true;
        }
        changed
    }

    /// Whether the axis still needs a calibration run before keypose
    /// or real-time moves make sense.
    pub fn needs_calibration(&self) -> bool {
        !self.calibrated && self.device.can_calibrate()
    }
}
