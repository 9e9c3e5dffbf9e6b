//! Wire types for the link adapter service.
//!
//! Field names mirror the JSON keys the service emits, including the
//! vendor's `linkPairigingActive` typo. Keep them exactly as the
//! firmware sends them.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// No-group sentinel the firmware reports for ungrouped systems.
pub const NO_GROUP: u16 = 65535;

fn bool_from_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(u8::deserialize(deserializer)? == 1)
}

/// How a link adapter reaches its motion-control system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionType {
    None,
    Canbus,
    Wireless,
}

/// A link adapter as reported by the `linkStatus` command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkAdapter {
    pub is_device_firmware_update_available: bool,
    pub is_device_firmware_update_required: bool,
    #[serde(default)]
    pub is_firmware_corrupted: Option<bool>,
    pub is_radio_firmware_update_available: bool,
    pub is_radio_firmware_update_required: bool,
    pub link_connection_type: ConnectionType,
    pub initial_found_epoch: f64,
    pub is_pairing_done: bool,
    pub is_valid: bool,
    #[serde(rename = "linkID")]
    pub link_id: String,
    pub link_type: String,
    pub port_name: String,
}

/// Motion-control system entry from a wireless pairing scan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionControlSystem {
    pub group_id: u16,
    // Vendor typo, present on the wire as-is.
    #[serde(rename = "linkPairigingActive", default)]
    pub link_pairing_active: bool,
    // The firmware encodes this one as 0/1 rather than a JSON bool.
    #[serde(deserialize_with = "bool_from_int")]
    pub is_tilted: bool,
    pub mac: String,
    pub rssi: i32,
    pub is_device_firmware_update_available: bool,
    pub is_radio_firmware_update_available: bool,
    pub setup: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
}

impl MotionControlSystem {
    /// Whether this system currently belongs to a group.
    pub fn is_grouped(&self) -> bool {
        self.group_id != NO_GROUP
    }
}

/// Wireless pairing state reported while a bundle is forming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PairState {
    Idle,
    Connecting,
    ConnectionOk,
    Problem,
}

/// Response payload of the `wirelessPairingStatus` command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingStatus {
    #[serde(rename = "wirelessPairState")]
    pub pair_state: PairState,
    #[serde(default)]
    pub last_pair_error: Option<String>,
}

/// Controllable axis identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AxisId {
    HeadPan,
    HeadTilt,
    Slide,
    Focus,
    JibPlusPan,
    JibPlusTilt,
}

impl AxisId {
    /// The wire name used as a parameter key in move commands and as
    /// the key of the periodic status `readings` map.
    pub fn as_str(self) -> &'static str {
        match self {
            AxisId::HeadPan => "headPan",
            AxisId::HeadTilt => "headTilt",
            AxisId::Slide => "slide",
            AxisId::Focus => "focus",
            AxisId::JibPlusPan => "jibPlusPan",
            AxisId::JibPlusTilt => "jibPlusTilt",
        }
    }
}

impl std::fmt::Display for AxisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hardware device models the service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceKind {
    SlideModule,
    SlideModuleV3,
    SliderOnePro,
    SliderOne,
    DollyPlus,
    DollyOne,
    DollyPlusPro,
    PanPro,
    HeadOne,
    HeadPlus,
    HeadPlusPro,
    HeadPlusV2,
    HeadPlusProV2,
    FocusPlusPro,
    JibOne,
    #[serde(other)]
    Unknown,
}

impl DeviceKind {
    /// Slider One and the dolly family have no calibration routine.
    pub fn can_calibrate(self) -> bool {
        !matches!(
            self,
            DeviceKind::SliderOne
                | DeviceKind::SliderOnePro
                | DeviceKind::DollyOne
                | DeviceKind::DollyPlus
                | DeviceKind::DollyPlusPro
        )
    }
}

/// Motion activity reported in the periodic status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MotionState {
    Idle,
    KeyposeMove,
    RealTimeMove,
    FocusCalibration,
    SliderCalibration,
    JoystickMove,
    #[serde(other)]
    UnsupportedActivity,
}

/// One `(axis, device)` pairing from the periodic status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedAxis {
    pub axis: AxisId,
    pub device: DeviceKind,
}

/// Per-device battery entry from the periodic status.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub battery_level: f64,
    #[serde(default)]
    pub is_tilted: Option<bool>,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
}

/// Full snapshot from `GET /v1/bundle/{id}/status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicStatus {
    #[serde(default)]
    pub calibrated_axes: Vec<SupportedAxis>,
    #[serde(default)]
    pub device_info: Vec<DeviceInfo>,
    #[serde(rename = "deviceInfoEverythingReady")]
    pub device_info_ready: bool,
    pub keypose_loop_active: bool,
    pub keypose_motion_aim_index: i32,
    pub keypose_motion_start_index: i32,
    #[serde(default)]
    pub keypose_slots_filled: Vec<bool>,
    pub planned_motion_progress: f64,
    pub planned_motion_duration: f64,
    #[serde(default)]
    pub readings: HashMap<String, f64>,
    #[serde(default)]
    pub real_time_supported_axes: Vec<SupportedAxis>,
    pub state: MotionState,
    #[serde(default)]
    pub supported_axes: Vec<SupportedAxis>,
    pub timestamp_device: i64,
    pub timestamp_epoch: i64,
}

impl PeriodicStatus {
    /// Device driving the given axis, if the bundle supports it.
    pub fn device_for(&self, axis: AxisId) -> Option<DeviceKind> {
        self.supported_axes
            .iter()
            .find(|sa| sa.axis == axis)
            .map(|sa| sa.device)
    }

    /// Last position reading for the given axis.
    pub fn position_for(&self, axis: AxisId) -> Option<f64> {
        self.readings.get(axis.as_str()).copied()
    }

    /// Whether the axis is calibrated. Only meaningful once device
    /// info is fully populated; reports `false` before that.
    pub fn calibrated_for(&self, axis: AxisId) -> bool {
        self.device_info_ready && self.calibrated_axes.iter().any(|sa| sa.axis == axis)
    }

    /// Battery level of the device driving the given axis. The device
    /// info list is parallel to `supported_axes`, so the axis position
    /// in that list picks the battery entry.
    pub fn battery_for(&self, axis: AxisId) -> Option<f64> {
        if !self.device_info_ready {
            return None;
        }
        let index = self.supported_axes.iter().position(|sa| sa.axis == axis)?;
        self.device_info.get(index).map(|info| info.battery_level)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    pub(crate) const STATUS_SAMPLE: &str = r#"{
        "calibratedAxes": [{"axis": "slide", "device": "sliderOnePro"}],
        "deviceInfo": [
            {"batteryLevel": 0.82, "type": "headPlusPro"},
            {"batteryLevel": 0.55, "isTilted": true, "type": "sliderOnePro"}
        ],
        "deviceInfoEverythingReady": true,
        "keyposeLoopActive": false,
        "keyposeMotionAimIndex": -1,
        "keyposeMotionStartIndex": -1,
        "keyposeSlotsFilled": [true, false, false, false, false, false],
        "plannedMotionProgress": 0.0,
        "plannedMotionDuration": 0.0,
        "readings": {"headPan": 12.5, "headTilt": -3.0, "slide": 140.0},
        "realTimeSupportedAxes": [
            {"axis": "headPan", "device": "headPlusPro"},
            {"axis": "slide", "device": "sliderOnePro"}
        ],
        "state": "idle",
        "supportedAxes": [
            {"axis": "headPan", "device": "headPlusPro"},
            {"axis": "slide", "device": "sliderOnePro"}
        ],
        "timestampDevice": 3631580,
        "timestampEpoch": 1700000000431
    }"#;

    #[test]
    fn periodic_status_decodes() {
        let status: PeriodicStatus = serde_json::from_str(STATUS_SAMPLE).unwrap();
        assert_eq!(status.state, MotionState::Idle);
        assert_eq!(status.device_for(AxisId::HeadPan), Some(DeviceKind::HeadPlusPro));
        assert_eq!(status.position_for(AxisId::Slide), Some(140.0));
        assert!(status.calibrated_for(AxisId::Slide));
        assert!(!status.calibrated_for(AxisId::HeadPan));
        assert_eq!(status.battery_for(AxisId::Slide), Some(0.55));
        assert_eq!(status.battery_for(AxisId::Focus), None);
    }

    #[test]
    fn accessors_gate_on_device_info_ready() {
        let mut status: PeriodicStatus = serde_json::from_str(STATUS_SAMPLE).unwrap();
        status.device_info_ready = false;
        assert!(!status.calibrated_for(AxisId::Slide));
        assert_eq!(status.battery_for(AxisId::Slide), None);
        // Readings stay available regardless.
        assert_eq!(status.position_for(AxisId::Slide), Some(140.0));
    }

    #[test]
    fn scan_result_keeps_vendor_typo_key() {
        let json = r#"{
            "groupId": 65535,
            "linkPairigingActive": true,
            "isTilted": 0,
            "mac": "a4:cf:12:00:00:01",
            "rssi": -42,
            "isDeviceFirmwareUpdateAvailable": false,
            "isRadioFirmwareUpdateAvailable": false,
            "setup": "panTilt",
            "type": "headPlusPro"
        }"#;
        let mcs: MotionControlSystem = serde_json::from_str(json).unwrap();
        assert!(mcs.link_pairing_active);
        assert!(!mcs.is_tilted);
        assert!(!mcs.is_grouped());
    }

    #[test]
    fn unknown_device_kind_falls_back() {
        let kind: DeviceKind = serde_json::from_str(r#""flyingCarMount""#).unwrap();
        assert_eq!(kind, DeviceKind::Unknown);
        assert!(kind.can_calibrate());
    }

    #[test]
    fn unknown_motion_state_maps_to_unsupported() {
        let state: MotionState = serde_json::from_str(r#""quantumDrift""#).unwrap();
        assert_eq!(state, MotionState::UnsupportedActivity);
    }
}
