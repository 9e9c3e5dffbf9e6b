// Link adapter HTTP client
//
// Wraps `reqwest::Client` with the service's URL layout, command body
// construction, and envelope unwrapping. Every command is a POST of
// `{"command": name, ...params}` to one of three scopes: `/v1/device`
// for adapter discovery, `/v1/link/{id}` for pairing, and
// `/v1/bundle/{id}` for motion control. The one exception is the
// periodic status snapshot, a plain GET on `/v1/bundle/{id}/status`.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::debug;
use url::Url;

use crate::envelope::Envelope;
use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{AxisId, LinkAdapter, MotionControlSystem, PairingStatus, PeriodicStatus};

/// Raw HTTP client for the link adapter service.
///
/// Methods return unwrapped `data` payloads; the `{result, message,
/// data}` envelope is stripped before the caller sees it, and a
/// present `message` surfaces as [`Error::Api`] regardless of what
/// `result` says.
pub struct LinkClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LinkClient {
    /// Create a client talking to the service at `host:port`.
    pub fn new(host: &str, port: u16, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&format!("http://{host}:{port}/v1/"))?;
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The service base URL (ends in `/v1/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn device_url(&self) -> Result<Url, Error> {
        Ok(self.base_url.join("device")?)
    }

    fn link_url(&self, adapter_id: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("link/{adapter_id}"))?)
    }

    fn bundle_url(&self, adapter_id: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("bundle/{adapter_id}"))?)
    }

    fn bundle_status_url(&self, adapter_id: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("bundle/{adapter_id}/status"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// POST a command body and unwrap the envelope, ignoring `data`.
    async fn post_ack(&self, url: Url, body: &Value) -> Result<(), Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        self.parse_envelope::<Value>(resp).await?;
        Ok(())
    }

    /// POST a command body and unwrap the envelope, requiring `data`.
    async fn post_data<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &Value,
        command: &'static str,
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        self.parse_envelope(resp)
            .await?
            .ok_or(Error::MissingData { command })
    }

    /// GET and unwrap the envelope, requiring `data`.
    async fn get_data<T: DeserializeOwned>(
        &self,
        url: Url,
        command: &'static str,
    ) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;

        self.parse_envelope(resp)
            .await?
            .ok_or(Error::MissingData { command })
    }

    /// Parse the `{result, message, data}` envelope. Success is the
    /// absence of `message`.
    async fn parse_envelope<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<Option<T>, Error> {
        let body = resp.text().await.map_err(Error::Transport)?;

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        envelope.into_result()
    }

    // ── Adapter discovery ────────────────────────────────────────────

    /// List link adapters attached to the service host.
    pub async fn detect_adapters(&self) -> Result<Vec<LinkAdapter>, Error> {
        let body = json!({"command": "linkStatus"});
        self.post_data(self.device_url()?, &body, "linkStatus").await
    }

    // ── Wireless pairing ─────────────────────────────────────────────

    /// Put the adapter into pairing scan mode.
    pub async fn pairing_scan_start(&self, adapter_id: &str) -> Result<(), Error> {
        let body = json!({"command": "wirelessPairingScanStart"});
        self.post_ack(self.link_url(adapter_id)?, &body).await
    }

    /// Fetch the systems found by an active pairing scan.
    pub async fn pairing_scan_results(
        &self,
        adapter_id: &str,
    ) -> Result<Vec<MotionControlSystem>, Error> {
        let body = json!({"command": "wirelessPairingScanResults"});
        self.post_data(self.link_url(adapter_id)?, &body, "wirelessPairingScanResults")
            .await
    }

    /// Bundle the given systems into a pairing group. The first mac in
    /// `mac_list` is forced as the group master.
    pub async fn create_bundle(&self, adapter_id: &str, mac_list: &[String]) -> Result<(), Error> {
        let body = json!({
            "command": "wirelessPairingCreateBundle",
            "deviceCount": mac_list.len(),
            "forceMasterDevice": mac_list.first(),
            "macList": mac_list,
        });
        self.post_ack(self.link_url(adapter_id)?, &body).await
    }

    /// Attach to an already-formed bundle via its master's mac.
    pub async fn attach_to_bundle(&self, adapter_id: &str, master_mac: &str) -> Result<(), Error> {
        let body = json!({
            "command": "wirelessPairingAttachToBundle",
            "mac": master_mac,
        });
        self.post_ack(self.link_url(adapter_id)?, &body).await
    }

    /// Poll the state of an in-flight pairing.
    pub async fn pairing_status(&self, adapter_id: &str) -> Result<PairingStatus, Error> {
        let body = json!({"command": "wirelessPairingStatus"});
        self.post_data(self.link_url(adapter_id)?, &body, "wirelessPairingStatus")
            .await
    }

    /// Tear down the adapter's current pairing.
    pub async fn disconnect(&self, adapter_id: &str) -> Result<(), Error> {
        let body = json!({"command": "disconnect"});
        self.post_ack(self.link_url(adapter_id)?, &body).await
    }

    // ── Bundle status ────────────────────────────────────────────────

    /// Fetch the periodic status snapshot for a paired bundle.
    pub async fn bundle_status(&self, adapter_id: &str) -> Result<PeriodicStatus, Error> {
        self.get_data(self.bundle_status_url(adapter_id)?, "status")
            .await
    }

    // ── Motion control ───────────────────────────────────────────────

    /// Send one joystick move carrying every actively-driven axis.
    ///
    /// Axis values are normalized speeds in `-1.0..=1.0`. An empty
    /// slice is a caller bug upstream; it still produces a valid (if
    /// pointless) command body.
    pub async fn joystick_move(
        &self,
        adapter_id: &str,
        moves: &[(AxisId, f64)],
    ) -> Result<(), Error> {
        let mut body = json!({"command": "joystickMove"});
        for (axis, value) in moves {
            body[axis.as_str()] = json!(value);
        }
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    /// Manual focus nudge, independent of the joystick path.
    pub async fn focus_move(&self, adapter_id: &str, value: f64) -> Result<(), Error> {
        let body = json!({"command": "focusManualMove", "focus": value});
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    /// Abort any planned or in-flight motion.
    pub async fn motion_abort(&self, adapter_id: &str) -> Result<(), Error> {
        let body = json!({"command": "motionAbort"});
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    /// Start the calibration routine for one axis.
    pub async fn calibrate(&self, adapter_id: &str, axis: AxisId) -> Result<(), Error> {
        let body = json!({"command": "calibrate", "axis": axis.as_str()});
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    /// Trigger the camera shutter.
    pub async fn shutter_trigger(&self, adapter_id: &str) -> Result<(), Error> {
        let body = json!({"command": "shutterTrigger"});
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    /// Move the given axes to absolute positions over a fixed duration.
    pub async fn real_time_move_fixed_duration(
        &self,
        adapter_id: &str,
        targets: &[(AxisId, f64)],
        duration: f64,
    ) -> Result<(), Error> {
        let mut body = json!({
            "command": "realTimeMoveFixedDuration",
            "duration": duration,
        });
        for (axis, position) in targets {
            body[axis.as_str()] = json!(position);
        }
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    // ── Keyposes ─────────────────────────────────────────────────────

    /// Store the bundle's current pose into a keypose slot.
    pub async fn keypose_store_current(&self, adapter_id: &str, index: u8) -> Result<(), Error> {
        let body = json!({"command": "keyposeStoreCurrentPose", "index": index});
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    /// Store explicit axis positions into a keypose slot.
    pub async fn keypose_store_numeric(
        &self,
        adapter_id: &str,
        index: u8,
        positions: &[(AxisId, f64)],
    ) -> Result<(), Error> {
        let mut body = json!({"command": "keyposeStoreWithNumericData", "index": index});
        for (axis, position) in positions {
            body[axis.as_str()] = json!(position);
        }
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    /// Clear a keypose slot.
    pub async fn keypose_delete(&self, adapter_id: &str, index: u8) -> Result<(), Error> {
        let body = json!({"command": "keyposeDeletePose", "index": index});
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    /// Move to a stored keypose over a fixed duration.
    pub async fn keypose_move_fixed_duration(
        &self,
        adapter_id: &str,
        index: u8,
        duration: f64,
    ) -> Result<(), Error> {
        let body = json!({
            "command": "keyposeMoveFixedDuration",
            "index": index,
            "duration": duration,
        });
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    /// Move to a stored keypose at a fixed speed.
    pub async fn keypose_move_fixed_speed(
        &self,
        adapter_id: &str,
        index: u8,
        speed: f64,
    ) -> Result<(), Error> {
        let body = json!({
            "command": "keyposeMoveFixedSpeed",
            "index": index,
            "speed": speed,
        });
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    /// Loop across all stored keyposes, one leg per `duration`.
    pub async fn keypose_loop_fixed_duration(
        &self,
        adapter_id: &str,
        duration: f64,
    ) -> Result<(), Error> {
        let body = json!({"command": "keyposeLoopFixedDuration", "duration": duration});
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    /// Loop across all stored keyposes at a fixed speed.
    pub async fn keypose_loop_fixed_speed(
        &self,
        adapter_id: &str,
        speed: f64,
    ) -> Result<(), Error> {
        let body = json!({"command": "keyposeLoopFixedSpeed", "speed": speed});
        self.post_ack(self.bundle_url(adapter_id)?, &body).await
    }

    /// Read back a keypose slot's stored axis positions.
    pub async fn keypose_read_numeric_values(
        &self,
        adapter_id: &str,
        index: u8,
    ) -> Result<HashMap<String, f64>, Error> {
        let body = json!({"command": "keyposeReadNumericValues", "index": index});
        self.post_data(self.bundle_url(adapter_id)?, &body, "keyposeReadNumericValues")
            .await
    }
}
