// End-to-end session lifecycle tests against a mocked link service.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mocolink_core::{AxisId, Session, SessionConfig, SessionPhase};

const WAIT: Duration = Duration::from_secs(2);

// ── Helpers ─────────────────────────────────────────────────────────

async fn session_for(server: &MockServer) -> Session {
    let url = Url::parse(&server.uri()).unwrap();
    let mut config = SessionConfig::new(url.host_str().unwrap(), url.port().unwrap());
    config.scan_interval = Duration::from_millis(10);
    config.pairing_interval = Duration::from_millis(5);
    config.status_interval = Duration::from_millis(10);

    let session = Session::new(config).unwrap();
    session.start().await;
    session
}

fn ok_ack() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"result": "ok"}))
}

fn adapter_listing() -> serde_json::Value {
    json!({
        "result": "ok",
        "data": [{
            "isDeviceFirmwareUpdateAvailable": false,
            "isDeviceFirmwareUpdateRequired": false,
            "isRadioFirmwareUpdateAvailable": false,
            "isRadioFirmwareUpdateRequired": false,
            "linkConnectionType": "wireless",
            "initialFoundEpoch": 1700000000.0,
            "isPairingDone": false,
            "isValid": true,
            "linkID": "LA-1",
            "linkType": "linkAdapter",
            "portName": "/dev/ttyUSB0"
        }]
    })
}

fn system(mac: &str, group_id: u16, setup: &str) -> serde_json::Value {
    json!({
        "groupId": group_id,
        "isTilted": 0,
        "mac": mac,
        "rssi": -45,
        "isDeviceFirmwareUpdateAvailable": false,
        "isRadioFirmwareUpdateAvailable": false,
        "setup": setup,
        "type": "headPlusPro"
    })
}

fn ready_status() -> serde_json::Value {
    json!({
        "result": "ok",
        "data": {
            "calibratedAxes": [{"axis": "slide", "device": "sliderOnePro"}],
            "deviceInfo": [
                {"batteryLevel": 0.8, "type": "headPlusPro"},
                {"batteryLevel": 0.5, "type": "sliderOnePro"}
            ],
            "deviceInfoEverythingReady": true,
            "keyposeLoopActive": false,
            "keyposeMotionAimIndex": -1,
            "keyposeMotionStartIndex": -1,
            "keyposeSlotsFilled": [false, false, false, false, false, false],
            "plannedMotionProgress": 1.0,
            "plannedMotionDuration": 0.0,
            "readings": {"headPan": 10.0, "slide": 50.0},
            "realTimeSupportedAxes": [],
            "state": "idle",
            "supportedAxes": [
                {"axis": "headPan", "device": "headPlusPro"},
                {"axis": "slide", "device": "sliderOnePro"}
            ],
            "timestampDevice": 100,
            "timestampEpoch": 1700000000000_i64
        }
    })
}

async fn mount_command(server: &MockServer, url_path: &str, command: &str, resp: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(url_path))
        .and(body_partial_json(json!({"command": command})))
        .respond_with(resp)
        .mount(server)
        .await;
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn full_pairing_flow_reaches_motion_control() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(adapter_listing()))
        .mount(&server)
        .await;
    mount_command(&server, "/v1/link/LA-1", "wirelessPairingScanStart", ok_ack()).await;
    mount_command(
        &server,
        "/v1/link/LA-1",
        "wirelessPairingScanResults",
        ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": [system("aa:01", 65535, "none"), system("aa:02", 65535, "none")]
        })),
    )
    .await;
    mount_command(&server, "/v1/link/LA-1", "wirelessPairingCreateBundle", ok_ack()).await;
    mount_command(
        &server,
        "/v1/link/LA-1",
        "wirelessPairingStatus",
        ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": {"wirelessPairState": "connectionOk", "lastPairError": ""}
        })),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/v1/bundle/LA-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_status()))
        .mount(&server)
        .await;

    let session = session_for(&server).await;
    assert_eq!(session.phase(), SessionPhase::PresentLinkAdapters);

    assert_eq!(session.scan_link_adapters().await.unwrap(), 1);
    let mut adapters = session.store().subscribe_adapters();
    tokio::time::timeout(WAIT, adapters.wait_for(|a| a.len() == 1))
        .await
        .unwrap()
        .unwrap();

    session.start_pairing_scan("LA-1").await.unwrap();
    let mut phase = session.subscribe_phase();
    tokio::time::timeout(
        WAIT,
        phase.wait_for(|p| *p == SessionPhase::PairMotionControlSystems),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(session.connected_adapter().as_deref(), Some("LA-1"));

    let mut systems = session.store().subscribe_systems();
    tokio::time::timeout(WAIT, systems.wait_for(|s| s.len() == 2))
        .await
        .unwrap()
        .unwrap();

    session
        .create_bundle(&["aa:01".to_owned(), "aa:02".to_owned()])
        .await
        .unwrap();
    tokio::time::timeout(
        WAIT,
        phase.wait_for(|p| *p == SessionPhase::ShowMotionControlInterface),
    )
    .await
    .unwrap()
    .unwrap();

    let mut status = session.store().subscribe_status();
    tokio::time::timeout(WAIT, status.wait_for(|s| s.axes.len() == 2))
        .await
        .unwrap()
        .unwrap();
    let snapshot = session.store().status();
    assert!(snapshot.axes[&AxisId::Slide].calibrated);

    session.shutdown().await;
}

#[tokio::test]
async fn failed_pairing_poll_counts_as_pairing_complete() {
    let server = MockServer::start().await;

    mount_command(&server, "/v1/link/LA-1", "wirelessPairingScanStart", ok_ack()).await;
    mount_command(
        &server,
        "/v1/link/LA-1",
        "wirelessPairingScanResults",
        ResponseTemplate::new(200).set_body_json(json!({"result": "ok", "data": []})),
    )
    .await;
    mount_command(&server, "/v1/link/LA-1", "wirelessPairingCreateBundle", ok_ack()).await;
    // The service stops answering the pairing status command.
    mount_command(
        &server,
        "/v1/link/LA-1",
        "wirelessPairingStatus",
        ResponseTemplate::new(500),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/v1/bundle/LA-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_status()))
        .mount(&server)
        .await;

    let session = session_for(&server).await;
    session.start_pairing_scan("LA-1").await.unwrap();
    let mut phase = session.subscribe_phase();
    tokio::time::timeout(
        WAIT,
        phase.wait_for(|p| *p == SessionPhase::PairMotionControlSystems),
    )
    .await
    .unwrap()
    .unwrap();

    session.create_bundle(&["aa:01".to_owned()]).await.unwrap();
    tokio::time::timeout(
        WAIT,
        phase.wait_for(|p| *p == SessionPhase::ShowMotionControlInterface),
    )
    .await
    .unwrap()
    .unwrap();

    session.shutdown().await;
}

#[tokio::test]
async fn pairing_problem_falls_back_to_adapter_phase() {
    let server = MockServer::start().await;

    mount_command(&server, "/v1/link/LA-1", "wirelessPairingScanStart", ok_ack()).await;
    mount_command(
        &server,
        "/v1/link/LA-1",
        "wirelessPairingScanResults",
        ResponseTemplate::new(200).set_body_json(json!({"result": "ok", "data": []})),
    )
    .await;
    mount_command(&server, "/v1/link/LA-1", "wirelessPairingCreateBundle", ok_ack()).await;
    mount_command(
        &server,
        "/v1/link/LA-1",
        "wirelessPairingStatus",
        ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": {"wirelessPairState": "problem", "lastPairError": "radio noise"}
        })),
    )
    .await;

    let session = session_for(&server).await;
    session.start_pairing_scan("LA-1").await.unwrap();
    let mut phase = session.subscribe_phase();
    tokio::time::timeout(
        WAIT,
        phase.wait_for(|p| *p == SessionPhase::PairMotionControlSystems),
    )
    .await
    .unwrap()
    .unwrap();

    session.create_bundle(&["aa:01".to_owned()]).await.unwrap();
    tokio::time::timeout(
        WAIT,
        phase.wait_for(|p| *p == SessionPhase::PresentLinkAdapters),
    )
    .await
    .unwrap()
    .unwrap();

    session.shutdown().await;
}

#[tokio::test]
async fn attach_to_bundle_targets_the_group_master() {
    let server = MockServer::start().await;

    mount_command(&server, "/v1/link/LA-1", "wirelessPairingScanStart", ok_ack()).await;
    mount_command(
        &server,
        "/v1/link/LA-1",
        "wirelessPairingScanResults",
        ResponseTemplate::new(200).set_body_json(json!({
            "result": "ok",
            "data": [system("aa:01", 7, "panTilt"), system("aa:02", 7, "groupMember")]
        })),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/v1/link/LA-1"))
        .and(body_partial_json(json!({
            "command": "wirelessPairingAttachToBundle",
            "mac": "aa:01"
        })))
        .respond_with(ok_ack())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/bundle/LA-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_status()))
        .mount(&server)
        .await;

    let session = session_for(&server).await;
    session.start_pairing_scan("LA-1").await.unwrap();
    let mut groups = session.store().subscribe_groups();
    tokio::time::timeout(WAIT, groups.wait_for(|g| g.len() == 1))
        .await
        .unwrap()
        .unwrap();

    session.attach_to_bundle(7).await.unwrap();
    let mut phase = session.subscribe_phase();
    tokio::time::timeout(
        WAIT,
        phase.wait_for(|p| *p == SessionPhase::ShowMotionControlInterface),
    )
    .await
    .unwrap()
    .unwrap();

    session.shutdown().await;
}

#[tokio::test]
async fn joystick_release_sends_one_stop_command() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/bundle/LA-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ready_status()))
        .mount(&server)
        .await;
    mount_command(&server, "/v1/bundle/LA-1", "joystickMove", ok_ack()).await;

    let session = session_for(&server).await;
    // Adapter already paired: skip straight to the interface phase.
    session.attach_connected_adapter("LA-1");

    let mut status = session.store().subscribe_status();
    tokio::time::timeout(WAIT, status.wait_for(|s| s.axes.len() == 2))
        .await
        .unwrap()
        .unwrap();

    session.joystick_begin(AxisId::Slide, 0.5);
    tokio::time::sleep(Duration::from_millis(80)).await;
    session.joystick_end(AxisId::Slide);
    tokio::time::sleep(Duration::from_millis(80)).await;

    let requests = server.received_requests().await.unwrap();
    let joystick_bodies: Vec<serde_json::Value> = requests
        .iter()
        .filter(|r| r.url.path() == "/v1/bundle/LA-1" && r.method.as_str() == "POST")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .filter(|b: &serde_json::Value| b["command"] == "joystickMove")
        .collect();

    let moving = joystick_bodies
        .iter()
        .filter(|b| b["slide"] == json!(0.5))
        .count();
    let stops = joystick_bodies
        .iter()
        .filter(|b| b["slide"] == json!(0.0))
        .count();
    assert!(moving >= 1, "expected at least one move at 0.5");
    assert_eq!(stops, 1, "stop value must be sent exactly once");

    session.shutdown().await;
}
