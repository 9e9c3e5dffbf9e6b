// ── Session abstraction ──
//
// Full lifecycle management for a link adapter connection: phase
// state machine, background poll loops, command routing, and reactive
// store updates.
//
// All model mutation funnels through a single apply task fed by an
// unbounded channel. Poll loops and facade operations only send
// messages; the apply task is the exclusive writer of the store, the
// merged status, and the phase — so there is never a race between a
// scan snapshot, a status merge, and a joystick intent.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use mocolink_api::transport::TransportConfig;
use mocolink_api::LinkClient;

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::{
    AxisId, LinkAdapter, MotionControlStatus, MotionControlSystem, PairState, PairingStatus,
    PeriodicStatus,
};
use crate::store::LinkStore;

// ── SessionPhase ─────────────────────────────────────────────────

/// Connection lifecycle phase, observable by consumers.
///
/// The phases form a one-way pipeline with a reset edge: discover
/// adapters, pair systems into a bundle, drive the bundle. Each phase
/// runs exactly one poll loop; a transition stops the old loop and
/// starts the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    PresentLinkAdapters,
    PairMotionControlSystems,
    ShowMotionControlInterface,
}

// ── Update messages ──────────────────────────────────────────────

enum JoystickIntent {
    Begin { axis: AxisId, value: f64 },
    End { axis: AxisId },
}

/// Everything the apply task can be asked to do. Poll loops send the
/// data variants; facade operations send the lifecycle variants after
/// their HTTP call succeeded.
enum Update {
    Adapters(Vec<LinkAdapter>),
    ScanResults(Vec<MotionControlSystem>),
    /// `None` means the poll itself failed.
    PairingPoll(Option<PairingStatus>),
    /// One periodic tick; `None` means the status fetch failed. The
    /// joystick dispatch runs on every tick either way.
    StatusTick(Option<PeriodicStatus>),
    Joystick(JoystickIntent),
    EnterPairing { adapter_id: String },
    BundleRequested,
    EnterInterface { adapter_id: String },
    Disconnected,
    Reset,
}

// ── Session ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc`. Create with [`Session::new`], call
/// [`start`](Self::start) once, then drive it through the pairing
/// operations and observe the store.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    client: LinkClient,
    store: Arc<LinkStore>,
    phase: watch::Sender<SessionPhase>,
    /// Adapter id the session is currently talking through.
    connected_adapter: watch::Sender<Option<String>>,
    update_tx: mpsc::UnboundedSender<Update>,
    update_rx: Mutex<Option<mpsc::UnboundedReceiver<Update>>>,
    cancel: CancellationToken,
    /// Child token for the currently running poll loop — cancelled on
    /// every phase change and replaced with a fresh child.
    loop_cancel: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Create a session for the configured service. Does not start
    /// any background work — call [`start`](Self::start).
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.request_timeout,
        };
        let client = LinkClient::new(&config.host, config.port, &transport)?;

        let (phase, _) = watch::channel(SessionPhase::PresentLinkAdapters);
        let (connected_adapter, _) = watch::channel(None);
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.child_token();

        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                client,
                store: Arc::new(LinkStore::new()),
                phase,
                connected_adapter,
                update_tx,
                update_rx: Mutex::new(Some(update_rx)),
                cancel,
                loop_cancel: Mutex::new(loop_cancel),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Spawn the apply task. Idempotent; the second call is a no-op.
    pub async fn start(&self) {
        let Some(rx) = self.inner.update_rx.lock().await.take() else {
            warn!("session already started");
            return;
        };
        let handle = tokio::spawn(apply_task(self.clone(), rx));
        self.inner.task_handles.lock().await.push(handle);
    }

    /// Stop all background work. The session cannot be restarted.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.loop_cancel.lock().await.cancel();
        for handle in self.inner.task_handles.lock().await.drain(..) {
            handle.abort();
        }
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<LinkStore> {
        &self.inner.store
    }

    pub fn phase(&self) -> SessionPhase {
        *self.inner.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.inner.phase.subscribe()
    }

    pub fn phase_stream(&self) -> WatchStream<SessionPhase> {
        WatchStream::new(self.inner.phase.subscribe())
    }

    pub fn status_stream(&self) -> WatchStream<Arc<MotionControlStatus>> {
        WatchStream::new(self.inner.store.subscribe_status())
    }

    /// The adapter the session currently talks through, if any.
    pub fn connected_adapter(&self) -> Option<String> {
        self.inner.connected_adapter.borrow().clone()
    }

    // ── Lifecycle operations ─────────────────────────────────────

    /// Discover link adapters on the service host. Valid adapters are
    /// admitted into the store; returns how many the service listed.
    pub async fn scan_link_adapters(&self) -> Result<usize, CoreError> {
        let adapters = self.inner.client.detect_adapters().await?;
        let found = adapters.len();
        self.send(Update::Adapters(adapters));
        Ok(found)
    }

    /// Put an adapter into pairing scan mode and enter the pairing
    /// phase; the scan-results loop starts polling at 100ms cadence.
    pub async fn start_pairing_scan(&self, adapter_id: &str) -> Result<(), CoreError> {
        self.inner.client.pairing_scan_start(adapter_id).await?;
        self.send(Update::EnterPairing {
            adapter_id: adapter_id.to_owned(),
        });
        Ok(())
    }

    /// Bundle the selected systems. The first mac becomes the forced
    /// group master. On success the scan loop stops and the fast
    /// pairing-status loop takes over.
    pub async fn create_bundle(&self, macs: &[String]) -> Result<(), CoreError> {
        if macs.is_empty() {
            return Err(CoreError::EmptySelection);
        }
        let adapter_id = self.require_adapter()?;
        self.inner.client.create_bundle(&adapter_id, macs).await?;
        self.send(Update::BundleRequested);
        Ok(())
    }

    /// Attach to an existing pairing group via its master device.
    pub async fn attach_to_bundle(&self, group_id: u16) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        let group = self
            .inner
            .store
            .group(group_id)
            .ok_or(CoreError::UnknownGroup(group_id))?;
        let master = group
            .master
            .clone()
            .ok_or(CoreError::NoGroupMaster(group_id))?;
        self.inner
            .client
            .attach_to_bundle(&adapter_id, &master)
            .await?;
        self.send(Update::EnterInterface { adapter_id });
        Ok(())
    }

    /// Skip pairing for an adapter whose bundle is already formed and
    /// jump straight to the motion-control interface.
    pub fn attach_connected_adapter(&self, adapter_id: &str) {
        self.send(Update::EnterInterface {
            adapter_id: adapter_id.to_owned(),
        });
    }

    /// Tear down the current pairing. The session returns to the
    /// pairing phase and resumes scanning through the same adapter.
    pub async fn disconnect(&self) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        self.inner.client.disconnect(&adapter_id).await?;
        self.send(Update::Disconnected);
        Ok(())
    }

    /// Full reset: best-effort disconnect, drop all state, return to
    /// the adapter phase, and rescan adapters.
    pub async fn reset(&self) -> Result<(), CoreError> {
        if let Some(adapter_id) = self.connected_adapter() {
            // Best effort, result deliberately ignored.
            if let Err(e) = self.inner.client.disconnect(&adapter_id).await {
                debug!(error = %e, "disconnect during reset failed");
            }
        }
        self.send(Update::Reset);
        self.scan_link_adapters().await?;
        Ok(())
    }

    // ── Joystick intents ─────────────────────────────────────────

    /// Start or update joystick movement on an axis. The value goes
    /// out with the next periodic tick and repeats until released.
    pub fn joystick_begin(&self, axis: AxisId, value: f64) {
        self.send(Update::Joystick(JoystickIntent::Begin { axis, value }));
    }

    /// Release an axis: one final stop command goes out on the next
    /// tick, then the axis goes quiet.
    pub fn joystick_end(&self, axis: AxisId) {
        self.send(Update::Joystick(JoystickIntent::End { axis }));
    }

    // ── Motion commands ──────────────────────────────────────────

    pub async fn focus_move(&self, value: f64) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self.inner.client.focus_move(&adapter_id, value).await?)
    }

    pub async fn motion_abort(&self) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self.inner.client.motion_abort(&adapter_id).await?)
    }

    pub async fn calibrate(&self, axis: AxisId) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self.inner.client.calibrate(&adapter_id, axis).await?)
    }

    pub async fn shutter_trigger(&self) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self.inner.client.shutter_trigger(&adapter_id).await?)
    }

    pub async fn real_time_move_fixed_duration(
        &self,
        targets: &[(AxisId, f64)],
        duration: f64,
    ) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self
            .inner
            .client
            .real_time_move_fixed_duration(&adapter_id, targets, duration)
            .await?)
    }

    // ── Keyposes ─────────────────────────────────────────────────

    pub async fn keypose_store_current(&self, index: u8) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self
            .inner
            .client
            .keypose_store_current(&adapter_id, index)
            .await?)
    }

    pub async fn keypose_store_numeric(
        &self,
        index: u8,
        positions: &[(AxisId, f64)],
    ) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self
            .inner
            .client
            .keypose_store_numeric(&adapter_id, index, positions)
            .await?)
    }

    pub async fn keypose_delete(&self, index: u8) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self.inner.client.keypose_delete(&adapter_id, index).await?)
    }

    pub async fn keypose_move_fixed_duration(
        &self,
        index: u8,
        duration: f64,
    ) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self
            .inner
            .client
            .keypose_move_fixed_duration(&adapter_id, index, duration)
            .await?)
    }

    pub async fn keypose_move_fixed_speed(&self, index: u8, speed: f64) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self
            .inner
            .client
            .keypose_move_fixed_speed(&adapter_id, index, speed)
            .await?)
    }

    pub async fn keypose_loop_fixed_duration(&self, duration: f64) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self
            .inner
            .client
            .keypose_loop_fixed_duration(&adapter_id, duration)
            .await?)
    }

    pub async fn keypose_loop_fixed_speed(&self, speed: f64) -> Result<(), CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self
            .inner
            .client
            .keypose_loop_fixed_speed(&adapter_id, speed)
            .await?)
    }

    pub async fn keypose_read_numeric_values(
        &self,
        index: u8,
    ) -> Result<HashMap<String, f64>, CoreError> {
        let adapter_id = self.require_adapter()?;
        Ok(self
            .inner
            .client
            .keypose_read_numeric_values(&adapter_id, index)
            .await?)
    }

    // ── Internals ────────────────────────────────────────────────

    fn require_adapter(&self) -> Result<String, CoreError> {
        self.inner
            .connected_adapter
            .borrow()
            .clone()
            .ok_or(CoreError::NotConnected)
    }

    fn send(&self, update: Update) {
        // Only fails after shutdown, when there is nobody left to care.
        let _ = self.inner.update_tx.send(update);
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.inner.phase.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                debug!(?phase, "session phase change");
                *current = phase;
                true
            }
        });
    }

    fn set_connected_adapter(&self, adapter_id: Option<String>) {
        self.inner
            .connected_adapter
            .send_modify(|a| *a = adapter_id);
    }

    /// Cancel the running poll loop and mint a fresh child token for
    /// the next one.
    async fn rotate_loop_token(&self) -> CancellationToken {
        let mut guard = self.inner.loop_cancel.lock().await;
        guard.cancel();
        *guard = self.inner.cancel.child_token();
        guard.clone()
    }

    async fn track(&self, handle: JoinHandle<()>) {
        let mut handles = self.inner.task_handles.lock().await;
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    // ── Apply task handlers ──────────────────────────────────────

    async fn apply(&self, update: Update, status: &mut MotionControlStatus) {
        match update {
            Update::Adapters(found) => {
                self.inner.store.admit_adapters(found);
            }
            Update::ScanResults(found) => {
                self.inner.store.apply_scan_snapshot(found);
                self.set_phase(SessionPhase::PairMotionControlSystems);
            }
            Update::PairingPoll(Some(pairing)) => match pairing.pair_state {
                PairState::Idle | PairState::Connecting => {}
                PairState::ConnectionOk => self.enter_interface(status).await,
                PairState::Problem => {
                    warn!(error = ?pairing.last_pair_error, "pairing failed");
                    self.rotate_loop_token().await;
                    self.set_phase(SessionPhase::PresentLinkAdapters);
                }
            },
            Update::PairingPoll(None) => {
                // The service stops answering this command once the
                // bundle is up, so a failed poll doubles as the
                // completion signal.
                debug!("pairing status poll failed; treating pairing as complete");
                self.enter_interface(status).await;
            }
            Update::StatusTick(snapshot) => {
                if let Some(snapshot) = snapshot {
                    if status.merge(&snapshot) {
                        self.inner.store.publish_status(status.clone());
                    }
                }
                self.dispatch_joystick(status).await;
            }
            Update::Joystick(intent) => {
                let changed = match intent {
                    JoystickIntent::Begin { axis, value } => status.joystick_begin(axis, value),
                    JoystickIntent::End { axis } => status.joystick_end(axis),
                };
                if changed {
                    self.inner.store.publish_status(status.clone());
                }
            }
            Update::EnterPairing { adapter_id } => {
                self.set_connected_adapter(Some(adapter_id.clone()));
                self.set_phase(SessionPhase::PairMotionControlSystems);
                let cancel = self.rotate_loop_token().await;
                self.track(tokio::spawn(scan_results_task(
                    self.clone(),
                    adapter_id,
                    cancel,
                )))
                .await;
            }
            Update::BundleRequested => {
                let Some(adapter_id) = self.connected_adapter() else {
                    warn!("bundle requested with no connected adapter");
                    return;
                };
                let cancel = self.rotate_loop_token().await;
                self.track(tokio::spawn(pairing_status_task(
                    self.clone(),
                    adapter_id,
                    cancel,
                )))
                .await;
            }
            Update::EnterInterface { adapter_id } => {
                self.set_connected_adapter(Some(adapter_id));
                self.enter_interface(status).await;
            }
            Update::Disconnected => {
                let cancel = self.rotate_loop_token().await;
                self.set_phase(SessionPhase::PairMotionControlSystems);
                if let Some(adapter_id) = self.connected_adapter() {
                    self.track(tokio::spawn(scan_results_task(
                        self.clone(),
                        adapter_id,
                        cancel,
                    )))
                    .await;
                }
            }
            Update::Reset => {
                self.rotate_loop_token().await;
                self.inner.store.clear();
                *status = MotionControlStatus::default();
                self.set_connected_adapter(None);
                self.set_phase(SessionPhase::PresentLinkAdapters);
            }
        }
    }

    /// Enter the motion-control interface phase: stop whatever loop
    /// is running, clear the axis map, and start the periodic status
    /// loop.
    async fn enter_interface(&self, status: &mut MotionControlStatus) {
        let cancel = self.rotate_loop_token().await;
        status.axes.clear();
        self.inner.store.publish_status(status.clone());
        self.set_phase(SessionPhase::ShowMotionControlInterface);

        let Some(adapter_id) = self.connected_adapter() else {
            warn!("entering interface phase with no connected adapter");
            return;
        };
        info!(adapter = %adapter_id, "motion-control interface active");
        self.track(tokio::spawn(periodic_status_task(
            self.clone(),
            adapter_id,
            cancel,
        )))
        .await;
    }

    /// Send one `joystickMove` for every axis currently driven.
    /// Released axes contribute their stop value exactly once.
    async fn dispatch_joystick(&self, status: &mut MotionControlStatus) {
        let moves = status.take_joystick_moves();
        if moves.is_empty() {
            return;
        }
        let Some(adapter_id) = self.connected_adapter() else {
            return;
        };
        if let Err(e) = self.inner.client.joystick_move(&adapter_id, &moves).await {
            debug!(error = %e, "joystick move failed");
        }
        self.inner.store.publish_status(status.clone());
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Single consumer for all updates. Exclusive writer of the store,
/// the merged status, and the phase.
async fn apply_task(session: Session, mut rx: mpsc::UnboundedReceiver<Update>) {
    info!("session apply task started");
    let mut status = MotionControlStatus::default();

    loop {
        tokio::select! {
            biased;
            () = session.inner.cancel.cancelled() => break,
            update = rx.recv() => {
                let Some(update) = update else { break };
                session.apply(update, &mut status).await;
            }
        }
    }
    debug!("session apply task stopped");
}

/// Pairing-scan poll loop (100ms). Active while the consumer picks
/// systems to bundle.
async fn scan_results_task(session: Session, adapter_id: String, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(session.inner.config.scan_interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match session.inner.client.pairing_scan_results(&adapter_id).await {
                    Ok(systems) => session.send(Update::ScanResults(systems)),
                    Err(e) => debug!(error = %e, "pairing scan poll failed"),
                }
            }
        }
    }
}

/// Pairing-status poll loop (20ms). Active between bundle creation
/// and the connection coming up.
async fn pairing_status_task(session: Session, adapter_id: String, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(session.inner.config.pairing_interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match session.inner.client.pairing_status(&adapter_id).await {
                    Ok(pairing) => session.send(Update::PairingPoll(Some(pairing))),
                    Err(e) => {
                        debug!(error = %e, "pairing status poll failed");
                        session.send(Update::PairingPoll(None));
                    }
                }
            }
        }
    }
}

/// Periodic bundle status loop (500ms). Every tick fetches a status
/// snapshot and flushes pending joystick movement.
async fn periodic_status_task(session: Session, adapter_id: String, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(session.inner.config.status_interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let snapshot = match session.inner.client.bundle_status(&adapter_id).await {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        debug!(error = %e, "bundle status poll failed");
                        None
                    }
                };
                session.send(Update::StatusTick(snapshot));
            }
        }
    }
}
