//! Device session: the hexagonal core.
//!
//! [`IotSession`] owns the identity, the update controller and the
//! registered handler.  The transport is owned too (it lives as long as the
//! session); the OTA and system ports are injected at call sites, making
//! the whole session testable with mock adapters.
//!
//! ```text
//!  Transport ◀──▶ ┌──────────────────────────┐ ──▶ DeviceHandler
//!                 │        IotSession         │
//!  FetchPort  ──▶ │ protocol · UpdateController│ ──▶ FlashPort / SystemPort
//!                 └──────────────────────────┘
//! ```
//!
//! One thread of control: the application calls [`IotSession::poll`]
//! repeatedly.  Each call dispatches at most one inbound message and, during
//! a download, pumps at most one chunk.

use log::{debug, info, warn};

use crate::config::IotConfig;
use crate::error::{ConfigError, Error, TransportError, UpdateError};
use crate::protocol::dispatch::{Inbound, route};
use crate::protocol::envelope::{Envelope, GeoPoint, SetValue, encode_set, encode_update_control};
use crate::protocol::identity::DeviceIdentity;
use crate::protocol::topic::{
    MessageClass, OP_SET_DATA, build_topic, diag_subscription, monitor_topic, update_topic,
};
use crate::update::{UpdateController, UpdateProgress, UpdateState};

use super::ports::{DeviceHandler, FetchPort, FlashPort, SystemPort, Transport};

/// Admin operations of the update handshake.
const OP_CHECK: &str = "check";
const OP_RECEIVED: &str = "received";
const OP_INSTALLED: &str = "installed";

// ───────────────────────────────────────────────────────────────
// IotSession
// ───────────────────────────────────────────────────────────────

pub struct IotSession<T: Transport, H: DeviceHandler> {
    config: IotConfig,
    identity: DeviceIdentity,
    transport: T,
    handler: H,
    update: UpdateController,
    /// Scratch buffer for one OTA chunk.
    chunk: Vec<u8>,
}

impl<T: Transport, H: DeviceHandler> IotSession<T, H> {
    /// Construct the session.  Invalid configuration is fatal.
    ///
    /// Does **not** subscribe; call [`start`](Self::start) next.
    pub fn new(config: IotConfig, transport: T, handler: H) -> Result<Self, ConfigError> {
        config.validate()?;
        let identity = config.identity()?;
        let chunk = vec![0u8; config.chunk_size];
        info!(
            "session for {} ({}/{}) firmware {}",
            identity.client_id(),
            identity.project(),
            identity.model(),
            identity.firmware_version()
        );
        Ok(Self {
            config,
            identity,
            transport,
            handler,
            update: UpdateController::new(),
            chunk,
        })
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn config(&self) -> &IotConfig {
        &self.config
    }

    pub fn update_state(&self) -> UpdateState {
        self.update.state()
    }

    pub fn update_progress(&self) -> UpdateProgress {
        self.update.progress()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Subscribe to the inbound topics enabled in the config, then report
    /// `ready(0, "Ready")`.  A failed subscription is reported through
    /// `on_ready` with a negative status and returned.
    pub fn start(&mut self) -> Result<(), Error> {
        match self.subscribe_all() {
            Ok(()) => {
                info!("session ready");
                self.handler.on_ready(0, "Ready");
                Ok(())
            }
            Err(e) => {
                warn!("session start failed: {}", e);
                self.handler.on_ready(-1, "Subscribe failed");
                Err(e)
            }
        }
    }

    fn subscribe_all(&mut self) -> Result<(), Error> {
        if self.config.subscribe_monitor {
            let topic = monitor_topic(&self.identity)?;
            self.subscribe(&topic)?;
        }
        if self.config.subscribe_update {
            let topic = update_topic(&self.identity)?;
            self.subscribe(&topic)?;
        }
        if self.config.subscribe_diagnostics {
            let topic = diag_subscription(&self.identity)?;
            self.subscribe(&topic)?;
        }
        Ok(())
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), TransportError> {
        debug!("subscribe {}", filter);
        self.transport.subscribe(filter)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        debug!("publish {} ({} bytes)", topic, payload.len());
        self.transport.publish(topic, payload)
    }

    // ── Outbound telemetry ────────────────────────────────────

    /// Publish a named value on `simpleiot_v1/app/data/set/...`.
    pub fn set(&mut self, name: &str, value: impl Into<SetValue>) -> Result<(), Error> {
        self.send_set(name, &value.into(), None)
    }

    /// Like [`set`](Self::set) with a location attached.
    pub fn set_with_location(
        &mut self,
        name: &str,
        value: impl Into<SetValue>,
        lat: f32,
        lng: f32,
    ) -> Result<(), Error> {
        self.send_set(name, &value.into(), Some(GeoPoint { lat, lng }))
    }

    fn send_set(
        &mut self,
        name: &str,
        value: &SetValue,
        geo: Option<GeoPoint>,
    ) -> Result<(), Error> {
        let payload = encode_set(&self.identity, name, value, geo)?;
        let topic = build_topic(MessageClass::Application, OP_SET_DATA, &self.identity)?;
        self.publish(&topic, &payload)?;
        Ok(())
    }

    // ── Update handshake ──────────────────────────────────────

    fn send_update_control(&mut self, op: &str, force: bool) -> Result<(), Error> {
        let payload = encode_update_control(&self.identity, op, force)?;
        let topic = build_topic(MessageClass::Admin, op, &self.identity)?;
        self.publish(&topic, &payload)?;
        Ok(())
    }

    /// Ask the cloud whether an update is available.  Never blocks; a
    /// trigger (if any) arrives later through [`poll`](Self::poll).
    pub fn check_for_update(&mut self, force: bool) -> Result<(), Error> {
        self.send_update_control(OP_CHECK, force)?;
        self.update.request_check();
        info!("update check sent (force={})", force);
        Ok(())
    }

    /// Report that a new image is running.  No precondition; may be
    /// called any number of times.
    pub fn update_installed(&mut self) -> Result<(), Error> {
        self.send_update_control(OP_INSTALLED, false)
    }

    /// Open `url` and start streaming it into flash.  Bytes are pumped by
    /// subsequent [`poll`](Self::poll) calls.
    pub fn fetch(
        &mut self,
        url: &str,
        ota: &mut (impl FetchPort + FlashPort),
    ) -> Result<(), UpdateError> {
        if self.update.holds_attempt() {
            warn!("fetch rejected: update already in progress");
            return Err(UpdateError::AlreadyInProgress);
        }
        let total = match ota.open(url) {
            Ok(total) => total,
            Err(e) => {
                warn!("cannot open {}: {}", url, e);
                self.handler.on_update_error(UpdateError::FetchFailed);
                return Err(UpdateError::FetchFailed);
            }
        };
        if let Err(e) = self.update.begin(total, ota) {
            ota.close();
            self.handler.on_update_error(e);
            return Err(e);
        }
        info!("fetching {}", url);
        Ok(())
    }

    // ── Inbound ───────────────────────────────────────────────

    /// Decode and dispatch one inbound message.  Malformed payloads are
    /// logged and dropped.
    pub fn handle_inbound(&mut self, topic: &str, payload: &[u8]) {
        let envelope = match Envelope::decode(payload) {
            Ok(e) => e,
            Err(e) => {
                warn!("dropping message on {}: {}", topic, e);
                return;
            }
        };

        match route(topic, envelope) {
            Inbound::UpdateTrigger(descriptor) => {
                if !descriptor.is_addressed_to(self.identity.serial()) {
                    warn!(
                        "update trigger for {:?} ignored by {}",
                        descriptor.device,
                        self.identity.serial()
                    );
                    return;
                }
                info!(
                    "update offered: version {:?} ({:?})",
                    descriptor.target_version, descriptor.update_type
                );
                self.handler.on_trigger_update(&descriptor);
            }
            Inbound::Admin { op, envelope } => {
                debug!("admin request {}", op);
                self.handler.on_admin(&op, &envelope);
            }
            Inbound::Diagnostic { op, request } => {
                debug!("diagnostic request {} {:?}", op, request.diag_type);
                if let Some(result) = self.handler.on_diagnostic(&request) {
                    self.handler.on_diagnostic_result(&request, &result);
                }
            }
            Inbound::Data(message) => self.handler.on_data(&message),
        }
    }

    // ── Poll loop ─────────────────────────────────────────────

    /// Run one cooperative step: dispatch at most one inbound message, then
    /// pump one OTA chunk if a download is active.  Sleeps for the poll
    /// delay only when no transfer is in flight.
    ///
    /// Transport failures are returned; update failures abort the attempt
    /// and are reported through [`DeviceHandler::on_update_error`].
    pub fn poll(
        &mut self,
        platform: &mut (impl FetchPort + FlashPort + SystemPort),
    ) -> Result<(), TransportError> {
        if let Some(message) = self.transport.poll_inbound()? {
            self.handle_inbound(&message.topic, &message.payload);
        }

        if self.update.holds_attempt() {
            self.pump(platform)
        } else {
            platform.delay_ms(self.config.poll_delay_ms);
            Ok(())
        }
    }

    fn pump(
        &mut self,
        platform: &mut (impl FetchPort + FlashPort + SystemPort),
    ) -> Result<(), TransportError> {
        if self.update.state() == UpdateState::Downloading {
            if platform.is_open() {
                match platform.read(&mut self.chunk) {
                    Ok(0) => {}
                    Ok(n) => match self.update.ingest(&self.chunk[..n], platform) {
                        Ok(Some(p)) => {
                            self.handler.on_ota_progress(p.current, p.total, p.percent);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            platform.close();
                            self.handler.on_update_error(e);
                            return Ok(());
                        }
                    },
                    Err(e) => {
                        // Never committed, even with an unknown length.
                        warn!("OTA stream dropped: {}", e);
                        platform.close();
                        self.update.abort(UpdateError::LengthMismatch, platform);
                        self.handler.on_update_error(UpdateError::LengthMismatch);
                        return Ok(());
                    }
                }
            }

            // Only a clean close gets here.
            if self.update.state() == UpdateState::Downloading && !platform.is_open() {
                if let Err(e) = self.update.end_of_stream(platform) {
                    self.handler.on_update_error(e);
                    return Ok(());
                }
            }
        }

        if self.update.state() == UpdateState::Flashing {
            platform.close();
            if let Err(e) = self.update.commit(platform) {
                self.handler.on_update_error(e);
                return Ok(());
            }
        }

        if self.update.state() == UpdateState::Completed {
            // Retried on the next poll if the transport refuses it.
            if let Err(e) = self.send_update_control(OP_RECEIVED, false) {
                warn!("cannot acknowledge update: {}", e);
                return match e {
                    Error::Transport(t) => Err(t),
                    _ => Ok(()),
                };
            }
            self.update.acknowledge();
            info!(
                "update received, restarting in {} ms",
                self.config.restart_delay_ms
            );
            platform.delay_ms(self.config.restart_delay_ms);
            platform.restart();
        }
        Ok(())
    }
}
