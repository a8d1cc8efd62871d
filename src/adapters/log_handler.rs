//! Log-based device handler.
//!
//! Implements [`DeviceHandler`] by writing every inbound event to the
//! logger (UART / USB-CDC in production).  Useful as the default handler
//! and as a base for applications that only care about a few callbacks.

use log::{info, warn};

use crate::app::ports::DeviceHandler;
use crate::error::UpdateError;
use crate::protocol::envelope::Envelope;
use crate::protocol::messages::{DataMessage, DiagnosticRequest, UpdateDescriptor};

/// Handler that logs and otherwise ignores everything.
#[derive(Debug, Default)]
pub struct LogHandler {
    /// Last update offered, kept so the main loop can decide to fetch.
    pub offered: Option<UpdateDescriptor>,
}

impl LogHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the pending offer, if any.
    pub fn take_offer(&mut self) -> Option<UpdateDescriptor> {
        self.offered.take()
    }
}

impl DeviceHandler for LogHandler {
    fn on_ready(&mut self, status: i32, message: &str) {
        info!("READY | status={} {}", status, message);
    }

    fn on_data(&mut self, m: &DataMessage) {
        info!(
            "DATA  | {} = {} ({:?})",
            m.name.as_deref().unwrap_or("<none>"),
            m.value.as_deref().unwrap_or("<none>"),
            m.value_type
        );
    }

    fn on_trigger_update(&mut self, d: &UpdateDescriptor) {
        info!(
            "OTA   | offered version={} type={:?} force={}",
            d.target_version.as_deref().unwrap_or("?"),
            d.update_type,
            d.force
        );
        self.offered = Some(d.clone());
    }

    fn on_diagnostic(&mut self, r: &DiagnosticRequest) -> Option<String> {
        info!("DIAG  | id={:?} type={:?}", r.id, r.diag_type);
        None
    }

    fn on_admin(&mut self, op: &str, envelope: &Envelope) {
        info!("ADMIN | {} ({} fields)", op, envelope.len());
    }

    fn on_ota_progress(&mut self, current: u32, total: u32, percent: u8) {
        info!("OTA   | {}/{} bytes ({}%)", current, total, percent);
    }

    fn on_update_error(&mut self, error: UpdateError) {
        warn!("OTA   | failed: {}", error);
    }
}
