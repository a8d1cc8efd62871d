//! Recording handler and session builders for integration tests.
//!
//! Pairs the crate's simulation adapters with a [`DeviceHandler`] that
//! keeps every callback so tests can assert on the full history.

use simpleiot::IotConfig;
use simpleiot::adapters::sim::{SimBroker, SimPlatform};
use simpleiot::app::IotSession;
use simpleiot::app::ports::{DeviceHandler, Transport};
use simpleiot::error::UpdateError;
use simpleiot::protocol::envelope::Envelope;
use simpleiot::protocol::messages::{DataMessage, DiagnosticRequest, UpdateDescriptor};

pub const PROJECT: &str = "Sunshine";
pub const MODEL: &str = "M1";
pub const SERIAL: &str = "TIE-DEMO01";

// ── Callback record ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Ready(i32, String),
    Data(DataMessage),
    Trigger(UpdateDescriptor),
    Diagnostic(DiagnosticRequest),
    DiagnosticResult(String),
    Admin(String, usize),
    Progress { current: u32, total: u32, percent: u8 },
    UpdateError(UpdateError),
}

#[derive(Default)]
pub struct RecordingHandler {
    pub calls: Vec<Call>,
    /// Returned from `on_diagnostic`.
    pub diag_reply: Option<String>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn percents(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<UpdateError> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::UpdateError(e) => Some(*e),
                _ => None,
            })
            .collect()
    }

    pub fn triggers(&self) -> Vec<&UpdateDescriptor> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Trigger(d) => Some(d),
                _ => None,
            })
            .collect()
    }
}

impl DeviceHandler for RecordingHandler {
    fn on_ready(&mut self, status: i32, message: &str) {
        self.calls.push(Call::Ready(status, message.into()));
    }

    fn on_data(&mut self, message: &DataMessage) {
        self.calls.push(Call::Data(message.clone()));
    }

    fn on_trigger_update(&mut self, descriptor: &UpdateDescriptor) {
        self.calls.push(Call::Trigger(descriptor.clone()));
    }

    fn on_diagnostic(&mut self, request: &DiagnosticRequest) -> Option<String> {
        self.calls.push(Call::Diagnostic(request.clone()));
        self.diag_reply.clone()
    }

    fn on_diagnostic_result(&mut self, _request: &DiagnosticRequest, result: &str) {
        self.calls.push(Call::DiagnosticResult(result.into()));
    }

    fn on_admin(&mut self, op: &str, envelope: &Envelope) {
        self.calls.push(Call::Admin(op.into(), envelope.len()));
    }

    fn on_ota_progress(&mut self, current: u32, total: u32, percent: u8) {
        self.calls.push(Call::Progress {
            current,
            total,
            percent,
        });
    }

    fn on_update_error(&mut self, error: UpdateError) {
        self.calls.push(Call::UpdateError(error));
    }
}

// ── Builders ──────────────────────────────────────────────────

pub fn demo_config() -> IotConfig {
    IotConfig::new(PROJECT, MODEL, SERIAL)
}

pub fn session_with<T: Transport>(transport: T) -> IotSession<T, RecordingHandler> {
    IotSession::new(demo_config(), transport, RecordingHandler::default())
        .expect("demo config is valid")
}

#[allow(dead_code)]
pub fn sim_session() -> (IotSession<SimBroker, RecordingHandler>, SimPlatform) {
    (session_with(SimBroker::new()), SimPlatform::new())
}

/// Admin topic for this device, e.g. `simpleiot_v1/adm/received/...`.
#[allow(dead_code)]
pub fn adm_topic(op: &str) -> String {
    format!("simpleiot_v1/adm/{op}/{PROJECT}/{MODEL}/{SERIAL}")
}
